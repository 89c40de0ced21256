pub mod artifacts;
pub mod config;
pub mod events;
pub mod prompts;
pub mod providers;
pub mod scene;
pub mod state;
