use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::Result;
use serde_json::json;
use teeforge_contracts::artifacts::GeneratedImage;
use teeforge_contracts::events::EventWriter;
use teeforge_contracts::prompts::{DesignPrompt, PromptError};
use teeforge_contracts::state::{Transition, ViewState};

use crate::{error_chain_text, map_object};

const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

pub trait ImageGenerator: Send + Sync {
    fn generate_image(&self, prompt: &str) -> Result<GeneratedImage>;
}

pub trait DescriptionGenerator: Send + Sync {
    fn generate_description(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] PromptError),
    #[error("generation cycle {cycle} failed: {message}")]
    Generation { cycle: u64, message: String },
    #[error("generation worker failed: {0}")]
    Worker(String),
}

impl OrchestratorError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub cycle: u64,
    pub prompt: String,
    pub image: GeneratedImage,
    pub description: String,
    pub elapsed_ms: u64,
}

enum BranchResult {
    Image(Result<GeneratedImage>),
    Description(Result<String>),
}

/// Overlapping cycles are not sequenced. The last one to resolve wins.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    image: Arc<dyn ImageGenerator>,
    description: Arc<dyn DescriptionGenerator>,
    state: Arc<Mutex<ViewState>>,
    events: EventWriter,
    cycles: Arc<AtomicU64>,
}

impl GenerationOrchestrator {
    pub fn new(
        image: Arc<dyn ImageGenerator>,
        description: Arc<dyn DescriptionGenerator>,
        events: EventWriter,
    ) -> Self {
        Self {
            image,
            description,
            state: Arc::new(Mutex::new(ViewState::new())),
            events,
            cycles: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> ViewState {
        self.lock_state().clone()
    }

    pub fn shared_state(&self) -> Arc<Mutex<ViewState>> {
        self.state.clone()
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn submit(&self, raw_prompt: &str) -> Result<GenerationReport, OrchestratorError> {
        let (cycle, prompt) = self.begin(raw_prompt)?;
        self.run_cycle(cycle, prompt)
    }

    pub fn spawn(
        &self,
        raw_prompt: &str,
    ) -> Result<JoinHandle<Result<GenerationReport, OrchestratorError>>, OrchestratorError> {
        let (cycle, prompt) = self.begin(raw_prompt)?;
        let orchestrator = self.clone();
        thread::Builder::new()
            .name(format!("teeforge-cycle-{cycle}"))
            .spawn(move || orchestrator.run_cycle(cycle, prompt))
            .map_err(|err| {
                let message = format!("cycle thread spawn failed: {err}");
                self.fail(cycle, &message);
                OrchestratorError::Worker(message)
            })
    }

    fn begin(&self, raw_prompt: &str) -> Result<(u64, DesignPrompt), OrchestratorError> {
        let mut state = self.lock_state();
        state.set_prompt(raw_prompt);
        let prompt = match DesignPrompt::parse(raw_prompt) {
            Ok(prompt) => prompt,
            Err(err) => {
                let message = err.to_string();
                state.apply(Transition::ValidationError {
                    message: message.clone(),
                });
                drop(state);
                tracing::info!("prompt rejected: {message}");
                self.events.emit_quiet(
                    "validation_rejected",
                    map_object(json!({ "message": message })),
                );
                return Err(err.into());
            }
        };
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        state.apply(Transition::LoadStart { cycle });
        drop(state);

        tracing::info!(cycle, prompt = prompt.as_str(), "generation cycle started");
        self.events.emit_quiet(
            "generation_started",
            map_object(json!({
                "cycle": cycle,
                "prompt": prompt.as_str(),
            })),
        );
        Ok((cycle, prompt))
    }

    fn run_cycle(
        &self,
        cycle: u64,
        prompt: DesignPrompt,
    ) -> Result<GenerationReport, OrchestratorError> {
        let started = Instant::now();
        let (tx, rx) = mpsc::channel::<BranchResult>();

        let image = self.image.clone();
        let image_tx = tx.clone();
        let image_prompt = prompt.as_str().to_string();
        let image_spawn = thread::Builder::new()
            .name(format!("teeforge-image-{cycle}"))
            .spawn(move || {
                let result = image.generate_image(&image_prompt);
                let _ = image_tx.send(BranchResult::Image(result));
            });

        let description = self.description.clone();
        let description_prompt = prompt.as_str().to_string();
        let description_spawn = thread::Builder::new()
            .name(format!("teeforge-description-{cycle}"))
            .spawn(move || {
                let result = description.generate_description(&description_prompt);
                let _ = tx.send(BranchResult::Description(result));
            });

        if let Some(err) = image_spawn.err().or_else(|| description_spawn.err()) {
            let message = format!("generation thread spawn failed: {err}");
            self.fail(cycle, &message);
            return Err(OrchestratorError::Worker(message));
        }

        let mut image = None;
        let mut text = None;
        while image.is_none() || text.is_none() {
            let branch = match rx.recv() {
                Ok(branch) => branch,
                Err(_) => {
                    let message = "generation worker exited without a result".to_string();
                    self.fail(cycle, &message);
                    return Err(OrchestratorError::Worker(message));
                }
            };
            let failure = match branch {
                BranchResult::Image(Ok(value)) => {
                    image = Some(value);
                    None
                }
                BranchResult::Description(Ok(value)) => {
                    text = Some(value);
                    None
                }
                BranchResult::Image(Err(err)) | BranchResult::Description(Err(err)) => Some(err),
            };
            if let Some(err) = failure {
                let mut message = error_chain_text(&err, 600);
                if message.trim().is_empty() {
                    message = UNKNOWN_ERROR_MESSAGE.to_string();
                }
                self.fail(cycle, &message);
                return Err(OrchestratorError::Generation { cycle, message });
            }
        }

        let (Some(image), Some(description)) = (image, text) else {
            let message = "generation finished without both results".to_string();
            self.fail(cycle, &message);
            return Err(OrchestratorError::Worker(message));
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.lock_state().apply(Transition::LoadSuccess {
            cycle,
            image: image.clone(),
            description: description.clone(),
        });
        tracing::info!(cycle, elapsed_ms, "generation cycle published");
        self.events.emit_quiet(
            "generation_succeeded",
            map_object(json!({
                "cycle": cycle,
                "image": &image,
                "description_chars": description.chars().count(),
                "elapsed_ms": elapsed_ms,
            })),
        );
        Ok(GenerationReport {
            cycle,
            prompt: prompt.as_str().to_string(),
            image,
            description,
            elapsed_ms,
        })
    }

    fn fail(&self, cycle: u64, message: &str) {
        self.lock_state().apply(Transition::LoadError {
            cycle,
            message: message.to_string(),
        });
        tracing::warn!(cycle, "generation cycle failed: {message}");
        self.events.emit_quiet(
            "generation_failed",
            map_object(json!({
                "cycle": cycle,
                "error": message,
            })),
        );
    }

    fn lock_state(&self) -> MutexGuard<'_, ViewState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
