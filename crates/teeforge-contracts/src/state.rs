use serde::Serialize;

use crate::artifacts::GeneratedImage;

const SUBMIT_IDLE_LABEL: &str = "Generate Design";
const SUBMIT_BUSY_LABEL: &str = "Creating Magic...";
const EMPTY_PROMPT_HINT: &str = "Enter a design idea above to see the creative description";
const LOADING_HINT: &str = "Crafting your design story...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    LoadStart {
        cycle: u64,
    },
    LoadSuccess {
        cycle: u64,
        image: GeneratedImage,
        description: String,
    },
    LoadError {
        cycle: u64,
        message: String,
    },
    ValidationError {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub prompt: String,
    pub image: Option<GeneratedImage>,
    pub description: String,
    pub is_loading_image: bool,
    pub is_loading_description: bool,
    pub error: Option<String>,
    pub published_cycle: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "panel", content = "text", rename_all = "snake_case")]
pub enum DescriptionPanel {
    Hint(&'static str),
    Loading(&'static str),
    Ready(String),
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            image: Some(GeneratedImage::placeholder()),
            description: String::new(),
            is_loading_image: false,
            is_loading_description: false,
            error: None,
            published_cycle: None,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::LoadStart { cycle } => {
                tracing::debug!(cycle, "generation cycle started");
                self.is_loading_image = true;
                self.is_loading_description = true;
                self.error = None;
            }
            Transition::LoadSuccess {
                cycle,
                image,
                description,
            } => {
                if self.published_cycle.is_some_and(|published| published > cycle) {
                    tracing::debug!(
                        cycle,
                        published = ?self.published_cycle,
                        "older cycle resolved after a newer one"
                    );
                }
                self.image = Some(image);
                self.description = description;
                self.is_loading_image = false;
                self.is_loading_description = false;
                self.published_cycle = Some(cycle);
            }
            Transition::LoadError { cycle, message } => {
                tracing::debug!(cycle, %message, "generation cycle failed");
                self.error = Some(message);
                self.is_loading_image = false;
                self.is_loading_description = false;
            }
            Transition::ValidationError { message } => {
                self.error = Some(message);
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading_image || self.is_loading_description
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_loading_image {
            SUBMIT_BUSY_LABEL
        } else {
            SUBMIT_IDLE_LABEL
        }
    }

    pub fn description_panel(&self) -> DescriptionPanel {
        if self.prompt.trim().is_empty() {
            return DescriptionPanel::Hint(EMPTY_PROMPT_HINT);
        }
        if self.is_loading_description {
            return DescriptionPanel::Loading(LOADING_HINT);
        }
        DescriptionPanel::Ready(self.description.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg(tag: &str) -> GeneratedImage {
        GeneratedImage::DataUri(format!("data:image/svg+xml;base64,{tag}"))
    }

    #[test]
    fn starts_with_placeholder_and_idle_controls() {
        let state = ViewState::new();
        assert_eq!(state.image, Some(GeneratedImage::placeholder()));
        assert!(state.can_submit());
        assert_eq!(state.submit_label(), "Generate Design");
        assert_eq!(
            state.description_panel(),
            DescriptionPanel::Hint(EMPTY_PROMPT_HINT)
        );
    }

    #[test]
    fn load_start_keeps_artifacts_and_clears_error() {
        let mut state = ViewState::new();
        state.apply(Transition::ValidationError {
            message: "Please enter a design idea.".to_string(),
        });
        state.apply(Transition::LoadStart { cycle: 1 });

        assert!(state.error.is_none());
        assert!(state.is_loading_image && state.is_loading_description);
        assert!(!state.can_submit());
        assert_eq!(state.submit_label(), "Creating Magic...");
        assert_eq!(state.image, Some(GeneratedImage::placeholder()));
    }

    #[test]
    fn load_success_publishes_both_fields_together() {
        let mut state = ViewState::new();
        state.set_prompt("retro sunset");
        state.apply(Transition::LoadStart { cycle: 4 });
        assert_eq!(
            state.description_panel(),
            DescriptionPanel::Loading(LOADING_HINT)
        );
        state.apply(Transition::LoadSuccess {
            cycle: 4,
            image: svg("AAA"),
            description: "Sunset vibes.".to_string(),
        });

        assert_eq!(state.image, Some(svg("AAA")));
        assert_eq!(state.description, "Sunset vibes.");
        assert_eq!(state.published_cycle, Some(4));
        assert!(!state.is_loading());
        assert_eq!(
            state.description_panel(),
            DescriptionPanel::Ready("Sunset vibes.".to_string())
        );
    }

    #[test]
    fn load_error_leaves_previous_artifacts_untouched() {
        let mut state = ViewState::new();
        state.apply(Transition::LoadSuccess {
            cycle: 1,
            image: svg("OLD"),
            description: "old".to_string(),
        });
        state.apply(Transition::LoadStart { cycle: 2 });
        state.apply(Transition::LoadError {
            cycle: 2,
            message: "boom".to_string(),
        });

        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.image, Some(svg("OLD")));
        assert_eq!(state.description, "old");
        assert_eq!(state.published_cycle, Some(1));
        assert!(state.can_submit());
    }

    #[test]
    fn older_cycle_resolving_last_still_wins() {
        let mut state = ViewState::new();
        state.apply(Transition::LoadSuccess {
            cycle: 2,
            image: svg("NEW"),
            description: "new".to_string(),
        });
        state.apply(Transition::LoadSuccess {
            cycle: 1,
            image: svg("OLD"),
            description: "old".to_string(),
        });
        assert_eq!(state.description, "old");
        assert_eq!(state.published_cycle, Some(1));
    }

    #[test]
    fn serializes_without_image_payload() -> anyhow::Result<()> {
        let value = serde_json::to_value(ViewState::new())?;
        assert_eq!(value["image"]["kind"], "asset");
        assert_eq!(value["image"]["path"], "default-logo.svg");
        assert_eq!(value["is_loading_image"], false);
        Ok(())
    }
}
