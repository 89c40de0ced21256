pub mod chain;
pub mod description;
pub mod orchestrator;
pub mod procedural;
pub mod scene_asset;

use serde_json::{Map, Value};
use teeforge_contracts::config::StudioConfig;
use teeforge_contracts::events::EventWriter;

pub use chain::{
    AttemptFailure, ChainOutcome, HttpImageEndpoint, ImageEndpoint, ImageFallbackChain,
    ImageSource,
};
pub use description::GroqDescriber;
pub use orchestrator::{
    DescriptionGenerator, GenerationOrchestrator, GenerationReport, ImageGenerator,
    OrchestratorError,
};
pub use procedural::{DesignStyle, ProceduralDesign, ProceduralTexture};
pub use scene_asset::GltfScene;

pub fn orchestrator_from_config(
    config: &StudioConfig,
    procedural: ProceduralTexture,
    events: EventWriter,
) -> GenerationOrchestrator {
    let chain = ImageFallbackChain::from_config(config, procedural, events.clone());
    let describer = GroqDescriber::new(&config.description, events.clone());
    GenerationOrchestrator::new(
        std::sync::Arc::new(chain),
        std::sync::Arc::new(describer),
        events,
    )
}

pub(crate) fn response_json_or_error(
    provider: &str,
    response: reqwest::blocking::Response,
) -> anyhow::Result<Value> {
    use anyhow::Context as _;

    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        anyhow::bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

pub(crate) fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
