use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use teeforge_contracts::config::DescriptionConfig;
use teeforge_contracts::events::EventWriter;
use teeforge_contracts::prompts::{description_prompt, fallback_description};

use crate::orchestrator::DescriptionGenerator;
use crate::{error_chain_text, map_object, response_json_or_error};

const MAX_TOKENS: u64 = 200;
const TEMPERATURE: f64 = 0.8;

pub struct GroqDescriber {
    api_base: String,
    model: String,
    api_key: Option<String>,
    http: HttpClient,
    events: EventWriter,
}

impl GroqDescriber {
    pub fn new(config: &DescriptionConfig, events: EventWriter) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            http: HttpClient::new(),
            events,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    pub fn request_description(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("GROQ_API_KEY not set");
        };
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&chat_payload(&self.model, prompt))
            .send()
            .with_context(|| format!("Groq request failed ({endpoint})"))?;
        let parsed = response_json_or_error("Groq", response)?;
        extract_chat_text(&parsed)
    }

    pub fn describe(&self, prompt: &str) -> String {
        match self.request_description(prompt) {
            Ok(text) => text,
            Err(err) => {
                let error = error_chain_text(&err, 600);
                tracing::warn!("description request failed, using fallback: {error}");
                self.events.emit_quiet(
                    "description_fallback",
                    map_object(json!({
                        "model": self.model,
                        "error": error,
                    })),
                );
                fallback_description(prompt)
            }
        }
    }
}

impl DescriptionGenerator for GroqDescriber {
    fn generate_description(&self, prompt: &str) -> Result<String> {
        Ok(self.describe(prompt))
    }
}

pub fn chat_payload(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "user", "content": description_prompt(prompt)},
        ],
        "max_tokens": MAX_TOKENS,
        "temperature": TEMPERATURE,
    })
}

pub fn extract_chat_text(response: &Value) -> Result<String> {
    let text = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if text.is_empty() {
        bail!("Groq response has no message content");
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port_url, serve_once};

    fn config(api_base: String, api_key: Option<&str>) -> DescriptionConfig {
        DescriptionConfig {
            api_base,
            api_key: api_key.map(str::to_string),
            ..DescriptionConfig::default()
        }
    }

    #[test]
    fn unreachable_service_yields_fallback() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let describer = GroqDescriber::new(
            &config(closed_port_url("/v1"), Some("gsk-test")),
            EventWriter::new(&events_path, "session-test"),
        );

        let text = describer.describe("Retro SUNSET");
        assert!(text.contains("retro sunset"));
        assert_eq!(text, fallback_description("Retro SUNSET"));

        let logged = std::fs::read_to_string(&events_path)?;
        assert!(logged.contains("\"type\":\"description_fallback\""));
        Ok(())
    }

    #[test]
    fn missing_key_yields_fallback_without_a_request() {
        let describer = GroqDescriber::new(
            &config(closed_port_url("/v1"), None),
            EventWriter::discard("session-test"),
        );
        let err = describer
            .request_description("cat")
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert!(err.contains("GROQ_API_KEY"));
        assert_eq!(describer.describe("Cat"), fallback_description("cat"));
    }

    #[test]
    fn chat_completion_text_is_returned_trimmed() -> Result<()> {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "  Bold koi swirl tee.\n"}}]
        });
        let (url, server) = serve_once("200 OK", "application/json", body.to_string().into_bytes());
        let api_base = url.trim_end_matches("/generate").to_string();
        let describer = GroqDescriber::new(
            &config(api_base, Some("gsk-test")),
            EventWriter::discard("session-test"),
        );

        assert_eq!(describer.describe("koi"), "Bold koi swirl tee.");
        let request = server.join().map_err(|_| anyhow::anyhow!("server panicked"))?;
        assert!(request.starts_with("POST /chat/completions"));
        assert!(request.contains("llama-3-8b-8192"));
        Ok(())
    }

    #[test]
    fn error_status_yields_fallback() -> Result<()> {
        let (url, server) = serve_once(
            "401 Unauthorized",
            "application/json",
            br#"{"error":{"message":"Invalid API Key"}}"#.to_vec(),
        );
        let api_base = url.trim_end_matches("/generate").to_string();
        let describer = GroqDescriber::new(
            &config(api_base, Some("bad")),
            EventWriter::discard("session-test"),
        );
        assert_eq!(describer.describe("owl"), fallback_description("owl"));
        server.join().map_err(|_| anyhow::anyhow!("server panicked"))?;
        Ok(())
    }

    #[test]
    fn empty_content_is_rejected() {
        assert!(extract_chat_text(&json!({"choices": [{"message": {"content": "  "}}]})).is_err());
        assert!(extract_chat_text(&json!({"choices": []})).is_err());
        let payload = chat_payload("llama-3-8b-8192", "owl");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["max_tokens"], 200);
    }
}
