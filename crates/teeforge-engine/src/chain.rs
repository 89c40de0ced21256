use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use teeforge_contracts::artifacts::GeneratedImage;
use teeforge_contracts::config::StudioConfig;
use teeforge_contracts::events::EventWriter;
use teeforge_contracts::prompts::{imagen_prompt, texture_prompt};
use teeforge_contracts::providers::{
    EndpointDefinition, EndpointKind, NamedProvider, ProviderRegistry,
};

use crate::orchestrator::ImageGenerator;
use crate::procedural::{DesignStyle, ProceduralTexture};
use crate::{error_chain_text, map_object, response_json_or_error, truncate_text};

const FAILURE_TEXT_MAX_CHARS: usize = 600;

pub trait ImageEndpoint: Send + Sync {
    fn name(&self) -> &str;
    fn attempt(&self, prompt: &str) -> Result<GeneratedImage>;
}

impl NamedProvider for Box<dyn ImageEndpoint> {
    fn name(&self) -> &str {
        (**self).name()
    }
}

pub struct HttpImageEndpoint {
    definition: EndpointDefinition,
    http: HttpClient,
}

impl HttpImageEndpoint {
    pub fn new(definition: EndpointDefinition) -> Self {
        Self {
            definition,
            http: HttpClient::new(),
        }
    }

    pub fn definition(&self) -> &EndpointDefinition {
        &self.definition
    }

    fn send(&self, api_key: &str, payload: &Value) -> Result<reqwest::blocking::Response> {
        let name = self.definition.name.as_str();
        let url = self.definition.url.as_str();
        let request = self.http.post(url).json(payload);
        let request = match self.definition.kind {
            EndpointKind::Imagen => request.query(&[("key", api_key)]),
            EndpointKind::HuggingFace | EndpointKind::Stability => request.bearer_auth(api_key),
        };
        request
            .send()
            .with_context(|| format!("{name} request failed ({url})"))
    }
}

impl ImageEndpoint for HttpImageEndpoint {
    fn name(&self) -> &str {
        self.definition.name.as_str()
    }

    fn attempt(&self, prompt: &str) -> Result<GeneratedImage> {
        let name = self.definition.name.as_str();
        let Some(api_key) = self.definition.api_key.as_deref() else {
            bail!("{name} API key not configured");
        };
        let payload = build_payload(self.definition.kind, prompt);
        let response = self.send(api_key, &payload)?;
        match self.definition.kind {
            EndpointKind::HuggingFace => read_binary_image(name, response),
            EndpointKind::Stability | EndpointKind::Imagen => {
                let parsed = response_json_or_error(name, response)?;
                extract_json_image(self.definition.kind, &parsed)
                    .with_context(|| format!("{name} response carried no image"))
            }
        }
    }
}

pub fn build_payload(kind: EndpointKind, prompt: &str) -> Value {
    match kind {
        EndpointKind::HuggingFace => json!({
            "inputs": texture_prompt(prompt),
            "parameters": {
                "num_inference_steps": 25,
                "guidance_scale": 8.0,
                "width": 512,
                "height": 512,
            },
        }),
        EndpointKind::Stability => json!({
            "text_prompts": [{"text": texture_prompt(prompt), "weight": 1}],
            "cfg_scale": 8,
            "height": 512,
            "width": 512,
            "samples": 1,
            "steps": 35,
        }),
        EndpointKind::Imagen => json!({
            "instances": [{"prompt": imagen_prompt(prompt)}],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": "1:1",
                "outputMimeType": "image/png",
            },
        }),
    }
}

pub fn extract_json_image(kind: EndpointKind, response: &Value) -> Result<GeneratedImage> {
    let encoded = match kind {
        EndpointKind::Stability => response
            .get("artifacts")
            .and_then(Value::as_array)
            .and_then(|artifacts| artifacts.first())
            .and_then(|artifact| artifact.get("base64"))
            .and_then(Value::as_str),
        EndpointKind::Imagen => response
            .get("predictions")
            .and_then(Value::as_array)
            .and_then(|predictions| predictions.first())
            .and_then(|prediction| prediction.get("bytesBase64Encoded"))
            .and_then(Value::as_str),
        EndpointKind::HuggingFace => bail!("huggingface answers with binary image bytes"),
    };
    match encoded.map(str::trim).filter(|value| !value.is_empty()) {
        Some(data) => Ok(GeneratedImage::png_base64(data)),
        None => bail!("response has no base64 image field"),
    }
}

fn read_binary_image(name: &str, response: reqwest::blocking::Response) -> Result<GeneratedImage> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase());
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        bail!(
            "{name} request failed ({}): {}",
            status.as_u16(),
            truncate_text(&body, 512)
        );
    }
    let bytes = response
        .bytes()
        .with_context(|| format!("{name} image bytes read failed"))?
        .to_vec();
    if content_type
        .as_deref()
        .is_some_and(|value| value.starts_with("application/json"))
    {
        bail!(
            "{name} returned JSON instead of an image: {}",
            truncate_text(&String::from_utf8_lossy(&bytes), 512)
        );
    }
    if bytes.is_empty() {
        bail!("{name} returned an empty image body");
    }
    let declared = content_type
        .map(|value| value.split(';').next().unwrap_or_default().trim().to_string())
        .filter(|value| value.starts_with("image/"));
    let mime_type = match declared {
        Some(mime) => mime,
        None => image::guess_format(&bytes)
            .map(|format| format.to_mime_type().to_string())
            .with_context(|| format!("{name} returned an unrecognised image payload"))?,
    };
    Ok(GeneratedImage::Blob { mime_type, bytes })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Endpoint(String),
    Procedural(DesignStyle),
}

impl ImageSource {
    pub fn label(&self) -> String {
        match self {
            Self::Endpoint(name) => name.clone(),
            Self::Procedural(style) => format!("procedural:{}", style.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub endpoint: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub image: GeneratedImage,
    pub source: ImageSource,
    pub failures: Vec<AttemptFailure>,
}

pub struct ImageFallbackChain {
    endpoints: ProviderRegistry<Box<dyn ImageEndpoint>>,
    procedural: ProceduralTexture,
    events: EventWriter,
}

impl ImageFallbackChain {
    pub fn new(
        endpoints: Vec<Box<dyn ImageEndpoint>>,
        procedural: ProceduralTexture,
        events: EventWriter,
    ) -> Self {
        let endpoints = ProviderRegistry::new(endpoints);
        if endpoints.is_empty() {
            tracing::warn!("no image endpoints configured; every image will be procedural");
        }
        Self {
            endpoints,
            procedural,
            events,
        }
    }

    pub fn from_config(
        config: &StudioConfig,
        procedural: ProceduralTexture,
        events: EventWriter,
    ) -> Self {
        let endpoints = config
            .image_endpoints
            .iter()
            .cloned()
            .map(|definition| Box::new(HttpImageEndpoint::new(definition)) as Box<dyn ImageEndpoint>)
            .collect();
        Self::new(endpoints, procedural, events)
    }

    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints
            .providers()
            .iter()
            .map(|endpoint| endpoint.name().to_string())
            .collect()
    }

    pub fn generate(&self, prompt: &str) -> ChainOutcome {
        let mut failures = Vec::new();
        for endpoint in self.endpoints.providers() {
            let name = endpoint.name().to_string();
            match endpoint.attempt(prompt) {
                Ok(image) => {
                    tracing::info!(endpoint = %name, "image endpoint succeeded");
                    self.events.emit_quiet(
                        "image_generated",
                        map_object(json!({
                            "source": name,
                            "mime_type": image.mime_type(),
                            "failed_endpoints": failures.len(),
                        })),
                    );
                    return ChainOutcome {
                        image,
                        source: ImageSource::Endpoint(name),
                        failures,
                    };
                }
                Err(err) => {
                    let error = error_chain_text(&err, FAILURE_TEXT_MAX_CHARS);
                    tracing::warn!(endpoint = %name, "image endpoint failed: {error}");
                    self.events.emit_quiet(
                        "endpoint_failed",
                        map_object(json!({
                            "endpoint": name,
                            "error": error,
                        })),
                    );
                    failures.push(AttemptFailure {
                        endpoint: name,
                        error,
                    });
                }
            }
        }

        let design = self.procedural.design(prompt);
        let source = ImageSource::Procedural(design.style);
        tracing::info!(
            style = design.style.name(),
            failed_endpoints = failures.len(),
            "using procedural texture"
        );
        self.events.emit_quiet(
            "procedural_fallback",
            map_object(json!({
                "source": source.label(),
                "style": design.style.name(),
                "failed_endpoints": failures
                    .iter()
                    .map(|failure| failure.endpoint.clone())
                    .collect::<Vec<String>>(),
            })),
        );
        ChainOutcome {
            image: design.to_image(),
            source,
            failures,
        }
    }
}

impl ImageGenerator for ImageFallbackChain {
    fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        Ok(self.generate(prompt).image)
    }
}
