use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::{EndpointDefinition, EndpointKind, ProviderRegistry};
use crate::scene::{DEFAULT_CANDIDATE_NAMES, DEFAULT_MIN_SIZE};

pub const DEFAULT_DESCRIPTION_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_DESCRIPTION_MODEL: &str = "llama-3-8b-8192";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default = "default_image_endpoints")]
    pub image_endpoints: Vec<EndpointDefinition>,
    #[serde(default)]
    pub description: DescriptionConfig,
    #[serde(default)]
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionConfig {
    #[serde(default = "default_description_api_base")]
    pub api_base: String,
    #[serde(default = "default_description_model")]
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_candidate_names")]
    pub candidate_names: Vec<String>,
    #[serde(default = "default_min_size")]
    pub min_size: [f32; 3],
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            image_endpoints: default_image_endpoints(),
            description: DescriptionConfig::default(),
            scene: SceneConfig::default(),
        }
    }
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self {
            api_base: default_description_api_base(),
            model: default_description_model(),
            api_key: None,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            candidate_names: default_candidate_names(),
            min_size: default_min_size(),
        }
    }
}

impl StudioConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config JSON in {}", path.display()))
    }

    /// Only vendor credentials, URLs and the endpoint order come from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(order) = non_empty("TEEFORGE_IMAGE_ENDPOINTS") {
            let configured = self.endpoint_registry();
            let mut endpoints: Vec<EndpointDefinition> = Vec::new();
            for item in order.split(',').map(str::trim).filter(|item| !item.is_empty()) {
                let selected = match configured.get(item) {
                    Some(endpoint) => endpoint.clone(),
                    None => {
                        let Some(kind) = EndpointKind::parse(item) else {
                            bail!("unknown image endpoint '{item}' in TEEFORGE_IMAGE_ENDPOINTS");
                        };
                        let of_kind: Vec<&EndpointDefinition> = configured
                            .providers()
                            .iter()
                            .filter(|endpoint| endpoint.kind == kind)
                            .collect();
                        if of_kind.is_empty() {
                            EndpointDefinition::new(kind)
                        } else {
                            match of_kind
                                .into_iter()
                                .find(|endpoint| !contains_name(&endpoints, &endpoint.name))
                            {
                                Some(endpoint) => endpoint.clone(),
                                None => continue,
                            }
                        }
                    }
                };
                if contains_name(&endpoints, &selected.name) {
                    continue;
                }
                endpoints.push(selected);
            }
            self.image_endpoints = endpoints;
        }

        let gemini_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY"));
        let has_imagen = self
            .image_endpoints
            .iter()
            .any(|endpoint| endpoint.kind == EndpointKind::Imagen);
        if gemini_key.is_some() && !has_imagen {
            self.image_endpoints
                .push(EndpointDefinition::new(EndpointKind::Imagen));
        }

        for endpoint in &mut self.image_endpoints {
            let (key_var, base_var) = match endpoint.kind {
                EndpointKind::HuggingFace => ("HUGGINGFACE_API_KEY", "HUGGINGFACE_API_URL"),
                EndpointKind::Stability => ("STABILITY_API_KEY", "STABILITY_API_URL"),
                EndpointKind::Imagen => ("IMAGEN_API_KEY", "IMAGEN_API_URL"),
            };
            let key = match endpoint.kind {
                EndpointKind::Imagen => non_empty(key_var).or_else(|| gemini_key.clone()),
                _ => non_empty(key_var),
            };
            if key.is_some() {
                endpoint.api_key = key;
            }
            if let Some(url) = non_empty(base_var) {
                endpoint.url = url;
            }
        }

        if let Some(key) = non_empty("GROQ_API_KEY") {
            self.description.api_key = Some(key);
        }
        if let Some(base) = non_empty("GROQ_API_BASE") {
            self.description.api_base = base.trim_end_matches('/').to_string();
        }

        Ok(self)
    }

    pub fn endpoint_registry(&self) -> ProviderRegistry<EndpointDefinition> {
        ProviderRegistry::new(self.image_endpoints.clone())
    }
}

fn contains_name(endpoints: &[EndpointDefinition], name: &str) -> bool {
    endpoints.iter().any(|endpoint| endpoint.name == name)
}

fn default_image_endpoints() -> Vec<EndpointDefinition> {
    vec![
        EndpointDefinition::new(EndpointKind::HuggingFace),
        EndpointDefinition::new(EndpointKind::Stability),
    ]
}

fn default_description_api_base() -> String {
    DEFAULT_DESCRIPTION_API_BASE.to_string()
}

fn default_description_model() -> String {
    DEFAULT_DESCRIPTION_MODEL.to_string()
}

fn default_candidate_names() -> Vec<String> {
    DEFAULT_CANDIDATE_NAMES
        .iter()
        .map(|name| (*name).to_string())
        .collect()
}

fn default_min_size() -> [f32; 3] {
    DEFAULT_MIN_SIZE
}
