use serde::{Deserialize, Serialize};

pub const HUGGINGFACE_URL: &str =
    "https://api-inference.huggingface.co/models/runwayml/stable-diffusion-v1-5";
pub const STABILITY_URL: &str =
    "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";
pub const IMAGEN_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/imagen-4.0-generate-001:predict";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    HuggingFace,
    Stability,
    Imagen,
}

impl EndpointKind {
    pub fn default_name(self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::Stability => "stability",
            Self::Imagen => "imagen",
        }
    }

    pub fn default_url(self) -> &'static str {
        match self {
            Self::HuggingFace => HUGGINGFACE_URL,
            Self::Stability => STABILITY_URL,
            Self::Imagen => IMAGEN_URL,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "huggingface" | "hf" => Some(Self::HuggingFace),
            "stability" | "stabilityai" => Some(Self::Stability),
            "imagen" | "gemini" => Some(Self::Imagen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub name: String,
    pub kind: EndpointKind,
    pub url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl EndpointDefinition {
    pub fn new(kind: EndpointKind) -> Self {
        Self {
            name: kind.default_name().to_string(),
            kind,
            url: kind.default_url().to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

impl NamedProvider for EndpointDefinition {
    fn name(&self) -> &str {
        self.name.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct ProviderRegistry<T: NamedProvider> {
    providers: Vec<T>,
}

pub trait NamedProvider {
    fn name(&self) -> &str;
}

impl<T: NamedProvider> ProviderRegistry<T> {
    pub fn new(providers: Vec<T>) -> Self {
        Self { providers }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.providers
            .iter()
            .find(|provider| provider.name() == name)
    }

    pub fn list(&self) -> Vec<String> {
        let mut names = self
            .providers
            .iter()
            .map(|provider| provider.name().to_string())
            .collect::<Vec<String>>();
        names.sort();
        names
    }

    pub fn providers(&self) -> &[T] {
        self.providers.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<T: NamedProvider> Default for ProviderRegistry<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
