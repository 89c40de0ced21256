use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const DEFAULT_PLACEHOLDER_ASSET: &str = "default-logo.svg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    DataUri(String),
    Blob { mime_type: String, bytes: Vec<u8> },
    Asset(String),
}

impl GeneratedImage {
    pub fn placeholder() -> Self {
        Self::Asset(DEFAULT_PLACEHOLDER_ASSET.to_string())
    }

    pub fn png_base64(data: &str) -> Self {
        Self::DataUri(format!("data:image/png;base64,{}", data.trim()))
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::DataUri(uri) => parse_data_uri_header(uri).map(|(mime, _)| mime),
            Self::Blob { mime_type, .. } => Some(mime_type.as_str()),
            Self::Asset(path) => mime_for_extension(path),
        }
    }

    pub fn to_data_uri(&self) -> Result<String> {
        match self {
            Self::DataUri(uri) => Ok(uri.clone()),
            Self::Blob { mime_type, bytes } => {
                Ok(format!("data:{mime_type};base64,{}", BASE64.encode(bytes)))
            }
            Self::Asset(path) => bail!("asset reference {path} has no inline payload"),
        }
    }

    pub fn decode(&self) -> Result<(String, Vec<u8>)> {
        match self {
            Self::DataUri(uri) => {
                let (mime, is_base64) = parse_data_uri_header(uri)
                    .with_context(|| "malformed data URI header".to_string())?;
                let Some((_, data)) = uri.split_once(',') else {
                    bail!("data URI has no payload");
                };
                let bytes = if is_base64 {
                    BASE64
                        .decode(data.trim().as_bytes())
                        .context("data URI base64 decode failed")?
                } else {
                    data.as_bytes().to_vec()
                };
                Ok((mime.to_string(), bytes))
            }
            Self::Blob { mime_type, bytes } => Ok((mime_type.clone(), bytes.clone())),
            Self::Asset(path) => bail!("asset reference {path} has no inline payload"),
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type().unwrap_or_default() {
            "image/svg+xml" => "svg",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::DataUri(_) => "data_uri",
            Self::Blob { .. } => "blob",
            Self::Asset(_) => "asset",
        }
    }
}

impl Serialize for GeneratedImage {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("kind", self.kind())?;
        map.serialize_entry("mime_type", &self.mime_type())?;
        match self {
            Self::DataUri(uri) => map.serialize_entry("length", &uri.len())?,
            Self::Blob { bytes, .. } => map.serialize_entry("length", &bytes.len())?,
            Self::Asset(path) => map.serialize_entry("path", path)?,
        }
        map.end()
    }
}

fn parse_data_uri_header(uri: &str) -> Option<(&str, bool)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, _) = rest.split_once(',')?;
    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime = mime.split(';').next().unwrap_or_default();
    if mime.is_empty() {
        return Some(("text/plain", is_base64));
    }
    Some((mime, is_base64))
}

fn mime_for_extension(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "svg" => Some("image/svg+xml"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
