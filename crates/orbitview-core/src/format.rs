//! Model file format detection
//!
//! Uploaded models are handed to the renderer from memory with no base
//! path, so only self-contained glTF is accepted: binary `.glb`, or JSON
//! `.gltf` whose buffers and images are embedded as data URIs.

use serde::Deserialize;
use thiserror::Error;

const GLB_MAGIC: &[u8; 4] = b"glTF";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("File is empty")]
    Empty,
    #[error("Unrecognized model format: {name}")]
    Unrecognized { name: String },
    #[error("Unsupported binary glTF version {0}")]
    UnsupportedVersion(u32),
    #[error("glTF references external resource '{0}'; use .glb or embedded data URIs")]
    ExternalResources(String),
    #[error("Invalid glTF JSON: {0}")]
    InvalidJson(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// Binary glTF container
    Glb,
    /// JSON glTF with embedded resources
    Gltf,
}

/// Only the parts of a glTF document that can point outside the file
#[derive(Deserialize)]
struct GltfUris {
    #[serde(default)]
    buffers: Vec<UriEntry>,
    #[serde(default)]
    images: Vec<UriEntry>,
}

#[derive(Deserialize)]
struct UriEntry {
    #[serde(default)]
    uri: Option<String>,
}

impl ModelFormat {
    /// Accept attribute for the file picker
    pub const ACCEPT: &'static str = ".glb,.gltf";

    pub fn extension(&self) -> &'static str {
        match self {
            ModelFormat::Glb => "glb",
            ModelFormat::Gltf => "gltf",
        }
    }

    /// Detect the format from file content, using `name` only for messages
    pub fn detect(name: &str, bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.is_empty() {
            return Err(FormatError::Empty);
        }

        if bytes.starts_with(GLB_MAGIC) {
            let version = bytes
                .get(4..8)
                .map(|v| u32::from_le_bytes([v[0], v[1], v[2], v[3]]))
                .unwrap_or(0);
            if version != 2 {
                return Err(FormatError::UnsupportedVersion(version));
            }
            return Ok(ModelFormat::Glb);
        }

        let text = std::str::from_utf8(bytes).map_err(|_| FormatError::Unrecognized {
            name: name.to_string(),
        })?;
        let trimmed = text.trim_start_matches('\u{feff}').trim_start();
        if !trimmed.starts_with('{') || !trimmed.contains("\"asset\"") {
            return Err(FormatError::Unrecognized {
                name: name.to_string(),
            });
        }

        let uris: GltfUris =
            serde_json::from_str(trimmed).map_err(|e| FormatError::InvalidJson(e.to_string()))?;
        if let Some(external) = uris
            .buffers
            .iter()
            .chain(uris.images.iter())
            .filter_map(|entry| entry.uri.as_deref())
            .find(|uri| !uri.starts_with("data:"))
        {
            return Err(FormatError::ExternalResources(external.to_string()));
        }

        Ok(ModelFormat::Gltf)
    }
}
