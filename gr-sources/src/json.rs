//! JSON session documents
//!
//! Reads the exported race document: `event`, `track`, `drivers` keyed by
//! abbreviation, `frames` and optional `metadata`. Either from disk or from
//! an in-memory upload.

use anyhow::{Context, Result};
use gr_core::model::SessionDocument;
use gr_core::source::SessionSource;
use std::path::PathBuf;
use tracing::info;

enum JsonInput {
    File(PathBuf),
    Bytes(Vec<u8>),
}

pub struct JsonSessionSource {
    name: String,
    input: JsonInput,
}

impl JsonSessionSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            input: JsonInput::File(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            input: JsonInput::Bytes(bytes.into()),
        }
    }
}

impl SessionSource for JsonSessionSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self) -> Result<SessionDocument> {
        let document = match &self.input {
            JsonInput::File(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read session file {}", path.display()))?;
                parse_document(&bytes)
                    .with_context(|| format!("Invalid session file {}", path.display()))?
            }
            JsonInput::Bytes(bytes) => parse_document(bytes)
                .with_context(|| format!("Invalid session document {}", self.name))?,
        };

        info!(
            "Loaded {}: {} ({} frames, {} drivers, {} track points)",
            self.name,
            document.event,
            document.frames.len(),
            document.drivers.len(),
            document.track.len()
        );

        Ok(document)
    }
}

/// Parse and validate a session document
pub fn parse_document(bytes: &[u8]) -> Result<SessionDocument> {
    let document: SessionDocument =
        serde_json::from_slice(bytes).context("Failed to parse session JSON")?;
    document
        .validate()
        .context("Session document failed validation")?;
    Ok(document)
}
