//! Request body interpretation
//!
//! Turns the raw body of `POST /` into the XML document to render, according
//! to the deployment's [`RequestMode`].

use std::io;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::RequestMode;
use crate::error::{AppError, Result};

/// Envelope accepted in [`RequestMode::PathReference`]
#[derive(Debug, Deserialize)]
pub struct XmlReference {
    /// Path of the XML file to render
    pub xml: PathBuf,
}

/// Resolve the body into a non-blank XML document
pub async fn read_document(mode: RequestMode, body: &[u8]) -> Result<String> {
    let document = match mode {
        RequestMode::RawXml => std::str::from_utf8(body)
            .map_err(|e| AppError::MalformedInput(format!("body is not UTF-8: {}", e)))?
            .to_string(),
        RequestMode::PathReference => {
            let reference: XmlReference = serde_json::from_slice(body)
                .map_err(|e| AppError::MalformedInput(format!("invalid JSON envelope: {}", e)))?;
            read_referenced(reference.xml).await?
        }
    };

    let trimmed = document.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyDocument);
    }
    Ok(trimmed.to_string())
}

/// Read the file named by the envelope.
///
/// The path must be absolute. A path that exists but cannot be read as a
/// file is reported as bad input, not as a server failure.
async fn read_referenced(path: PathBuf) -> Result<String> {
    if !path.is_absolute() {
        return Err(AppError::MalformedInput(format!(
            "xml path must be absolute: {}",
            path.display()
        )));
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => String::from_utf8(bytes).map_err(|e| {
            AppError::MalformedInput(format!("{} is not UTF-8: {}", path.display(), e))
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AppError::ReferencedFileNotFound(path)),
        Err(e) => Err(AppError::MalformedInput(format!(
            "cannot read {}: {}",
            path.display(),
            e
        ))),
    }
}
