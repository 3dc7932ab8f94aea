//! Source document loading (HTTP or local file, optionally gzip-compressed)

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use flate2::read::GzDecoder;
use serde_json::Value;

use crate::errors::DocumentError;

/// Where the JSON document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(String),
    File(PathBuf),
}

impl DocumentSource {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let lower = input.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DocumentSource::Url(input.to_string())
        } else {
            let path = input.strip_prefix("file://").unwrap_or(input);
            DocumentSource::File(PathBuf::from(path))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DocumentSource::Url(url) => url.clone(),
            DocumentSource::File(path) => path.display().to_string(),
        }
    }
}

/// Fetch and parse the document. Only a JSON object is accepted.
pub fn fetch_document(
    source: &DocumentSource,
    user_agent: &str,
    timeout: Duration,
) -> Result<Value, DocumentError> {
    log::info!("Loading data document from {}", source.describe());
    let bytes = match source {
        DocumentSource::Url(url) => download(url, user_agent, timeout)?,
        DocumentSource::File(path) => std::fs::read(path)?,
    };
    let value = parse_document(&bytes)?;
    log::info!("Loaded data document ({} bytes)", bytes.len());
    Ok(value)
}

fn download(url: &str, user_agent: &str, timeout: Duration) -> Result<Vec<u8>, DocumentError> {
    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .timeout_connect(Some(Duration::from_secs(30).min(timeout)))
        .build()
        .new_agent();

    let mut response = agent
        .get(url)
        .header("User-Agent", user_agent)
        .header("Accept", "application/json")
        .call()
        .map_err(|e| match e {
            ureq::Error::StatusCode(code) => DocumentError::Status(code),
            other => DocumentError::Http(other),
        })?;

    if response.status() != 200 {
        return Err(DocumentError::Status(response.status().as_u16()));
    }

    Ok(response.body_mut().read_to_vec()?)
}

/// Gzip is detected by its magic number (1f 8b), not by headers or extension
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

pub fn parse_document(bytes: &[u8]) -> Result<Value, DocumentError> {
    let value: Value = if is_gzip(bytes) {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .map_err(|e| DocumentError::Decompress(e.to_string()))?;
        serde_json::from_str(&text)?
    } else {
        serde_json::from_slice(bytes)?
    };

    if !value.is_object() {
        return Err(DocumentError::NotAnObject);
    }
    Ok(value)
}
