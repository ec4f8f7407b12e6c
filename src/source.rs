//! Artifact sources.
//!
//! Every source ends up as parsed JSON handed to the ABI normalizer. A source
//! that fails to load or parse is an error; JSON that parses but matches no
//! ABI shape is not (see [`crate::abi::normalize`]).

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::error::{ErrorClass, UserFacing};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Url(String),
    File(PathBuf),
    /// JSON text supplied directly, e.g. pasted or read by the host's file picker.
    Inline { name: String, text: String },
}

impl ArtifactSource {
    /// How the source is labelled in the session.
    pub fn label(&self) -> String {
        match self {
            ArtifactSource::Url(url) => url.clone(),
            ArtifactSource::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            ArtifactSource::Inline { name, .. } => name.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    MalformedJson(#[from] serde_json::Error),
}

impl UserFacing for SourceError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Input
    }
}

#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub source: String,
    pub json: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ArtifactLoader {
    client: reqwest::Client,
}

impl ArtifactLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn load(&self, source: &ArtifactSource) -> Result<LoadedArtifact, SourceError> {
        let json = match source {
            ArtifactSource::Url(url) => self.fetch(url).await?,
            ArtifactSource::File(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SourceError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                serde_json::from_str(&text)?
            }
            ArtifactSource::Inline { text, .. } => serde_json::from_str(text)?,
        };
        debug!(source = %source.label(), "artifact loaded");
        Ok(LoadedArtifact {
            source: source.label(),
            json,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Value, SourceError> {
        let fetch_error = |source| SourceError::Fetch {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?;
        let text = response.text().await.map_err(fetch_error)?;
        Ok(serde_json::from_str(&text)?)
    }
}
