//! Session configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainDescriptor, ChainRegistry};
use crate::deeplink::DEFAULT_ARGS_PREFIX;
use crate::executor::DEFAULT_RECEIPT_POLL_INTERVAL;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Query-parameter namespace for argument seeds.
    pub args_prefix: String,
    /// Chains added to, or replacing entries of, the built-in registry.
    pub extra_chains: Vec<ChainDescriptor>,
    pub receipt_poll_interval_ms: u64,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            args_prefix: DEFAULT_ARGS_PREFIX.to_string(),
            extra_chains: vec![],
            receipt_poll_interval_ms: DEFAULT_RECEIPT_POLL_INTERVAL.as_millis() as u64,
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

impl SessionConfig {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid session config")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn registry(&self) -> ChainRegistry {
        ChainRegistry::builtin().with_chains(self.extra_chains.iter().cloned())
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}
