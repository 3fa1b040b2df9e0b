//! A configuration provider backed by a JSON file

use std::path::PathBuf;

use async_trait::async_trait;

use super::{ConfigProvider, RelayConfig};
use crate::error::ConfigError;

/// Reads configuration from a local JSON file
///
/// The file is re-read on every load, so edits apply from the next cycle on.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    /// Constructs a new file configuration provider
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_config(&self) -> Result<RelayConfig, ConfigError> {
        let data = tokio::fs::read_to_string(&self.path).await?;
        let config: RelayConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load(&self) -> Result<RelayConfig, ConfigError> {
        self.read_config().await.map_err(|error| {
            tracing::debug!(path = %self.path.display(), %error, "unable to load configuration file");
            error
        })
    }
}
