//! JSON file configuration adapter.
//!
//! Implements [`ConfigPort`] over a single JSON document. Every load is
//! validated; an invalid file is rejected, never clamped into range.

use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::ControllerConfig;
use crate::error::ConfigError;

pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Like [`ConfigPort::load`], but a missing file yields defaults.
    pub fn load_or_default(&self) -> Result<ControllerConfig, ConfigError> {
        if !self.path.exists() {
            info!("CONFIG: {} not found, using defaults", self.path.display());
            return Ok(ControllerConfig::default());
        }
        self.load()
    }
}

impl ConfigPort for JsonConfigStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|_| ConfigError::Unreadable)?;
        let config: ControllerConfig =
            serde_json::from_str(&text).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        info!("CONFIG: loaded {}", self.path.display());
        Ok(config)
    }
}
