//! Analysis configuration

use chaff_utils::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Controls which filters run and how methods are scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Names of filters to skip (see [`crate::filter::Filter::name`])
    pub disabled_filters: Vec<String>,
    /// Analyze the methods of a class on scoped worker threads
    pub parallel: bool,
}

impl AnalysisConfig {
    /// Loads a JSON configuration file. Missing fields take their default.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}
