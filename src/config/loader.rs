//! Profile file loader.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::{ConfigError, Configuration, ExecutorSettings};

/// Settings plus backend selection, as stored in a profile file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorProfile {
    pub settings: ExecutorSettings,
    pub agent: Configuration,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    #[serde(default)]
    settings: ExecutorSettings,
    #[serde(default)]
    agent: Value,
}

impl RawProfile {
    fn into_profile(self) -> Result<ExecutorProfile, ConfigError> {
        // A missing `[agent]` table is an empty selection, not a syntax error.
        let agent = if self.agent.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            self.agent
        };
        Ok(ExecutorProfile {
            settings: self.settings,
            agent: Configuration::parse(&agent)?,
        })
    }
}

impl ExecutorProfile {
    /// Parse a profile from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the agent selection is rejected.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str::<RawProfile>(raw)?.into_profile()
    }

    /// Parse a profile from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the agent selection is rejected.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<RawProfile>(raw)?.into_profile()
    }
}

/// Profile loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new loader with the default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .vibe-executor.toml
        search_paths.push(PathBuf::from(".vibe-executor.toml"));

        // 2. User config directory: ~/.config/vibe-executor/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("vibe-executor").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a loader with a specific profile path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load the first profile that exists, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if a profile exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<ExecutorProfile>, ConfigError> {
        match self.find_config_file() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading profile");
                Self::load_from(&path).map(Some)
            }
            None => {
                tracing::debug!("No profile found");
                Ok(None)
            }
        }
    }

    /// Load a profile from a specific path. The extension picks the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unsupported
    /// extension, or fails to parse.
    pub fn load_from(path: &Path) -> Result<ExecutorProfile, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => ExecutorProfile::from_toml_str(&content),
            Some("json") => ExecutorProfile::from_json_str(&content),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Like [`ConfigLoader::load`], but a missing profile is an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoProfileFound` when no search path exists, or
    /// any error from loading the profile that does.
    pub fn load_required(&self) -> Result<ExecutorProfile, ConfigError> {
        self.load()?.ok_or_else(|| ConfigError::NoProfileFound {
            searched: self.search_paths.clone(),
        })
    }

    /// Find the first profile that exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
