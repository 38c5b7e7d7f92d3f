use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Toggles that change how document commands report problems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Show a message when a fragment gets more ARGS than it has placeholders.
    pub warn_on_excess_args: bool,
    /// Keep finished command bookmarks in the document instead of removing them.
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub policy: Policy,
    /// Fragment id to an ordered list of candidate locations. Earlier entries win.
    pub fragments: BTreeMap<String, Vec<String>>,
    /// Locations consumed one by one by `insertContent` commands.
    pub content_locations: Vec<String>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.expand_locations();

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/docmux");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Candidate locations for a fragment id, in the order they should be tried.
    pub fn fragment_locations(&self, frag_id: &str) -> &[String] {
        self.fragments
            .get(frag_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn expand_locations(&mut self) {
        for locations in self.fragments.values_mut() {
            for location in locations.iter_mut() {
                if let Some(expanded) = Self::expand_location(location) {
                    *location = expanded;
                }
            }
        }
        for location in self.content_locations.iter_mut() {
            if let Some(expanded) = Self::expand_location(location) {
                *location = expanded;
            }
        }
    }

    fn expand_location(location: &str) -> Option<String> {
        match shellexpand::full(location) {
            Ok(expanded) => Some(expanded.into_owned()),
            Err(_) => None,
        }
    }
}
