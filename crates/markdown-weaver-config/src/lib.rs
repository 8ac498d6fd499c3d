mod settings;

pub use settings::{ENABLED, Settings};

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

    #[error("Invalid source pattern '{pattern}': {source}")]
    SourcePatternError {
        pattern: String,
        source: glob::PatternError,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Glob patterns of documents to convert when none are given explicitly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    /// Where converted documents are written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Per-renderer settings keyed by renderer name.
    #[serde(default)]
    pub renderers: BTreeMap<String, toml::Table>,
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

        let mut config = Self::from_toml(&content).map_err(|source| {
            ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        // Expand shell variables and tilde in the output directory
        config.output_dir = config
            .output_dir
            .map(|dir| Self::expand_path(&dir).unwrap_or(dir));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/markdown-weaver");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Settings supplied for the renderer called `name`, if any.
    pub fn renderer(&self, name: &str) -> Option<&toml::Table> {
        self.renderers.get(name)
    }

    /// Resolve `sources` against `root`, sorted and deduplicated.
    pub fn source_files(&self, root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
        let mut files = Vec::new();
        for pattern in &self.sources {
            let full = root.join(pattern);
            let full = full.to_string_lossy();
            let paths = glob::glob(&full).map_err(|source| ConfigError::SourcePatternError {
                pattern: pattern.clone(),
                source,
            })?;
            // Unreadable entries are skipped like any other non-match
            files.extend(paths.filter_map(Result::ok).filter(|path| path.is_file()));
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
