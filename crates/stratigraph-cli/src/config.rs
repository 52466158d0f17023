//! CLI configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stratigraph_core::DEFAULT_PARADATA_DEPTH;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "STRATIGRAPH_CONFIG";

/// Location of the config file: `$STRATIGRAPH_CONFIG`, else `<config_dir>/stratigraph/config.toml`
pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stratigraph")
        .join("config.toml")
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema table used instead of the builtin one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,

    /// Depth for `graph chain` when `--depth` is not given
    pub paradata_depth: u32,

    /// Reject a whole edge batch when any edge is invalid
    pub strict_batches: bool,

    /// Default output format
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_path: None,
            paradata_depth: DEFAULT_PARADATA_DEPTH,
            strict_batches: false,
            format: "table".to_string(),
        }
    }
}

impl Config {
    pub fn keys() -> &'static [&'static str] {
        &["schema_path", "paradata_depth", "strict_batches", "format"]
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        let path = config_file_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "schema_path" => Some(
                self.schema_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            "paradata_depth" => Some(self.paradata_depth.to_string()),
            "strict_batches" => Some(self.strict_batches.to_string()),
            "format" => Some(self.format.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "schema_path" => {
                self.schema_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "paradata_depth" => {
                self.paradata_depth = value
                    .parse()
                    .with_context(|| format!("paradata_depth must be a number, got '{}'", value))?;
            }
            "strict_batches" => {
                self.strict_batches = value
                    .parse()
                    .with_context(|| format!("strict_batches must be true or false, got '{}'", value))?;
            }
            "format" => match value {
                "table" | "json" => self.format = value.to_string(),
                other => anyhow::bail!("format must be 'table' or 'json', got '{}'", other),
            },
            _ => anyhow::bail!(
                "Unknown config key: {} (available: {})",
                key,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }

    /// Put one key back to its default value
    pub fn reset(&mut self, key: &str) -> anyhow::Result<()> {
        let default = Self::default();
        let value = default
            .get(key)
            .with_context(|| format!("Unknown config key: {}", key))?;
        self.set(key, &value)
    }
}
