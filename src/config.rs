use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use itropa_core::DEFAULT_CAPACITY;

const APP_NAME: &str = "itropa";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_PORT: u16 = 17010;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file. Defaults to `itropa.db` in the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Base URL of the content generator
    pub generator_url: Option<String>,
    pub generator_api_key: Option<String>,
    /// Number of undoable actions kept.
    pub history_capacity: usize,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            generator_url: None,
            generator_api_key: None,
            history_capacity: DEFAULT_CAPACITY,
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Load settings from the user's config directory, then apply
    /// `ITROPA_*` environment overrides.
    /// Falls back to defaults if the file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let mut settings = match Self::try_load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&config_path)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Overrides fields from environment-style lookups. Unparseable numbers
    /// are ignored with a warning.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("ITROPA_DB") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(url) = var("ITROPA_GENERATOR_URL") {
            self.generator_url = Some(url);
        }
        if let Some(key) = var("ITROPA_GENERATOR_API_KEY") {
            self.generator_api_key = Some(key);
        }
        if let Some(raw) = var("ITROPA_HISTORY_CAPACITY") {
            match raw.parse() {
                Ok(capacity) => self.history_capacity = capacity,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid ITROPA_HISTORY_CAPACITY"),
            }
        }
        if let Some(raw) = var("ITROPA_PORT") {
            match raw.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid ITROPA_PORT"),
            }
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
