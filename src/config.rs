use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cache::ListSpec;
use crate::feed::SourceKind;

pub const DEFAULT_CONFIG_PATH: &str = "folio.yaml";

/// Settings read from `folio.yaml`. Every field has a default, so a missing
/// file or a partial one is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file for snapshots, `folio.db` by default. An explicit `null`
    /// keeps snapshots in memory only.
    pub store_path: Option<String>,
    /// Profile YAML; unset uses the built-in profile.
    pub profile_path: Option<String>,
    /// Feed-to-JSON conversion endpoint.
    pub converter_url: String,
    pub writing: ListConfig,
    pub podcast: ListConfig,
    pub assistant: AssistantConfig,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    pub key: String,
    #[serde(default)]
    pub feed_url: String,
    #[serde(default)]
    pub source: SourceKind,
    pub error_message: String,
}

impl ListConfig {
    pub fn spec(&self) -> ListSpec {
        ListSpec {
            key: self.key.clone(),
            feed_url: self.feed_url.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub base_url: String,
    pub model: String,
    pub streaming: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            streaming: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub console_level: String,
    pub file_level: String,
    pub file: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            console_level: "warn".to_string(),
            file_level: "debug".to_string(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: Some("folio.db".to_string()),
            profile_path: None,
            converter_url: "https://api.rss2json.com/v1/api.json".to_string(),
            writing: ListConfig {
                key: "folio.articles".to_string(),
                feed_url: "https://aminuddinshroff.substack.com/feed".to_string(),
                source: SourceKind::Converter,
                error_message: "Could not load articles from Substack. Please try again later.".to_string(),
            },
            podcast: ListConfig {
                key: "folio.episodes".to_string(),
                feed_url: String::new(),
                source: SourceKind::Converter,
                error_message: "Could not load podcast episodes. Please try again later.".to_string(),
            },
            assistant: AssistantConfig::default(),
            log: LogSettings::default(),
        }
    }
}

impl Config {
    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!("Config file does not exist, using defaults: {}", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("invalid config YAML in {}", path))?;
        debug!("Loaded config from {}", path);
        Ok(config)
    }
}
