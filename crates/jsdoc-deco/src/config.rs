//! Configuration

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use jsdoc_deco_languages::Dialect;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_languages() -> Vec<String> {
    vec!["typescript".to_string(), "typescriptreact".to_string()]
}

fn default_color() -> String {
    "#8a8a8a".to_string()
}

fn default_margin() -> String {
    "0 0 0 8px".to_string()
}

/// Appearance of the inline annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DecorationStyle {
    /// Text colour of the annotation (CSS colour)
    #[serde(default = "default_color")]
    pub color: String,

    /// Margin around the annotation (CSS shorthand)
    #[serde(default = "default_margin")]
    pub margin: String,
}

impl Default for DecorationStyle {
    fn default() -> Self {
        Self {
            color: default_color(),
            margin: default_margin(),
        }
    }
}

/// jsdoc-deco configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DecoConfig {
    /// Quiet period after an edit, scroll or cursor move before the
    /// document is rescanned, in milliseconds (default: 150)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Upper bound on documentation requests in flight per refresh
    /// (default: 4)
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Language ids that get decorations. Only `typescript` and
    /// `typescriptreact` can be scanned; other ids are ignored.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    #[serde(default)]
    pub decoration: DecorationStyle,

    /// Switch the language service to semantic mode on activation
    /// (default: true). Without it the plugin never runs.
    #[serde(default = "default_true")]
    pub enforce_semantic_server: bool,
}

impl Default for DecoConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            languages: default_languages(),
            decoration: DecorationStyle::default(),
            enforce_semantic_server: true,
        }
    }
}

impl DecoConfig {
    /// Load from a JSON file. Fields left out take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load `path` if given and present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load_from_file(path),
            Some(path) => {
                tracing::info!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn worker_count(&self) -> usize {
        self.max_concurrent_requests.max(1)
    }

    /// The dialect to scan a document with, if its language is enabled
    pub fn dialect_for(&self, language_id: &str) -> Option<Dialect> {
        if !self.languages.iter().any(|id| id == language_id) {
            return None;
        }
        Dialect::from_language_id(language_id)
    }

    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(DecoConfig)).unwrap_or_default()
    }
}
