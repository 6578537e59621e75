//! Bot configuration
//!
//! Loaded from `data/settings.json`. Every field is optional; missing keys
//! fall back to the defaults below, so an upgraded bot keeps running on an
//! old file. The Steam API key may instead come from the `STEAM_API_KEY`
//! environment variable, which wins over the file. Having no key at all is
//! the one fatal condition.

use std::fs;
use std::path::PathBuf;

use match_tracker::{Filters, TrackerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_SETTINGS_PATH: &str = "data/settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode settings: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(
        "no Steam API key configured; set \"apikey\" in data/settings.json \
         or the STEAM_API_KEY environment variable"
    )]
    MissingApiKey,
}

fn default_api_interval() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub apikey: String,
    /// Baseline seconds between listing polls.
    #[serde(default = "default_api_interval")]
    pub api_interval: u64,
    /// Only announce matches from `notable_leagues`.
    #[serde(default = "default_true")]
    pub filter_matches: bool,
    #[serde(default)]
    pub notable_leagues: Vec<u64>,
    /// Skip listing entries where neither team has a name.
    #[serde(default = "default_true")]
    pub filter_generic: bool,
    /// Track re-issued ids for an already announced game quietly.
    #[serde(default = "default_true")]
    pub no_repeat_matches: bool,
    /// Keep raw listing bodies on disk for later inspection.
    #[serde(default)]
    pub save_match_data: bool,
    #[serde(default = "default_true")]
    pub verbose: bool,
    #[serde(skip)]
    path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            apikey: String::new(),
            api_interval: default_api_interval(),
            filter_matches: true,
            notable_leagues: Vec::new(),
            filter_generic: true,
            no_repeat_matches: true,
            save_match_data: false,
            verbose: true,
            path: PathBuf::from(DEFAULT_SETTINGS_PATH),
        }
    }
}

impl Settings {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        Self::load_with_key_override(path, std::env::var("STEAM_API_KEY").ok())
    }

    pub(crate) fn load_with_key_override(
        path: impl Into<PathBuf>,
        key_override: Option<String>,
    ) -> Result<Self, SettingsError> {
        let path = path.into();
        let mut settings = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<Settings>(&raw).map_err(|source| {
                SettingsError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("settings file {} not found, using defaults", path.display());
                Settings::default()
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        settings.path = path;

        if let Some(key) = key_override.filter(|k| !k.is_empty()) {
            settings.apikey = key;
        }
        if settings.apikey.is_empty() {
            return Err(SettingsError::MissingApiKey);
        }
        Ok(settings)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(&self.path, body).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn filters(&self) -> Filters {
        Filters {
            notable_leagues: self.notable_leagues.clone(),
            filter_matches: self.filter_matches,
            filter_generic: self.filter_generic,
            no_repeat_matches: self.no_repeat_matches,
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            api_interval: self.api_interval,
            verbose: self.verbose,
            ..TrackerConfig::default()
        }
    }
}

// ====================================================================
