//! Notification destinations
//!
//! A destination is any named place announcements get delivered to, each
//! with its own channel override and per-destination switches. The book is
//! persisted to `data/destinations.json` on every mutation, so runtime
//! edits survive a restart.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_DESTINATIONS_PATH: &str = "data/destinations.json";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    /// Where announcements land when no dedicated channel is set.
    pub default_channel: String,
    #[serde(default)]
    pub matches_channel: Option<String>,
    /// Announce results at all for this destination.
    #[serde(default = "default_true")]
    pub victory_messages: bool,
    /// Full result with winner and score, or just "has ended".
    #[serde(default = "default_true")]
    pub show_result: bool,
}

impl Destination {
    pub fn new(id: impl Into<String>, default_channel: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default_channel: default_channel.into(),
            matches_channel: None,
            victory_messages: true,
            show_result: true,
        }
    }

    pub fn target_channel(&self) -> &str {
        self.matches_channel
            .as_deref()
            .unwrap_or(&self.default_channel)
    }
}

/// All configured destinations plus where they persist.
#[derive(Debug)]
pub struct DestinationBook {
    destinations: Vec<Destination>,
    path: PathBuf,
}

impl DestinationBook {
    /// Missing file means no destinations yet, not an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let destinations = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("could not parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("could not read {}", path.display()))
            }
        };
        Ok(Self { destinations, path })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(&self.destinations)?;
        fs::write(&self.path, body)
            .with_context(|| format!("could not write {}", self.path.display()))
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Destination> {
        self.destinations.iter_mut().find(|d| d.id == id)
    }

    /// Registers a destination with stock switches on first sight. Already
    /// known ids keep their stored configuration untouched.
    pub fn ensure(&mut self, id: &str, default_channel: &str) -> Result<()> {
        if self.get(id).is_some() {
            return Ok(());
        }
        info!(destination = id, "registering new destination");
        self.destinations
            .push(Destination::new(id, default_channel));
        self.save()
    }

    /// `Ok(false)` when the id is unknown; same for the other setters.
    pub fn set_matches_channel(&mut self, id: &str, channel: Option<String>) -> Result<bool> {
        match self.get_mut(id) {
            Some(dest) => {
                dest.matches_channel = channel;
                self.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_victory_messages(&mut self, id: &str, on: bool) -> Result<bool> {
        match self.get_mut(id) {
            Some(dest) => {
                dest.victory_messages = on;
                self.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_show_result(&mut self, id: &str, on: bool) -> Result<bool> {
        match self.get_mut(id) {
            Some(dest) => {
                dest.show_result = on;
                self.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ====================================================================
