//! Shared runtime state
//!
//! One handle over everything a front end (chat commands, an admin HTTP
//! endpoint, whatever gets bolted on) needs to inspect or change while the
//! poll loop runs: the tracked matches, the league allow-list, and the
//! destination book. League edits land in the settings file and in the
//! live filters in the same call, so they stick and take effect on the
//! next cycle without a restart.

use std::sync::Arc;

use match_tracker::{MatchRegistry, SharedFilters, SharedRegistry, TrackedMatch};
use tokio::sync::{Mutex, RwLock};

use crate::destinations::DestinationBook;
use crate::settings::{Settings, SettingsError};

pub struct HeraldContext {
    settings:     Arc<RwLock<Settings>>,
    destinations: Arc<RwLock<DestinationBook>>,
    filters:      SharedFilters,
    registry:     SharedRegistry,
}

impl HeraldContext {
    pub fn new(settings: Settings, destinations: DestinationBook) -> Self {
        let filters = Arc::new(RwLock::new(settings.filters()));
        Self {
            settings: Arc::new(RwLock::new(settings)),
            destinations: Arc::new(RwLock::new(destinations)),
            filters,
            registry: Arc::new(Mutex::new(MatchRegistry::new())),
        }
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn filters(&self) -> SharedFilters {
        self.filters.clone()
    }

    pub fn destinations(&self) -> Arc<RwLock<DestinationBook>> {
        self.destinations.clone()
    }

    /// Tracked matches in the order they were first seen.
    pub async fn ongoing(&self) -> Vec<TrackedMatch> {
        self.registry.lock().await.iter().cloned().collect()
    }

    /// Forgets every tracked match without announcing anything. Returns how
    /// many were dropped.
    pub async fn untrack_all(&self) -> usize {
        let mut registry = self.registry.lock().await;
        let dropped = registry.len();
        registry.clear();
        dropped
    }

    pub async fn tracked_leagues(&self) -> Vec<u64> {
        self.settings.read().await.notable_leagues.clone()
    }

    /// `Ok(false)` when the league was already tracked.
    pub async fn add_league(&self, league: u64) -> Result<bool, SettingsError> {
        let mut settings = self.settings.write().await;
        if settings.notable_leagues.contains(&league) {
            return Ok(false);
        }
        settings.notable_leagues.push(league);
        settings.save()?;
        self.filters.write().await.notable_leagues = settings.notable_leagues.clone();
        Ok(true)
    }

    /// `Ok(false)` when the league was not tracked to begin with.
    pub async fn remove_league(&self, league: u64) -> Result<bool, SettingsError> {
        let mut settings = self.settings.write().await;
        let before = settings.notable_leagues.len();
        settings.notable_leagues.retain(|l| *l != league);
        if settings.notable_leagues.len() == before {
            return Ok(false);
        }
        settings.save()?;
        self.filters.write().await.notable_leagues = settings.notable_leagues.clone();
        Ok(true)
    }

    pub async fn register_destination(
        &self,
        id: &str,
        default_channel: &str,
    ) -> anyhow::Result<()> {
        self.destinations.write().await.ensure(id, default_channel)
    }

    pub async fn set_matches_channel(
        &self,
        id: &str,
        channel: Option<String>,
    ) -> anyhow::Result<bool> {
        self.destinations
            .write()
            .await
            .set_matches_channel(id, channel)
    }

    pub async fn set_victory_messages(&self, id: &str, on: bool) -> anyhow::Result<bool> {
        self.destinations
            .write()
            .await
            .set_victory_messages(id, on)
    }

    pub async fn set_show_result(&self, id: &str, on: bool) -> anyhow::Result<bool> {
        self.destinations.write().await.set_show_result(id, on)
    }
}

// ====================================================================
