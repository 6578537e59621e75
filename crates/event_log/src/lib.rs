//! dota-herald — event log
//! JSONL event stream plus raw API snapshot dumps

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Append-only JSONL log, one file per UTC day.
pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct MatchStartedEvent {
    pub ts:          String,
    pub event:       &'static str,   // "MATCH_STARTED"
    pub match_id:    u64,
    pub radiant:     String,
    pub dire:        String,
    pub game_number: u32,
    pub series:      String,
    pub announced:   bool,           // false when suppressed as a repeat
}

#[derive(Serialize, Debug)]
pub struct MatchResolvedEvent {
    pub ts:            String,
    pub event:         &'static str,   // "MATCH_RESOLVED"
    pub match_id:      u64,
    pub winner:        String,
    pub radiant_score: u32,
    pub dire_score:    u32,
    pub duration_secs: u64,
}

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:          String,
    pub event:       &'static str,   // "API_STATUS"
    pub endpoint:    String,         // "live_games" | "match_details"
    pub ok:          bool,
    pub status_code: Option<u16>,
    pub message:     String,
}

#[derive(Serialize, Debug)]
pub struct PollCycleEvent {
    pub ts:            String,
    pub event:         &'static str,   // "POLL_CYCLE"
    pub live_games:    usize,          // qualifying entries in the listing
    pub tracked:       usize,          // registry size after the cycle
    pub started:       usize,
    pub finished:      usize,
    pub next_interval: u64,
}

// ── Raw snapshot dumps ────────────────────────────────────────────────────────

/// Writes raw live-games listing bodies to timestamped files for offline
/// debugging. Gated by the `save_match_data` setting at the call site.
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn save(&self, body: &str) -> Result<PathBuf> {
        let path = self
            .dir
            .join(format!("live-games-{}.json", Utc::now().timestamp_millis()));
        fs::write(&path, body).with_context(|| format!("writing snapshot {path:?}"))?;
        Ok(path)
    }
}
