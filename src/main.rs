//! Herald — Dota 2 league match announcer
//!
//! What it does:
//!   1. Polls the Steam live league listing on a fixed cadence
//!   2. Announces new matches that pass the league/team filters
//!   3. Detects matches dropping out of the listing and resolves them via
//!      the match details endpoint
//!   4. Fans the announcements out to every configured destination
//!
//! Run:
//!   cargo run --bin herald

use std::env;
use std::fs::File;
use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use event_log::{EventLogger, SnapshotWriter};
use match_tracker::MatchTracker;
use steam_api::SteamClient;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod broadcast;
mod context;
mod destinations;
mod settings;

use broadcast::{Broadcaster, LogCourier};
use context::HeraldContext;
use destinations::DestinationBook;
use settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== Herald — live league match announcer ===");
    info!("Logs: ./logs/");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("dota_herald.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another herald instance is already running! Exiting.");
            return Ok(());
        }
    };

    let settings = Settings::load(settings::DEFAULT_SETTINGS_PATH)?;
    let destinations = DestinationBook::load(destinations::DEFAULT_DESTINATIONS_PATH)?;
    info!(
        interval = settings.api_interval,
        leagues = settings.notable_leagues.len(),
        destinations = destinations.len(),
        "configuration loaded"
    );
    if destinations.is_empty() {
        warn!("no destinations configured yet, announcements go to the log only");
    }

    let mut client = SteamClient::new(settings.apikey.clone());
    if settings.save_match_data {
        client = client.with_snapshots(SnapshotWriter::new("logs/snapshots"));
        info!("raw listing snapshots: ./logs/snapshots/");
    }

    let tracker_config = settings.tracker_config();
    let ctx = HeraldContext::new(settings, destinations);

    let broadcaster = Broadcaster::new(Arc::new(LogCourier), ctx.destinations());
    let tracker = MatchTracker::new(
        Arc::new(client),
        Arc::new(broadcaster),
        ctx.registry(),
        ctx.filters(),
        EventLogger::new("logs"),
        tracker_config,
    );

    tokio::select! {
        _ = tracker.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, goodbye");
        }
    }

    Ok(())
}
