//! One-shot probe for the live league listing
//! Run: STEAM_API_KEY=... cargo run --bin live-probe

use anyhow::{bail, Result};
use dotenv::dotenv;
use match_tracker::SeriesType;
use steam_api::{MatchDataSource, SteamClient};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let Ok(api_key) = std::env::var("STEAM_API_KEY") else {
        bail!("STEAM_API_KEY is not set");
    };

    info!("Fetching live league games...");
    let client = SteamClient::new(api_key);
    let games = client.live_games().await?;
    info!("Listing returned {} entries", games.len());

    let mut real = 0usize;
    for game in &games {
        if game.match_id <= 0 {
            warn!(
                "placeholder entry (match_id {}, league {})",
                game.match_id, game.league_id
            );
            continue;
        }
        real += 1;
        let gameno = game.radiant_series_wins + game.dire_series_wins + 1;
        info!(
            "match {}: {} vs. {} | league {} | {}",
            game.match_id,
            game.radiant_name(),
            game.dire_name(),
            game.league_id,
            SeriesType::from_code(game.series_type).describe(gameno),
        );
        if !game.has_named_team() {
            info!("  (no named teams; the generic filter would skip this one)");
        }
    }
    if real == 0 {
        info!("No live league matches right now.");
        return Ok(());
    }

    // Detail check against the first real entry
    if let Some(game) = games.iter().find(|g| g.match_id > 0) {
        let match_id = game.match_id as u64;
        info!("Fetching details for match {}...", match_id);
        match client.match_details(match_id).await {
            Ok(details) => {
                info!(
                    "  Teams: {} vs {}",
                    details.radiant_display_name(),
                    details.dire_display_name()
                );
                info!("  Score: {}-{}", details.radiant_score, details.dire_score);
                match (details.radiant_win, details.duration) {
                    (Some(radiant_win), Some(duration)) => {
                        info!(
                            "  Finished: {} win after {}s",
                            if radiant_win { "radiant" } else { "dire" },
                            duration
                        );
                    }
                    _ => info!("  Still in progress"),
                }
            }
            Err(e) => warn!("Details fetch failed: {}", e),
        }
    }

    Ok(())
}
