//! Listing reconciliation
//!
//! One pass over a fresh live-games listing against the registry: work out
//! which matches are new, which are repeats of an already tracked pairing,
//! and which tracked matches have dropped out of the listing and are
//! presumed finished. Pure bookkeeping, no I/O.

use steam_api::RawGame;
use tracing::debug;

use crate::registry::{MatchRegistry, SeriesType, TrackedMatch};

/// Runtime-tunable selection of which listing entries count. Lives behind a
/// lock at runtime so league edits apply on the next cycle without a
/// restart.
#[derive(Debug, Clone)]
pub struct Filters {
    /// League allow-list, consulted only while `filter_matches` is on.
    pub notable_leagues:   Vec<u64>,
    pub filter_matches:    bool,
    pub filter_generic:    bool,
    pub no_repeat_matches: bool,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            notable_leagues: Vec::new(),
            filter_matches: true,
            filter_generic: true,
            no_repeat_matches: true,
        }
    }
}

/// What one reconciliation pass decided.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// Newly tracked matches that should be announced, in listing order.
    pub started: Vec<TrackedMatch>,
    /// Newly tracked matches registered quietly because the same pairing is
    /// already being followed under another id.
    pub suppressed: Vec<TrackedMatch>,
    /// Matches tracked before this pass and absent from the listing, in
    /// registry order. Candidates for detail resolution, not yet removed.
    pub finished: Vec<TrackedMatch>,
    /// Listing entries that passed the filters, for cycle stats.
    pub qualifying: usize,
}

pub fn reconcile(registry: &mut MatchRegistry, games: &[RawGame], filters: &Filters) -> CycleOutcome {
    let mut outcome = CycleOutcome::default();
    // Whatever survives this pass untouched was not seen live this cycle.
    let mut presumed_finished = registry.snapshot_ids();

    for game in games {
        let league_ok = !filters.filter_matches || filters.notable_leagues.contains(&game.league_id);
        let generic_ok = !filters.filter_generic || game.has_named_team();
        // id 0 (or negative) is the listing's placeholder for a lobby that
        // has no real match yet
        if game.match_id <= 0 || !league_ok || !generic_ok {
            continue;
        }
        outcome.qualifying += 1;
        let match_id = game.match_id as u64;

        if registry.contains(match_id) {
            presumed_finished.retain(|id| *id != match_id);
            continue;
        }

        let entry = TrackedMatch {
            match_id,
            radiant: game.radiant_name().to_string(),
            dire: game.dire_name().to_string(),
            game_number: game.radiant_series_wins + game.dire_series_wins + 1,
            series: SeriesType::from_code(game.series_type),
        };

        let repeat = filters.no_repeat_matches
            && registry.contains_details(&entry.radiant, &entry.dire, entry.game_number);
        if repeat {
            debug!(
                match_id,
                "listing re-issued {} vs. {} game {}, tracking quietly",
                entry.radiant,
                entry.dire,
                entry.game_number
            );
            outcome.suppressed.push(entry.clone());
        } else {
            outcome.started.push(entry.clone());
        }
        registry.insert(entry);
    }

    outcome.finished = presumed_finished
        .into_iter()
        .filter_map(|id| registry.get(id).cloned())
        .collect();
    outcome
}

// ====================================================================
