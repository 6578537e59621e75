//! Finished-match evaluation
//!
//! Decides whether a detail payload proves a match is actually over.
//! Disappearing from the live listing is only a hint; the detail endpoint
//! keeps answering with a partial record while the game is in progress,
//! and sometimes briefly after it ends.

use steam_api::MatchDetails;

/// Everything the result announcement needs, lifted from the detail
/// payload. Team names come from the payload too, not from the registry
/// entry, since the detail record is the authoritative one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub match_id:      u64,
    pub radiant:       String,
    pub dire:          String,
    pub winner:        String,
    pub radiant_score: u32,
    pub dire_score:    u32,
    pub duration_secs: u64,
}

/// `None` until the payload carries both a winner and a duration. A record
/// with only one of the two is still in flight and must not be treated as
/// final.
pub fn evaluate(details: &MatchDetails) -> Option<MatchOutcome> {
    let (radiant_win, duration_secs) = match (details.radiant_win, details.duration) {
        (Some(win), Some(duration)) => (win, duration),
        _ => return None,
    };

    let radiant = details.radiant_display_name().to_string();
    let dire = details.dire_display_name().to_string();
    let winner = if radiant_win {
        radiant.clone()
    } else {
        dire.clone()
    };

    Some(MatchOutcome {
        match_id: details.match_id,
        radiant,
        dire,
        winner,
        radiant_score: details.radiant_score,
        dire_score: details.dire_score,
        duration_secs,
    })
}

// ====================================================================
