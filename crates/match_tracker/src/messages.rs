//! Announcement wording
//!
//! Every user-visible string the bot sends is built here, so the exact
//! phrasing has one home and the tests below pin it.

use crate::registry::TrackedMatch;
use crate::resolve::MatchOutcome;

/// "Alpha vs. Beta is now underway (Game 2 of 3)."
pub fn match_start_message(m: &TrackedMatch) -> String {
    format!(
        "{} vs. {} is now underway ({}).",
        m.radiant,
        m.dire,
        m.series_description()
    )
}

/// Spells a duration out in minutes and seconds: "1 minute",
/// "2 minutes and 5 seconds", "0 minutes". Minutes are always present,
/// seconds only when nonzero.
pub fn format_duration(total_secs: u64) -> String {
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    let spelled_minutes = if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    };
    match seconds {
        0 => spelled_minutes,
        1 => format!("{spelled_minutes} and 1 second"),
        n => format!("{spelled_minutes} and {n} seconds"),
    }
}

/// Builds both variants of the result announcement. Destinations configured
/// to hide results get the reduced one, which names neither winner nor
/// score; both carry the Dotabuff link wrapped in angle brackets to keep
/// chat clients from unfurling a preview.
pub fn match_result_messages(outcome: &MatchOutcome) -> (String, String) {
    let link = format!("https://www.dotabuff.com/matches/{}", outcome.match_id);
    let full = format!(
        "{} vs. {} has ended in {} victory, {} in. The final score was {}-{}. Dotabuff: <{}>",
        outcome.radiant,
        outcome.dire,
        outcome.winner,
        format_duration(outcome.duration_secs),
        outcome.radiant_score,
        outcome.dire_score,
        link
    );
    let reduced = format!(
        "{} vs. {} has ended. Dotabuff: <{}>",
        outcome.radiant, outcome.dire, link
    );
    (full, reduced)
}

// ====================================================================
