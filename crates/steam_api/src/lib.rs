//! Steam Web API client for Dota 2 match data
//!
//! Two endpoints drive the whole tracker:
//! - `GetLiveLeagueGames` — every currently broadcast league game
//! - `GetMatchDetails`    — post-game data for one match id
//!
//! Both want the Steam API key as a `key` query parameter. The response
//! schema is loose (team blocks and post-game fields come and go), so all
//! of that looseness is absorbed here by optional/defaulted decode structs
//! instead of leaking `serde_json::Value` probing into the tracker.

use async_trait::async_trait;
use event_log::SnapshotWriter;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const LIVE_LEAGUE_GAMES_URL: &str =
    "https://api.steampowered.com/IDOTA2Match_570/GetLiveLeagueGames/v0001/";
const MATCH_DETAILS_URL: &str =
    "https://api.steampowered.com/IDOTA2Match_570/GetMatchDetails/V001/";

const REQUEST_TIMEOUT_SECS: u64 = 10;

// ====================================================================
// Errors
// ====================================================================

/// Anything that can go wrong talking to the upstream API. Always
/// recoverable from the poll loop's point of view: the caller logs it and
/// retries on a later cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            FetchError::Decode(_) => None,
        }
    }

    /// A 403 means the API key itself was rejected. It will recur every
    /// cycle until the key is fixed, so callers surface it louder than a
    /// transient failure.
    pub fn is_key_rejected(&self) -> bool {
        self.status() == Some(403)
    }
}

// ====================================================================
// Live listing decode
// ====================================================================

#[derive(Debug, Default, Deserialize)]
struct LiveGamesResponse {
    #[serde(default)]
    result: LiveGamesResult,
}

#[derive(Debug, Default, Deserialize)]
struct LiveGamesResult {
    #[serde(default)]
    games: Vec<RawGame>,
}

/// One entry of the live-games listing. `match_id` stays signed because the
/// upstream occasionally emits a `0` (or junk) placeholder record that the
/// reconciler must be able to recognize and skip.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGame {
    #[serde(default)]
    pub match_id: i64,
    #[serde(default)]
    pub league_id: u64,
    #[serde(default)]
    pub series_type: u32,
    #[serde(default)]
    pub radiant_series_wins: u32,
    #[serde(default)]
    pub dire_series_wins: u32,
    pub radiant_team: Option<TeamRef>,
    pub dire_team: Option<TeamRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRef {
    #[serde(default)]
    pub team_name: String,
}

impl RawGame {
    /// At least one side is a named team (scrims and anonymous lobbies have
    /// neither block).
    pub fn has_named_team(&self) -> bool {
        self.radiant_team.is_some() || self.dire_team.is_some()
    }

    pub fn radiant_name(&self) -> &str {
        self.radiant_team
            .as_ref()
            .map(|t| t.team_name.as_str())
            .unwrap_or("Radiant")
    }

    pub fn dire_name(&self) -> &str {
        self.dire_team
            .as_ref()
            .map(|t| t.team_name.as_str())
            .unwrap_or("Dire")
    }
}

// ====================================================================
// Match details decode
// ====================================================================

#[derive(Debug, Default, Deserialize)]
struct MatchDetailsResponse {
    #[serde(default)]
    result: MatchDetails,
}

/// Post-game data for one match. `radiant_win` and `duration` are optional
/// on purpose: a match that dropped out of the listing but has not actually
/// ended yet comes back without either field, which is the tracker's signal
/// to keep waiting. Team names here can differ from the listing's naming,
/// so result messages derive from these, not from the cached entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchDetails {
    #[serde(default)]
    pub match_id: u64,
    pub radiant_win: Option<bool>,
    pub duration: Option<u64>,
    #[serde(default)]
    pub radiant_score: u32,
    #[serde(default)]
    pub dire_score: u32,
    pub radiant_name: Option<String>,
    pub dire_name: Option<String>,
}

impl MatchDetails {
    pub fn radiant_display_name(&self) -> &str {
        self.radiant_name.as_deref().unwrap_or("Radiant")
    }

    pub fn dire_display_name(&self) -> &str {
        self.dire_name.as_deref().unwrap_or("Dire")
    }
}

// ====================================================================
// Parsing (pure, so it is testable without HTTP)
// ====================================================================

pub fn parse_live_games(raw: &str) -> Result<Vec<RawGame>, FetchError> {
    let resp: LiveGamesResponse = serde_json::from_str(raw)?;
    Ok(resp.result.games)
}

pub fn parse_match_details(raw: &str) -> Result<MatchDetails, FetchError> {
    let resp: MatchDetailsResponse = serde_json::from_str(raw)?;
    Ok(resp.result)
}

fn body_snippet(body: &str) -> String {
    body.chars().take(160).collect()
}

// ====================================================================
// Client
// ====================================================================

/// What the tracker needs from upstream. `SteamClient` is the real thing;
/// tests drive the tracker with a scripted implementation instead.
#[async_trait]
pub trait MatchDataSource: Send + Sync {
    async fn live_games(&self) -> Result<Vec<RawGame>, FetchError>;
    async fn match_details(&self, match_id: u64) -> Result<MatchDetails, FetchError>;
}

pub struct SteamClient {
    client: reqwest::Client,
    api_key: String,
    snapshots: Option<SnapshotWriter>,
}

impl SteamClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .user_agent("dota-herald/0.1")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: api_key.into(),
            snapshots: None,
        }
    }

    /// Persist every raw listing body for offline debugging. A failed write
    /// is logged and the cycle carries on.
    pub fn with_snapshots(mut self, writer: SnapshotWriter) -> Self {
        self.snapshots = Some(writer);
        self
    }

    async fn get_body(&self, url: &str, match_id: Option<u64>) -> Result<String, FetchError> {
        let mut req = self.client.get(url).query(&[("key", self.api_key.as_str())]);
        if let Some(id) = match_id {
            req = req.query(&[("match_id", id.to_string().as_str())]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body_snippet(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl MatchDataSource for SteamClient {
    async fn live_games(&self) -> Result<Vec<RawGame>, FetchError> {
        let body = self.get_body(LIVE_LEAGUE_GAMES_URL, None).await?;

        if let Some(writer) = &self.snapshots {
            if let Err(e) = writer.save(&body) {
                warn!("listing snapshot write failed: {e:#}");
            }
        }

        parse_live_games(&body)
    }

    async fn match_details(&self, match_id: u64) -> Result<MatchDetails, FetchError> {
        let body = self.get_body(MATCH_DETAILS_URL, Some(match_id)).await?;
        parse_match_details(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_with_named_and_anonymous_games() {
        let raw = r#"{
            "result": {
                "games": [
                    {
                        "match_id": 7400000001,
                        "league_id": 5401,
                        "series_type": 1,
                        "radiant_series_wins": 1,
                        "dire_series_wins": 0,
                        "radiant_team": {"team_name": "Radiant Rats"},
                        "dire_team": {"team_name": "Dire Wolves"}
                    },
                    {
                        "match_id": 7400000002,
                        "league_id": 0,
                        "series_type": 0,
                        "radiant_series_wins": 0,
                        "dire_series_wins": 0
                    }
                ]
            }
        }"#;

        let games = parse_live_games(raw).unwrap();
        assert_eq!(games.len(), 2);

        assert_eq!(games[0].match_id, 7400000001);
        assert!(games[0].has_named_team());
        assert_eq!(games[0].radiant_name(), "Radiant Rats");
        assert_eq!(games[0].dire_name(), "Dire Wolves");

        // Anonymous lobby: no team blocks, names fall back
        assert!(!games[1].has_named_team());
        assert_eq!(games[1].radiant_name(), "Radiant");
        assert_eq!(games[1].dire_name(), "Dire");
    }

    #[test]
    fn test_parse_listing_without_games_key_is_empty() {
        assert!(parse_live_games(r#"{"result": {}}"#).unwrap().is_empty());
        assert!(parse_live_games(r#"{}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_listing_garbage_is_a_decode_error() {
        let err = parse_live_games("<html>not json</html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_parse_details_complete_match() {
        let raw = r#"{
            "result": {
                "match_id": 7400000001,
                "radiant_win": true,
                "duration": 1800,
                "radiant_score": 30,
                "dire_score": 10,
                "radiant_name": "Radiant Rats",
                "dire_name": "Dire Wolves"
            }
        }"#;

        let details = parse_match_details(raw).unwrap();
        assert_eq!(details.match_id, 7400000001);
        assert_eq!(details.radiant_win, Some(true));
        assert_eq!(details.duration, Some(1800));
        assert_eq!(details.radiant_display_name(), "Radiant Rats");
    }

    #[test]
    fn test_parse_details_still_running_lacks_terminal_fields() {
        // The listing sometimes drops a match that has not actually ended;
        // its details then come back without radiant_win/duration.
        let raw = r#"{
            "result": {
                "match_id": 7400000001,
                "radiant_score": 12,
                "dire_score": 9
            }
        }"#;

        let details = parse_match_details(raw).unwrap();
        assert_eq!(details.radiant_win, None);
        assert_eq!(details.duration, None);
        assert_eq!(details.radiant_display_name(), "Radiant");
    }

    #[test]
    fn test_parse_details_error_payload_decodes_as_unfinished() {
        let details = parse_match_details(r#"{"result": {"error": "Match ID not found"}}"#).unwrap();
        assert_eq!(details.radiant_win, None);
        assert_eq!(details.duration, None);
    }

    #[test]
    fn test_key_rejection_is_distinguishable() {
        let err = FetchError::Status {
            status: 403,
            body: "Forbidden".into(),
        };
        assert!(err.is_key_rejected());
        assert_eq!(err.status(), Some(403));

        let err = FetchError::Status {
            status: 503,
            body: "".into(),
        };
        assert!(!err.is_key_rejected());
    }
}
