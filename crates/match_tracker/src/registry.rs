//! In-flight match registry
//!
//! One entry per live league match, keyed by match id, with an insertion-
//! ordered view on top so downstream passes (finished classification,
//! "what is ongoing" queries) see matches in the order they appeared.
//! The poll loop is the only writer; the chat layer only reads.

use std::collections::HashMap;

use thiserror::Error;

/// Best-of-N format of a series, decoded from the listing's numeric code.
/// Codes outside the documented range are preserved rather than rejected,
/// the upstream has grown new ones before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesType {
    BestOf1,
    BestOf3,
    BestOf5,
    Unknown(u32),
}

impl SeriesType {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => SeriesType::BestOf1,
            1 => SeriesType::BestOf3,
            2 => SeriesType::BestOf5,
            other => SeriesType::Unknown(other),
        }
    }

    /// Human wording for announcements: "Best of 1", "Game 2 of 3",
    /// "unknown series type 9".
    pub fn describe(&self, game_number: u32) -> String {
        match self {
            SeriesType::BestOf1 => "Best of 1".to_string(),
            SeriesType::BestOf3 => format!("Game {game_number} of 3"),
            SeriesType::BestOf5 => format!("Game {game_number} of 5"),
            SeriesType::Unknown(code) => format!("unknown series type {code}"),
        }
    }
}

/// One tracked, in-progress match. Entries are immutable once created;
/// later listing snapshots never edit them, only remove them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedMatch {
    pub match_id:    u64,
    pub radiant:     String,
    pub dire:        String,
    pub game_number: u32,
    pub series:      SeriesType,
}

impl TrackedMatch {
    pub fn series_description(&self) -> String {
        self.series.describe(self.game_number)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("match {0} is not in the registry")]
pub struct NotFoundError(pub u64);

/// Registry of matches currently believed to be live. Lookups go through
/// the map; iteration goes through the order vector. Membership in both is
/// kept in lockstep by the mutators below.
#[derive(Debug, Default)]
pub struct MatchRegistry {
    by_id: HashMap<u64, TrackedMatch>,
    order: Vec<u64>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, match_id: u64) -> bool {
        self.by_id.contains_key(&match_id)
    }

    pub fn get(&self, match_id: u64) -> Option<&TrackedMatch> {
        self.by_id.get(&match_id)
    }

    /// Inserting an id that is already present keeps the original entry and
    /// its position; the registry never holds two entries for one id.
    pub fn insert(&mut self, m: TrackedMatch) {
        let id = m.match_id;
        if self.by_id.contains_key(&id) {
            return;
        }
        self.by_id.insert(id, m);
        self.order.push(id);
    }

    pub fn remove(&mut self, match_id: u64) -> Result<TrackedMatch, NotFoundError> {
        let m = self.by_id.remove(&match_id).ok_or(NotFoundError(match_id))?;
        self.order.retain(|id| *id != match_id);
        Ok(m)
    }

    /// Removes every *other* entry that shares radiant, dire and game number
    /// with the given match. The listing occasionally re-issues a fresh id
    /// for what is semantically the same game; once one id resolves, the
    /// stale twins would otherwise linger until their own resolution fails.
    pub fn purge_duplicates_of(&mut self, match_id: u64) -> Vec<TrackedMatch> {
        let Some(canonical) = self.by_id.get(&match_id).cloned() else {
            return Vec::new();
        };
        let duplicate_ids: Vec<u64> = self
            .iter()
            .filter(|m| {
                m.match_id != canonical.match_id
                    && m.radiant == canonical.radiant
                    && m.dire == canonical.dire
                    && m.game_number == canonical.game_number
            })
            .map(|m| m.match_id)
            .collect();
        duplicate_ids
            .into_iter()
            .filter_map(|id| self.remove(id).ok())
            .collect()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.order.clear();
    }

    /// Whether any entry matches the pairing regardless of its id. Linear
    /// scan; the registry holds live league matches, a handful at most.
    pub fn contains_details(&self, radiant: &str, dire: &str, game_number: u32) -> bool {
        self.iter()
            .any(|m| m.radiant == radiant && m.dire == dire && m.game_number == game_number)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedMatch> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Ordered copy of the current ids. The reconcile pass starts from this
    /// and whittles it down to the matches no longer listed.
    pub fn snapshot_ids(&self) -> Vec<u64> {
        self.order.clone()
    }
}

// ====================================================================
