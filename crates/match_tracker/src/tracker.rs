//! Poll loop
//!
//! Drives the whole pipeline: sleep, fetch the live listing, reconcile it
//! against the registry, announce new matches, and chase the detail
//! endpoint for matches that dropped out of the listing. One cycle runs to
//! completion (including every detail fetch) before the next sleep starts;
//! this task is the only writer of the registry and of the poll interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use event_log::{
    now_iso, ApiStatusEvent, EventLogger, MatchResolvedEvent, MatchStartedEvent, PollCycleEvent,
};
use steam_api::MatchDataSource;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::reconcile::{reconcile, Filters};
use crate::registry::{MatchRegistry, TrackedMatch};
use crate::{messages, resolve};

/// Registry handle shared with the chat layer, which reads it to answer
/// "what is ongoing" queries while the poll loop writes it.
pub type SharedRegistry = Arc<Mutex<MatchRegistry>>;

/// Filter handle shared the same way; league edits land here and take
/// effect on the next cycle.
pub type SharedFilters = Arc<RwLock<Filters>>;

/// Outbound seam. Implementations fan each message out to every configured
/// destination and keep individual delivery failures to themselves, so the
/// poll loop never stalls on a broken destination.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn match_started(&self, message: &str);
    async fn match_finished(&self, full_message: &str, reduced_message: &str);
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Baseline seconds between listing polls.
    pub api_interval: u64,
    /// Pause before each detail fetch. Deducted from the next listing
    /// sleep so resolution work does not stretch the poll rhythm.
    pub resolve_delay: u64,
    /// The deduction stops once the next sleep has shrunk to this.
    pub interval_floor: u64,
    /// Failed resolutions per match before it is dropped unannounced.
    pub max_resolve_attempts: u32,
    /// Chatty per-match log lines on top of the event log.
    pub verbose: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_interval: 20,
            resolve_delay: 2,
            interval_floor: 4,
            max_resolve_attempts: 30,
            verbose: true,
        }
    }
}

pub struct MatchTracker {
    source:           Arc<dyn MatchDataSource>,
    announcer:        Arc<dyn Announcer>,
    registry:         SharedRegistry,
    filters:          SharedFilters,
    events:           EventLogger,
    config:           TrackerConfig,
    next_interval:    u64,
    resolve_attempts: HashMap<u64, u32>,
}

impl MatchTracker {
    pub fn new(
        source: Arc<dyn MatchDataSource>,
        announcer: Arc<dyn Announcer>,
        registry: SharedRegistry,
        filters: SharedFilters,
        events: EventLogger,
        config: TrackerConfig,
    ) -> Self {
        let next_interval = config.api_interval;
        Self {
            source,
            announcer,
            registry,
            filters,
            events,
            config,
            next_interval,
            resolve_attempts: HashMap::new(),
        }
    }

    pub async fn run(mut self) {
        info!(
            interval = self.config.api_interval,
            "match tracker started"
        );
        loop {
            sleep(Duration::from_secs(self.next_interval)).await;
            self.next_interval = self.config.api_interval;
            self.cycle().await;
        }
    }

    // ====================================================================

    async fn cycle(&mut self) {
        let games = match self.source.live_games().await {
            Ok(games) => {
                self.log_api_status("live_games", true, Some(200), "ok");
                games
            }
            Err(e) => {
                if e.is_key_rejected() {
                    warn!("Steam API key rejected (HTTP 403); check the configured key");
                } else {
                    warn!("live games fetch failed: {e}");
                }
                self.log_api_status("live_games", false, e.status(), &e.to_string());
                return; // keep the registry as is, try again next cycle
            }
        };

        let filters = self.filters.read().await.clone();
        let outcome = {
            let mut registry = self.registry.lock().await;
            reconcile(&mut registry, &games, &filters)
        };

        for m in &outcome.started {
            if self.config.verbose {
                info!(
                    match_id = m.match_id,
                    "now tracking {} vs. {} ({})",
                    m.radiant,
                    m.dire,
                    m.series_description()
                );
            }
            self.announcer
                .match_started(&messages::match_start_message(m))
                .await;
            self.log_match_started(m, true);
        }
        for m in &outcome.suppressed {
            if self.config.verbose {
                info!(
                    match_id = m.match_id,
                    "tracking repeat of {} vs. {} without announcing", m.radiant, m.dire
                );
            }
            self.log_match_started(m, false);
        }

        let finished = outcome.finished.len();
        for m in &outcome.finished {
            self.resolve_finished(m).await;
        }

        let tracked = self.registry.lock().await.len();
        let _ = self.events.log(&PollCycleEvent {
            ts: now_iso(),
            event: "POLL_CYCLE",
            live_games: outcome.qualifying,
            tracked,
            started: outcome.started.len(),
            finished,
            next_interval: self.next_interval,
        });
    }

    /// Chases the detail endpoint for one match that left the listing. The
    /// match stays registered until a payload carries both winner and
    /// duration, or until the attempt cap is reached.
    async fn resolve_finished(&mut self, m: &TrackedMatch) {
        if !self.registry.lock().await.contains(m.match_id) {
            return; // purged as a duplicate earlier in this cycle
        }

        // Breathe between detail calls, and give the time back by
        // shortening the upcoming listing sleep down to the floor.
        sleep(Duration::from_secs(self.config.resolve_delay)).await;
        if self.next_interval > self.config.interval_floor {
            self.next_interval = self.next_interval.saturating_sub(self.config.resolve_delay);
        }

        let details = match self.source.match_details(m.match_id).await {
            Ok(details) => details,
            Err(e) => {
                warn!(match_id = m.match_id, "match details fetch failed: {e}");
                self.log_api_status("match_details", false, e.status(), &e.to_string());
                self.note_failed_resolution(m).await;
                return;
            }
        };
        self.log_api_status("match_details", true, Some(200), "ok");

        let Some(outcome) = resolve::evaluate(&details) else {
            // Left the listing but the record is not final yet; it will be
            // back in the finished set next cycle.
            if self.config.verbose {
                info!(
                    match_id = m.match_id,
                    "{} vs. {} has no final result yet, keeping it", m.radiant, m.dire
                );
            }
            self.note_failed_resolution(m).await;
            return;
        };

        if self.config.verbose {
            info!(
                match_id = m.match_id,
                winner = %outcome.winner,
                "{} vs. {} finished {}-{}",
                outcome.radiant,
                outcome.dire,
                outcome.radiant_score,
                outcome.dire_score
            );
        }

        let (full, reduced) = messages::match_result_messages(&outcome);
        self.announcer.match_finished(&full, &reduced).await;

        {
            let mut registry = self.registry.lock().await;
            for dup in registry.purge_duplicates_of(m.match_id) {
                self.resolve_attempts.remove(&dup.match_id);
                if self.config.verbose {
                    info!(
                        match_id = dup.match_id,
                        "dropped duplicate listing entry for {} vs. {}", dup.radiant, dup.dire
                    );
                }
            }
            if let Err(e) = registry.remove(m.match_id) {
                // Unreachable while this task stays the registry's only
                // writer; worth a loud log if that ever changes.
                error!("finished match cleanup failed: {e}");
            }
        }
        self.resolve_attempts.remove(&m.match_id);

        let _ = self.events.log(&MatchResolvedEvent {
            ts: now_iso(),
            event: "MATCH_RESOLVED",
            match_id: outcome.match_id,
            winner: outcome.winner.clone(),
            radiant_score: outcome.radiant_score,
            dire_score: outcome.dire_score,
            duration_secs: outcome.duration_secs,
        });
    }

    /// Bounded retry: a match whose record never becomes final (permanent
    /// 404, endlessly partial payload) must not pin the registry forever.
    async fn note_failed_resolution(&mut self, m: &TrackedMatch) {
        let attempts = self.resolve_attempts.entry(m.match_id).or_insert(0);
        *attempts += 1;
        if *attempts < self.config.max_resolve_attempts {
            return;
        }
        warn!(
            match_id = m.match_id,
            attempts = *attempts,
            "giving up on {} vs. {}, dropping it without a result",
            m.radiant,
            m.dire
        );
        self.resolve_attempts.remove(&m.match_id);
        let _ = self.registry.lock().await.remove(m.match_id);
    }

    fn log_api_status(&self, endpoint: &str, ok: bool, status_code: Option<u16>, message: &str) {
        let _ = self.events.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            endpoint: endpoint.to_string(),
            ok,
            status_code,
            message: message.to_string(),
        });
    }

    fn log_match_started(&self, m: &TrackedMatch, announced: bool) {
        let _ = self.events.log(&MatchStartedEvent {
            ts: now_iso(),
            event: "MATCH_STARTED",
            match_id: m.match_id,
            radiant: m.radiant.clone(),
            dire: m.dire.clone(),
            game_number: m.game_number,
            series: m.series_description(),
            announced,
        });
    }
}

// ====================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use steam_api::{FetchError, MatchDetails, RawGame, TeamRef};

    enum ListingStep {
        Games(Vec<RawGame>),
        Fail(u16),
    }

    enum DetailStep {
        Payload(MatchDetails),
        Fail(u16),
    }

    /// Scripted upstream: pops one listing per cycle and serves detail
    /// payloads from per-match queues. An exhausted listing script means an
    /// empty listing; an exhausted detail queue means a 404.
    struct ScriptedSource {
        listings:     StdMutex<VecDeque<ListingStep>>,
        details:      StdMutex<HashMap<u64, VecDeque<DetailStep>>>,
        detail_calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(listings: Vec<ListingStep>) -> Self {
            Self {
                listings: StdMutex::new(listings.into()),
                details: StdMutex::new(HashMap::new()),
                detail_calls: AtomicUsize::new(0),
            }
        }

        fn script_details(&self, match_id: u64, steps: Vec<DetailStep>) {
            self.details.lock().unwrap().insert(match_id, steps.into());
        }

        fn detail_calls(&self) -> usize {
            self.detail_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MatchDataSource for ScriptedSource {
        async fn live_games(&self) -> Result<Vec<RawGame>, FetchError> {
            match self.listings.lock().unwrap().pop_front() {
                Some(ListingStep::Games(games)) => Ok(games),
                Some(ListingStep::Fail(status)) => Err(FetchError::Status {
                    status,
                    body: "scripted failure".to_string(),
                }),
                None => Ok(Vec::new()),
            }
        }

        async fn match_details(&self, match_id: u64) -> Result<MatchDetails, FetchError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .details
                .lock()
                .unwrap()
                .get_mut(&match_id)
                .and_then(|queue| queue.pop_front());
            match step {
                Some(DetailStep::Payload(details)) => Ok(details),
                Some(DetailStep::Fail(status)) => Err(FetchError::Status {
                    status,
                    body: "scripted failure".to_string(),
                }),
                None => Err(FetchError::Status {
                    status: 404,
                    body: "no details scripted".to_string(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingAnnouncer {
        started:  StdMutex<Vec<String>>,
        finished: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Announcer for RecordingAnnouncer {
        async fn match_started(&self, message: &str) {
            self.started.lock().unwrap().push(message.to_string());
        }

        async fn match_finished(&self, full_message: &str, reduced_message: &str) {
            self.finished
                .lock()
                .unwrap()
                .push((full_message.to_string(), reduced_message.to_string()));
        }
    }

    fn game(id: i64, radiant: &str, dire: &str) -> RawGame {
        RawGame {
            match_id: id,
            league_id: 5401,
            series_type: 0,
            radiant_series_wins: 0,
            dire_series_wins: 0,
            radiant_team: Some(TeamRef {
                team_name: radiant.to_string(),
            }),
            dire_team: Some(TeamRef {
                team_name: dire.to_string(),
            }),
        }
    }

    fn running_details(id: u64) -> MatchDetails {
        MatchDetails {
            match_id: id,
            radiant_win: None,
            duration: None,
            radiant_score: 5,
            dire_score: 3,
            radiant_name: Some("Alpha".to_string()),
            dire_name: Some("Beta".to_string()),
        }
    }

    fn final_details(id: u64) -> MatchDetails {
        MatchDetails {
            match_id: id,
            radiant_win: Some(true),
            duration: Some(1800),
            radiant_score: 30,
            dire_score: 10,
            radiant_name: Some("Alpha".to_string()),
            dire_name: Some("Beta".to_string()),
        }
    }

    fn quiet_config() -> TrackerConfig {
        TrackerConfig {
            verbose: false,
            ..TrackerConfig::default()
        }
    }

    fn build_tracker(
        source: Arc<ScriptedSource>,
        config: TrackerConfig,
        events_dir: &std::path::Path,
    ) -> (MatchTracker, Arc<RecordingAnnouncer>, SharedRegistry) {
        let announcer = Arc::new(RecordingAnnouncer::default());
        let registry: SharedRegistry = Arc::new(Mutex::new(MatchRegistry::new()));
        let filters: SharedFilters = Arc::new(RwLock::new(Filters {
            notable_leagues: vec![5401],
            ..Filters::default()
        }));
        let tracker = MatchTracker::new(
            source,
            announcer.clone(),
            registry.clone(),
            filters,
            EventLogger::new(events_dir),
            config,
        );
        (tracker, announcer, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lifecycle_announces_start_and_result() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ListingStep::Games(vec![game(222, "Alpha", "Beta")]),
            ListingStep::Games(vec![]),
        ]));
        source.script_details(222, vec![DetailStep::Payload(final_details(222))]);
        let (mut tracker, announcer, registry) =
            build_tracker(source, quiet_config(), dir.path());

        tracker.cycle().await;
        tracker.cycle().await;

        let started = announcer.started.lock().unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0], "Alpha vs. Beta is now underway (Best of 1).");
        let finished = announcer.finished.lock().unwrap();
        assert_eq!(finished.len(), 1);
        let (full, reduced) = &finished[0];
        assert!(full.contains("30 minutes"));
        assert!(full.contains("30-10"));
        assert!(full.contains("dotabuff.com/matches/222"));
        assert!(reduced.contains("has ended"));
        assert!(registry.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_details_keep_the_match_for_the_next_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ListingStep::Games(vec![game(222, "Alpha", "Beta")]),
            ListingStep::Games(vec![]),
            ListingStep::Games(vec![]),
        ]));
        source.script_details(
            222,
            vec![
                DetailStep::Payload(running_details(222)),
                DetailStep::Payload(final_details(222)),
            ],
        );
        let (mut tracker, announcer, registry) =
            build_tracker(source, quiet_config(), dir.path());

        tracker.cycle().await;
        tracker.cycle().await;
        assert!(announcer.finished.lock().unwrap().is_empty());
        assert!(registry.lock().await.contains(222));

        tracker.cycle().await;
        assert_eq!(announcer.finished.lock().unwrap().len(), 1);
        assert!(registry.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_fetch_failure_keeps_the_match() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ListingStep::Games(vec![game(222, "Alpha", "Beta")]),
            ListingStep::Games(vec![]),
            ListingStep::Games(vec![]),
        ]));
        source.script_details(
            222,
            vec![
                DetailStep::Fail(503),
                DetailStep::Payload(final_details(222)),
            ],
        );
        let (mut tracker, announcer, registry) =
            build_tracker(source, quiet_config(), dir.path());

        tracker.cycle().await;
        tracker.cycle().await;
        assert!(registry.lock().await.contains(222));

        tracker.cycle().await;
        assert_eq!(announcer.finished.lock().unwrap().len(), 1);
        assert!(registry.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_leaves_the_registry_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ListingStep::Games(vec![game(222, "Alpha", "Beta")]),
            ListingStep::Fail(500),
        ]));
        let (mut tracker, announcer, registry) =
            build_tracker(source.clone(), quiet_config(), dir.path());

        tracker.cycle().await;
        tracker.cycle().await;

        // the failed cycle must not classify anything as finished
        assert!(registry.lock().await.contains(222));
        assert_eq!(source.detail_calls(), 0);
        assert_eq!(announcer.started.lock().unwrap().len(), 1);
        assert!(announcer.finished.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_shrinks_per_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ListingStep::Games(vec![game(1, "A", "B"), game(2, "C", "D")]),
            ListingStep::Games(vec![]),
        ]));
        source.script_details(1, vec![DetailStep::Payload(final_details(1))]);
        source.script_details(2, vec![DetailStep::Payload(final_details(2))]);
        let (mut tracker, _announcer, _registry) =
            build_tracker(source, quiet_config(), dir.path());

        tracker.cycle().await;
        assert_eq!(tracker.next_interval, 20);

        tracker.cycle().await;
        assert_eq!(tracker.next_interval, 16);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_never_shrinks_past_the_floor() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ListingStep::Games(vec![game(1, "A", "B"), game(2, "C", "D")]),
            ListingStep::Games(vec![]),
        ]));
        source.script_details(1, vec![DetailStep::Payload(final_details(1))]);
        source.script_details(2, vec![DetailStep::Payload(final_details(2))]);
        let config = TrackerConfig {
            api_interval: 6,
            verbose: false,
            ..TrackerConfig::default()
        };
        let (mut tracker, _announcer, _registry) = build_tracker(source, config, dir.path());

        tracker.cycle().await;
        tracker.cycle().await;

        // 6 -> 4 after the first resolution, then the floor holds
        assert_eq!(tracker.next_interval, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retry_budget_drops_the_match_unannounced() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![ListingStep::Games(vec![game(
            222, "Alpha", "Beta",
        )])]));
        // no details scripted: every resolution attempt 404s
        let config = TrackerConfig {
            max_resolve_attempts: 2,
            verbose: false,
            ..TrackerConfig::default()
        };
        let (mut tracker, announcer, registry) = build_tracker(source, config, dir.path());

        tracker.cycle().await; // tracked
        tracker.cycle().await; // attempt 1, kept
        assert!(registry.lock().await.contains(222));

        tracker.cycle().await; // attempt 2, dropped
        assert!(registry.lock().await.is_empty());
        assert!(announcer.finished.lock().unwrap().is_empty());
        assert!(tracker.resolve_attempts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolving_one_id_skips_its_purged_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            ListingStep::Games(vec![game(10, "Alpha", "Beta")]),
            ListingStep::Games(vec![game(10, "Alpha", "Beta"), game(20, "Alpha", "Beta")]),
            ListingStep::Games(vec![]),
        ]));
        source.script_details(10, vec![DetailStep::Payload(final_details(10))]);
        let (mut tracker, announcer, registry) =
            build_tracker(source.clone(), quiet_config(), dir.path());

        tracker.cycle().await; // 10 announced
        tracker.cycle().await; // 20 tracked quietly as a repeat
        tracker.cycle().await; // both gone from the listing

        // one detail fetch, one result, registry fully drained
        assert_eq!(source.detail_calls(), 1);
        assert_eq!(announcer.started.lock().unwrap().len(), 1);
        assert_eq!(announcer.finished.lock().unwrap().len(), 1);
        assert!(registry.lock().await.is_empty());
    }
}
