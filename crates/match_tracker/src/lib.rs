//! Match tracking engine
//!
//! Holds the registry of live league matches, reconciles it against each
//! fresh listing poll, and resolves matches that drop out of the listing
//! via the detail endpoint. The poll loop itself lives in [`tracker`];
//! everything underneath it is synchronous and directly testable.

pub mod messages;
pub mod reconcile;
pub mod registry;
pub mod resolve;
pub mod tracker;

pub use reconcile::{reconcile, CycleOutcome, Filters};
pub use registry::{MatchRegistry, NotFoundError, SeriesType, TrackedMatch};
pub use resolve::{evaluate, MatchOutcome};
pub use tracker::{Announcer, MatchTracker, SharedFilters, SharedRegistry, TrackerConfig};
