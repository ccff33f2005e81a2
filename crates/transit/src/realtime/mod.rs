//! Real-time trip updates and the snapshot source that applies them.
//!
//! A feed poller decodes a batch of [`TripUpdate`]s and hands it to
//! [`TimetableSnapshotSource::apply_trip_updates`]. Search threads read the
//! result through [`TimetableSnapshotSource::timetable_snapshot`].

pub mod clock;
pub mod config;
pub mod error;
pub mod patch;
pub mod pattern_cache;
pub mod snapshot;
pub mod source;
pub mod update;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackwardsDelayPropagationType, TimetableSnapshotSourceConfig, RETENTION_DAYS};
pub use error::UpdateError;
pub use patch::TripTimesPatch;
pub use pattern_cache::TripPatternCache;
pub use snapshot::{TimetableSnapshot, TripOnServiceDate};
pub use source::{TimetableSnapshotSource, UpdateContext, UpdateSummary};
pub use update::{
    FuzzyTripMatcher, ScheduleRelationship, StopScheduleRelationship, StopTimeEvent, StopTimeUpdate, TripDescriptor,
    TripExtension, TripUpdate, TripUpdateMessage,
};
