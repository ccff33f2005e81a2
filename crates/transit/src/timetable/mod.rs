//! Timetable data model: scheduled trip times, their real-time overlay,
//! stop patterns and per-pattern timetables.

pub mod deduplicator;
pub mod pattern;
pub mod scheduled;
pub mod table;
pub mod trip_times;
pub mod validation;

pub use deduplicator::Deduplicator;
pub use pattern::{StopPattern, StopPatternKey, TripPattern};
pub use scheduled::{ScheduledTripTimes, ScheduledTripTimesBuilder, MAX_TIME, MIN_TIME};
pub use table::Timetable;
pub use trip_times::TripTimes;
pub use validation::{ErrorCode, ValidationError};
