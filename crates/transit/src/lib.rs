//! # realtime-transit
//!
//! Real-time timetables over a static transit schedule.
//!
//! ## Features
//!
//! - **Overlay trip times**: Scheduled times are shared and immutable; real-time
//!   values are copied in only for trips that receive updates
//! - **Trip updates**: SCHEDULED, ADDED, REPLACEMENT and CANCELED updates, with
//!   skipped stops and backward delay propagation
//! - **Snapshots**: Updates land in a private buffer that is published as an
//!   immutable snapshot, so searches never see a half-applied update
//! - **Pluggable schedule**: The engine reads the static schedule through the
//!   [`ScheduleIndex`](models::ScheduleIndex) and
//!   [`CalendarService`](models::CalendarService) traits
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use realtime_transit::prelude::*;
//!
//! let feed = FeedIdentifier::new("metro");
//! let agency = Agency { id: AgencyIdentifier::new("m"), feed_id: feed.clone(), name: "Metro".into() };
//! let route = Route {
//!     id: RouteIdentifier::new("1"),
//!     feed_id: feed.clone(),
//!     agency: Arc::new(agency.clone()),
//!     route_type: RouteType::Bus,
//!     gtfs_type: Some(3),
//!     short_name: Some("1".into()),
//!     long_name: None,
//!     url: None,
//! };
//! let stops: Vec<Stop> = ["A", "B"].iter().map(|id| Stop::new(feed.clone(), *id, *id)).collect();
//! let trip = Trip::new(feed.clone(), "T1", Arc::new(route.clone()), ServiceIdentifier::new("weekday"));
//! let stop_times = vec![
//!     StopTime::new(Arc::new(stops[0].clone()), 28_800, 28_800).with_stop_sequence(1),
//!     StopTime::new(Arc::new(stops[1].clone()), 29_400, 29_400).with_stop_sequence(2),
//! ];
//!
//! let mut service_codes = ServiceCodes::new();
//! let deduplicator = Deduplicator::new();
//! let index = StaticScheduleIndex::from_data(
//!     vec![agency], stops, vec![route], vec![(trip, stop_times)], &mut service_codes, &deduplicator,
//! ).unwrap();
//! let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let calendar = CalendarIndex::new(vec![ServiceCalendar::daily(ServiceIdentifier::new("weekday"), date, date)]);
//!
//! let config = TimetableSnapshotSourceConfig { purge_expired_data: false, ..Default::default() };
//! let source = TimetableSnapshotSource::new(config);
//! let ctx = UpdateContext::new(&calendar, &deduplicator, &index, &service_codes);
//! let update = TripUpdate::new(TripDescriptor::new("T1").with_service_date(date))
//!     .with_stop_time_update(StopTimeUpdate::for_stop("B").with_arrival_delay(120));
//! let summary = source.apply_trip_updates(&ctx, false, &[update], &feed);
//! assert_eq!(summary.applied, 1);
//!
//! let snapshot = source.timetable_snapshot();
//! let pattern = index.pattern_for_trip(&feed, &TripIdentifier::new("T1")).unwrap();
//! let times = snapshot.trip_times(&pattern, &TripIdentifier::new("T1"), date).unwrap();
//! assert_eq!(times.arrival_delay(1), 120);
//! ```

pub mod identifiers;
pub mod models;
pub mod provider;
pub mod realtime;
pub mod timetable;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::{calendar::*, entities::*, traits::*, types::*};
    pub use crate::provider::StaticScheduleIndex;
    pub use crate::realtime::{
        BackwardsDelayPropagationType, Clock, FuzzyTripMatcher, ManualClock, ScheduleRelationship,
        StopScheduleRelationship, StopTimeEvent, StopTimeUpdate, SystemClock, TimetableSnapshot,
        TimetableSnapshotSource, TimetableSnapshotSourceConfig, TripDescriptor, TripExtension, TripOnServiceDate,
        TripUpdate, TripUpdateMessage, UpdateContext, UpdateError, UpdateSummary,
    };
    pub use crate::timetable::{
        Deduplicator, ErrorCode, StopPattern, Timetable, TripPattern, TripTimes, ValidationError,
    };
}

pub use prelude::*;
