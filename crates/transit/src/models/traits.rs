//! Collaborator traits for the static schedule.
//!
//! The real-time engine only needs to look entities up by their
//! feed-scoped ids. Implementations can be in-memory, database-backed, or
//! remote.

use std::sync::Arc;

use crate::identifiers::*;
use crate::models::entities::{Agency, Route, Stop, Trip};
use crate::timetable::TripPattern;

/// Lookup of static schedule entities by feed-scoped id
pub trait ScheduleIndex: Send + Sync {
    fn trip(&self, feed_id: &FeedIdentifier, trip_id: &TripIdentifier) -> Option<Arc<Trip>>;
    fn route(&self, feed_id: &FeedIdentifier, route_id: &RouteIdentifier) -> Option<Arc<Route>>;
    fn stop(&self, feed_id: &FeedIdentifier, stop_id: &StopIdentifier) -> Option<Arc<Stop>>;

    /// The scheduled pattern a trip belongs to
    fn pattern_for_trip(&self, feed_id: &FeedIdentifier, trip_id: &TripIdentifier) -> Option<Arc<TripPattern>>;

    /// All agencies of a feed
    fn agencies(&self, feed_id: &FeedIdentifier) -> Vec<Arc<Agency>>;
}
