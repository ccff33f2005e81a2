//! Stop patterns and the trip patterns built on them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use arc_swap::ArcSwap;
use fixedbitset::FixedBitSet;

use crate::identifiers::*;
use crate::models::entities::{Route, Stop, StopTime};
use crate::models::types::{DirectionId, PickDrop, RouteType};
use crate::timetable::table::Timetable;

/// The ordered stops of a trip with the pickup and drop-off arrangement at
/// each of them.
#[derive(Clone, Debug)]
pub struct StopPattern {
    stops: Arc<[Arc<Stop>]>,
    pickups: Arc<[PickDrop]>,
    drop_offs: Arc<[PickDrop]>,
}

impl StopPattern {
    pub fn new(stops: Vec<Arc<Stop>>, pickups: Vec<PickDrop>, drop_offs: Vec<PickDrop>) -> Self {
        debug_assert_eq!(stops.len(), pickups.len());
        debug_assert_eq!(stops.len(), drop_offs.len());
        Self {
            stops: stops.into(),
            pickups: pickups.into(),
            drop_offs: drop_offs.into(),
        }
    }

    pub fn from_stop_times(stop_times: &[StopTime]) -> Self {
        Self {
            stops: stop_times.iter().map(|st| st.stop.clone()).collect(),
            pickups: stop_times.iter().map(|st| st.pickup).collect(),
            drop_offs: stop_times.iter().map(|st| st.drop_off).collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.stops.len()
    }

    pub fn stop(&self, index: usize) -> &Arc<Stop> {
        &self.stops[index]
    }

    pub fn stops(&self) -> &[Arc<Stop>] {
        &self.stops
    }

    pub fn pickup(&self, index: usize) -> PickDrop {
        self.pickups[index]
    }

    pub fn drop_off(&self, index: usize) -> PickDrop {
        self.drop_offs[index]
    }

    pub fn contains_stop(&self, feed_id: &FeedIdentifier, stop_id: &StopIdentifier) -> bool {
        self.stops.iter().any(|stop| &stop.feed_id == feed_id && &stop.id == stop_id)
    }

    /// A pattern without the stops at `removed` (ascending indices).
    pub fn without_stops(&self, removed: &[usize]) -> Self {
        let kept = || (0..self.size()).filter(|index| !removed.contains(index));
        Self {
            stops: kept().map(|i| self.stops[i].clone()).collect(),
            pickups: kept().map(|i| self.pickups[i]).collect(),
            drop_offs: kept().map(|i| self.drop_offs[i]).collect(),
        }
    }

    /// Value key identifying this stop sequence, for sharing patterns
    /// between trips that visit the same stops the same way.
    pub fn key(&self) -> StopPatternKey {
        StopPatternKey {
            stops: self
                .stops
                .iter()
                .map(|stop| (stop.feed_id.clone(), stop.id.clone()))
                .collect(),
            access: self
                .pickups
                .iter()
                .zip(self.drop_offs.iter())
                .map(|(&pickup, &drop_off)| pickup as u8 | (drop_off as u8) << 4)
                .collect(),
        }
    }
}

/// Order-sensitive key of a [`StopPattern`]: feed-scoped stop ids plus one
/// byte per stop with the pickup arrangement in the low nibble and the
/// drop-off arrangement in the high nibble.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StopPatternKey {
    stops: Vec<(FeedIdentifier, StopIdentifier)>,
    access: Vec<u8>,
}

impl StopPatternKey {
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

/// A route variant: trips of one route sharing a stop pattern, with the
/// scheduled timetable of those trips.
///
/// Patterns are shared by every snapshot and must not change once
/// published, except for the set of active service codes which is swapped
/// atomically.
pub struct TripPattern {
    id: PatternIdentifier,
    route: Arc<Route>,
    mode: RouteType,
    direction: Option<DirectionId>,
    stop_pattern: StopPattern,
    scheduled_timetable: Arc<Timetable>,
    services: ArcSwap<FixedBitSet>,
    created_by_realtime_updater: bool,
    original_pattern: Option<Arc<TripPattern>>,
}

impl TripPattern {
    pub fn new(id: impl Into<PatternIdentifier>, route: Arc<Route>, stop_pattern: StopPattern) -> Self {
        let mode = route.route_type;
        Self {
            id: id.into(),
            route,
            mode,
            direction: None,
            stop_pattern,
            scheduled_timetable: Arc::new(Timetable::default()),
            services: ArcSwap::from_pointee(FixedBitSet::new()),
            created_by_realtime_updater: false,
            original_pattern: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RouteType) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Option<DirectionId>) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_scheduled_timetable(mut self, timetable: Timetable) -> Self {
        self.scheduled_timetable = Arc::new(timetable);
        self
    }

    #[must_use]
    pub fn with_services(self, services: FixedBitSet) -> Self {
        self.services.store(Arc::new(services));
        self
    }

    #[must_use]
    pub fn created_by_realtime_updater(mut self, original_pattern: Option<Arc<TripPattern>>) -> Self {
        self.created_by_realtime_updater = true;
        self.original_pattern = original_pattern;
        self
    }

    pub fn id(&self) -> &PatternIdentifier {
        &self.id
    }

    pub fn feed_id(&self) -> &FeedIdentifier {
        &self.route.feed_id
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn mode(&self) -> RouteType {
        self.mode
    }

    pub fn direction(&self) -> Option<DirectionId> {
        self.direction
    }

    pub fn stop_pattern(&self) -> &StopPattern {
        &self.stop_pattern
    }

    pub fn num_stops(&self) -> usize {
        self.stop_pattern.size()
    }

    pub fn stop(&self, index: usize) -> &Arc<Stop> {
        self.stop_pattern.stop(index)
    }

    pub fn scheduled_timetable(&self) -> &Arc<Timetable> {
        &self.scheduled_timetable
    }

    pub fn is_created_by_realtime_updater(&self) -> bool {
        self.created_by_realtime_updater
    }

    /// The scheduled pattern a real-time pattern was derived from.
    pub fn original_pattern(&self) -> Option<&Arc<TripPattern>> {
        self.original_pattern.as_ref()
    }

    /// Service codes of the days this pattern runs on.
    pub fn services(&self) -> Arc<FixedBitSet> {
        self.services.load_full()
    }

    pub fn has_service_code(&self, service_code: u32) -> bool {
        self.services.load().contains(service_code as usize)
    }

    /// Mark `service_code` active. Readers holding the previous set keep
    /// seeing it unchanged.
    pub fn set_service_code(&self, service_code: u32) {
        let code = service_code as usize;
        if self.services.load().contains(code) {
            return;
        }
        self.services.rcu(|current| {
            let mut next = FixedBitSet::clone(current);
            next.grow(code + 1);
            next.insert(code);
            next
        });
    }
}

impl PartialEq for TripPattern {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TripPattern {}

impl Hash for TripPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TripPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripPattern")
            .field("id", &self.id)
            .field("route", &self.route.id)
            .field("mode", &self.mode)
            .field("stops", &self.stop_pattern.size())
            .field("created_by_realtime_updater", &self.created_by_realtime_updater)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{stop_times, test_route};

    #[test]
    fn test_key_is_structural() {
        let a = StopPattern::from_stop_times(&stop_times(&[("A", 0, 0), ("B", 60, 60)]));
        let b = StopPattern::from_stop_times(&stop_times(&[("A", 10, 10), ("B", 90, 90)]));
        let c = StopPattern::from_stop_times(&stop_times(&[("B", 0, 0), ("A", 60, 60)]));

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_key_includes_access() {
        let stops = stop_times(&[("A", 0, 0), ("B", 60, 60)]);
        let mut no_pickup = stops.clone();
        no_pickup[1].pickup = PickDrop::None;

        assert_ne!(
            StopPattern::from_stop_times(&stops).key(),
            StopPattern::from_stop_times(&no_pickup).key()
        );
    }

    #[test]
    fn test_without_stops() {
        let pattern = StopPattern::from_stop_times(&stop_times(&[("A", 0, 0), ("B", 60, 60), ("C", 120, 120)]));
        let reduced = pattern.without_stops(&[1]);

        assert_eq!(reduced.size(), 2);
        assert_eq!(reduced.stop(1).id.as_str(), "C");
        assert!(!reduced.contains_stop(&FeedIdentifier::new("F"), &StopIdentifier::new("B")));
    }

    #[test]
    fn test_service_codes_copy_on_write() {
        let stops = StopPattern::from_stop_times(&stop_times(&[("A", 0, 0), ("B", 60, 60)]));
        let pattern = TripPattern::new("P1", test_route(), stops);

        let before = pattern.services();
        pattern.set_service_code(5);
        let after = pattern.services();

        assert!(!before.contains(5));
        assert!(after.contains(5));
        assert!(pattern.has_service_code(5));
        assert!(!pattern.has_service_code(4));

        pattern.set_service_code(5);
        assert!(Arc::ptr_eq(&after, &pattern.services()));
    }
}
