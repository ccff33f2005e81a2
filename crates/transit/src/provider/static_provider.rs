//! In-memory schedule index.
//!
//! Stores the static schedule in lookup maps and groups trips into
//! patterns by route, direction and stop pattern, building each pattern's
//! scheduled timetable.

use std::collections::HashMap;
use std::sync::Arc;

use fixedbitset::FixedBitSet;
use tracing::debug;

use crate::identifiers::*;
use crate::models::{calendar::ServiceCodes, entities::*, traits::ScheduleIndex, types::*};
use crate::timetable::{Deduplicator, StopPattern, StopPatternKey, Timetable, TripPattern, TripTimes};

type Scoped<T> = (FeedIdentifier, T);

/// In-memory schedule index
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone, Default)]
pub struct StaticScheduleIndex {
    // Core data
    agencies: Vec<Arc<Agency>>,
    patterns: Vec<Arc<TripPattern>>,

    // Lookup maps
    stop_map: HashMap<Scoped<StopIdentifier>, Arc<Stop>>,
    route_map: HashMap<Scoped<RouteIdentifier>, Arc<Route>>,
    trip_map: HashMap<Scoped<TripIdentifier>, Arc<Trip>>,
    pattern_for_trip: HashMap<Scoped<TripIdentifier>, Arc<TripPattern>>,
}

impl StaticScheduleIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from raw schedule data.
    ///
    /// Each trip's service id is registered in `service_codes`; repeated
    /// arrays of the scheduled times are interned through `deduplicator`.
    pub fn from_data(
        agencies: Vec<Agency>,
        stops: Vec<Stop>,
        routes: Vec<Route>,
        trips: Vec<(Trip, Vec<StopTime>)>,
        service_codes: &mut ServiceCodes,
        deduplicator: &Deduplicator,
    ) -> Result<Self> {
        let agencies: Vec<Arc<Agency>> = agencies.into_iter().map(Arc::new).collect();

        // Build lookup maps
        let stop_map: HashMap<_, _> = stops
            .into_iter()
            .map(|s| ((s.feed_id.clone(), s.id.clone()), Arc::new(s)))
            .collect();

        let route_map: HashMap<_, _> = routes
            .into_iter()
            .map(|r| ((r.feed_id.clone(), r.id.clone()), Arc::new(r)))
            .collect();

        // Group trips by route variant
        let mut groups: HashMap<(RouteIdentifier, Option<DirectionId>, StopPatternKey), PatternGroup> =
            HashMap::new();
        let mut group_order = Vec::new();
        let mut trip_map = HashMap::new();

        for (trip, stop_times) in trips {
            for stop_time in &stop_times {
                let key = (stop_time.stop.feed_id.clone(), stop_time.stop.id.clone());
                if !stop_map.contains_key(&key) {
                    return Err(TransitError::StopNotFound(stop_time.stop.id.clone()));
                }
            }
            let route_key = (trip.feed_id.clone(), trip.route.id.clone());
            if !route_map.contains_key(&route_key) {
                return Err(TransitError::RouteNotFound(trip.route.id.clone()));
            }

            let service_code = service_codes.register(trip.service_id.clone());
            let trip = Arc::new(trip);
            let mut times = TripTimes::from_stop_times(trip.clone(), &stop_times, Some(deduplicator))?;
            times.set_service_code(service_code);

            let stop_pattern = StopPattern::from_stop_times(&stop_times);
            let group_key = (trip.route.id.clone(), trip.direction_id, stop_pattern.key());
            let group = groups.entry(group_key.clone()).or_insert_with(|| {
                group_order.push(group_key);
                PatternGroup {
                    route: trip.route.clone(),
                    direction: trip.direction_id,
                    stop_pattern,
                    trip_times: Vec::new(),
                    services: FixedBitSet::new(),
                }
            });
            group.services.grow(service_code as usize + 1);
            group.services.insert(service_code as usize);
            group.trip_times.push(Arc::new(times));

            trip_map.insert((trip.feed_id.clone(), trip.id.clone()), trip);
        }

        // Build patterns
        let mut patterns = Vec::with_capacity(group_order.len());
        let mut pattern_for_trip = HashMap::new();
        let mut counters: HashMap<RouteIdentifier, usize> = HashMap::new();

        for key in group_order {
            let Some(group) = groups.remove(&key) else {
                continue;
            };
            let counter = counters.entry(group.route.id.clone()).or_insert(0);
            *counter += 1;
            let direction = group.direction.map_or(0, |direction| direction as u8);
            let id = format!("{}:{}:{:02}", group.route.id, direction, counter);

            let trip_ids: Vec<_> = group
                .trip_times
                .iter()
                .map(|times| (times.trip().feed_id.clone(), times.trip().id.clone()))
                .collect();
            let pattern = Arc::new(
                TripPattern::new(id, group.route, group.stop_pattern)
                    .with_direction(group.direction)
                    .with_scheduled_timetable(Timetable::new(group.trip_times))
                    .with_services(group.services),
            );
            for trip_id in trip_ids {
                pattern_for_trip.insert(trip_id, pattern.clone());
            }
            patterns.push(pattern);
        }

        debug!(
            stops = stop_map.len(),
            routes = route_map.len(),
            trips = trip_map.len(),
            patterns = patterns.len(),
            "built static schedule index"
        );

        Ok(Self {
            agencies,
            patterns,
            stop_map,
            route_map,
            trip_map,
            pattern_for_trip,
        })
    }

    pub fn patterns(&self) -> &[Arc<TripPattern>] {
        &self.patterns
    }

    pub fn all_trips(&self) -> impl Iterator<Item = &Arc<Trip>> {
        self.trip_map.values()
    }

    pub fn all_stops(&self) -> impl Iterator<Item = &Arc<Stop>> {
        self.stop_map.values()
    }
}

struct PatternGroup {
    route: Arc<Route>,
    direction: Option<DirectionId>,
    stop_pattern: StopPattern,
    trip_times: Vec<Arc<TripTimes>>,
    services: FixedBitSet,
}

impl ScheduleIndex for StaticScheduleIndex {
    fn trip(&self, feed_id: &FeedIdentifier, trip_id: &TripIdentifier) -> Option<Arc<Trip>> {
        self.trip_map.get(&(feed_id.clone(), trip_id.clone())).cloned()
    }

    fn route(&self, feed_id: &FeedIdentifier, route_id: &RouteIdentifier) -> Option<Arc<Route>> {
        self.route_map.get(&(feed_id.clone(), route_id.clone())).cloned()
    }

    fn stop(&self, feed_id: &FeedIdentifier, stop_id: &StopIdentifier) -> Option<Arc<Stop>> {
        self.stop_map.get(&(feed_id.clone(), stop_id.clone())).cloned()
    }

    fn pattern_for_trip(&self, feed_id: &FeedIdentifier, trip_id: &TripIdentifier) -> Option<Arc<TripPattern>> {
        self.pattern_for_trip.get(&(feed_id.clone(), trip_id.clone())).cloned()
    }

    fn agencies(&self, feed_id: &FeedIdentifier) -> Vec<Arc<Agency>> {
        self.agencies
            .iter()
            .filter(|agency| &agency.feed_id == feed_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{test_route, FEED};

    #[test]
    fn test_empty_index() {
        let index = StaticScheduleIndex::new();
        assert!(index.patterns().is_empty());
        assert!(index.trip(&FeedIdentifier::new(FEED), &TripIdentifier::new("T1")).is_none());
    }

    fn stop(id: &str) -> Stop {
        Stop::new(FeedIdentifier::new(FEED), id, id)
    }

    fn trip(id: &str, service: &str, times: &[(&Stop, i32)]) -> (Trip, Vec<StopTime>) {
        let trip = Trip::new(FeedIdentifier::new(FEED), id, test_route(), ServiceIdentifier::new(service));
        let stop_times = times
            .iter()
            .map(|&(stop, time)| StopTime::new(Arc::new(stop.clone()), time, time))
            .collect();
        (trip, stop_times)
    }

    #[test]
    fn test_groups_trips_into_patterns() {
        let (a, b, c) = (stop("A"), stop("B"), stop("C"));
        let route = test_route();
        let mut codes = ServiceCodes::new();
        let dedup = Deduplicator::new();

        let index = StaticScheduleIndex::from_data(
            vec![(*route.agency).clone()],
            vec![a.clone(), b.clone(), c.clone()],
            vec![(*route).clone()],
            vec![
                trip("T2", "weekday", &[(&a, 600), (&b, 660)]),
                trip("T1", "weekday", &[(&a, 0), (&b, 60)]),
                trip("T3", "weekend", &[(&a, 0), (&c, 60)]),
            ],
            &mut codes,
            &dedup,
        )
        .unwrap();

        let feed = FeedIdentifier::new(FEED);
        assert_eq!(index.patterns().len(), 2);
        let p1 = index.pattern_for_trip(&feed, &TripIdentifier::new("T1")).unwrap();
        let p2 = index.pattern_for_trip(&feed, &TripIdentifier::new("T2")).unwrap();
        let p3 = index.pattern_for_trip(&feed, &TripIdentifier::new("T3")).unwrap();
        assert!(Arc::ptr_eq(&p1, &p2));
        assert_ne!(p1.id(), p3.id());

        // Scheduled timetable is sorted by first departure
        let timetable = p1.scheduled_timetable();
        assert_eq!(timetable.trip_index(&TripIdentifier::new("T1")), Some(0));
        assert_eq!(timetable.trip_index(&TripIdentifier::new("T2")), Some(1));

        let weekday = codes.get(&ServiceIdentifier::new("weekday")).unwrap();
        let weekend = codes.get(&ServiceIdentifier::new("weekend")).unwrap();
        assert!(p1.has_service_code(weekday));
        assert!(!p1.has_service_code(weekend));
        assert_eq!(timetable.trip_times()[0].service_code(), Some(weekday));

        assert_eq!(index.agencies(&feed).len(), 1);
        assert!(index.stop(&feed, &StopIdentifier::new("C")).is_some());
        assert!(index.route(&feed, &route.id).is_some());
    }

    #[test]
    fn test_unknown_stop_is_rejected() {
        let (a, b) = (stop("A"), stop("B"));
        let route = test_route();
        let result = StaticScheduleIndex::from_data(
            vec![],
            vec![a.clone()],
            vec![(*route).clone()],
            vec![trip("T1", "weekday", &[(&a, 0), (&b, 60)])],
            &mut ServiceCodes::new(),
            &Deduplicator::new(),
        );
        assert!(matches!(result, Err(TransitError::StopNotFound(id)) if id.as_str() == "B"));
    }
}
