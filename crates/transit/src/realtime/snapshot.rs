//! Real-time timetables per pattern and service date.
//!
//! The same type serves as the writer's working buffer and as the
//! published snapshot. [`TimetableSnapshot::commit`] hands out a copy that
//! shares every timetable with the buffer; the buffer copies a timetable
//! again before its next change, so a published snapshot never changes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::trace;

use crate::identifiers::*;
use crate::timetable::{Timetable, TripPattern, TripTimes};

/// One trip on one service date.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TripOnServiceDate {
    pub feed_id: FeedIdentifier,
    pub trip_id: TripIdentifier,
    pub service_date: NaiveDate,
}

impl TripOnServiceDate {
    pub fn new(feed_id: FeedIdentifier, trip_id: TripIdentifier, service_date: NaiveDate) -> Self {
        Self {
            feed_id,
            trip_id,
            service_date,
        }
    }
}

#[derive(Clone, Debug)]
struct PatternTimetables {
    pattern: Arc<TripPattern>,
    by_date: BTreeMap<NaiveDate, Arc<Timetable>>,
}

#[derive(Clone, Debug, Default)]
pub struct TimetableSnapshot {
    timetables: HashMap<PatternIdentifier, Arc<PatternTimetables>>,
    last_added_trip_pattern: HashMap<TripOnServiceDate, Arc<TripPattern>>,
    patterns_for_stop: HashMap<(FeedIdentifier, StopIdentifier), HashSet<Arc<TripPattern>>>,
    dirty_timetables: HashSet<(PatternIdentifier, NaiveDate)>,
    dirty: bool,
}

impl TimetableSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The timetable of `pattern` on `service_date`: the real-time one if
    /// there is one, the scheduled one otherwise.
    pub fn resolve(&self, pattern: &TripPattern, service_date: NaiveDate) -> Arc<Timetable> {
        self.timetables
            .get(pattern.id())
            .and_then(|entry| entry.by_date.get(&service_date))
            .cloned()
            .unwrap_or_else(|| pattern.scheduled_timetable().clone())
    }

    /// Real-time trip times of a trip on a service date, if the trip has any.
    pub fn trip_times(
        &self,
        pattern: &TripPattern,
        trip_id: &TripIdentifier,
        service_date: NaiveDate,
    ) -> Option<Arc<TripTimes>> {
        self.timetables
            .get(pattern.id())
            .and_then(|entry| entry.by_date.get(&service_date))
            .and_then(|timetable| timetable.trip_times_for(trip_id))
            .cloned()
    }

    /// Store `trip_times` in the timetable of `pattern` on `service_date`,
    /// replacing earlier times of the same trip.
    ///
    /// The times must already be valid. Trips of patterns created by the
    /// real-time updater are remembered as the last added instance of the
    /// trip on that date.
    pub fn update(&mut self, pattern: &Arc<TripPattern>, trip_times: TripTimes, service_date: NaiveDate) {
        let entry = self.timetables.entry(pattern.id().clone()).or_insert_with(|| {
            Arc::new(PatternTimetables {
                pattern: pattern.clone(),
                by_date: BTreeMap::new(),
            })
        });
        let timetable = Arc::make_mut(entry)
            .by_date
            .entry(service_date)
            .or_insert_with(|| Arc::new(pattern.scheduled_timetable().for_service_date(service_date)));

        let trip_id = trip_times.trip().id.clone();
        let feed_id = trip_times.trip().feed_id.clone();
        Arc::make_mut(timetable).set_or_add_trip_times(Arc::new(trip_times));
        self.dirty_timetables.insert((pattern.id().clone(), service_date));

        if pattern.is_created_by_realtime_updater() {
            self.last_added_trip_pattern.insert(
                TripOnServiceDate::new(feed_id, trip_id, service_date),
                pattern.clone(),
            );
            for stop in pattern.stop_pattern().stops() {
                self.patterns_for_stop
                    .entry((stop.feed_id.clone(), stop.id.clone()))
                    .or_default()
                    .insert(pattern.clone());
            }
        }
        self.dirty = true;
    }

    /// Pattern of the trip's last instance added by the real-time updater.
    pub fn last_added_trip_pattern(&self, trip: &TripOnServiceDate) -> Option<&Arc<TripPattern>> {
        self.last_added_trip_pattern.get(trip)
    }

    /// Patterns created by the real-time updater that serve a stop.
    pub fn patterns_for_stop(&self, feed_id: &FeedIdentifier, stop_id: &StopIdentifier) -> Vec<Arc<TripPattern>> {
        let mut patterns: Vec<_> = self
            .patterns_for_stop
            .get(&(feed_id.clone(), stop_id.clone()))
            .map(|patterns| patterns.iter().cloned().collect())
            .unwrap_or_default();
        patterns.sort_by(|a, b| a.id().cmp(b.id()));
        patterns
    }

    pub fn has_realtime_added_trip_patterns(&self) -> bool {
        !self.last_added_trip_pattern.is_empty()
    }

    /// Service dates with real-time data for `pattern`.
    pub fn service_dates(&self, pattern: &TripPattern) -> Vec<NaiveDate> {
        self.timetables
            .get(pattern.id())
            .map(|entry| entry.by_date.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of real-time timetables over all patterns and dates.
    pub fn timetable_count(&self) -> usize {
        self.timetables.values().map(|entry| entry.by_date.len()).sum()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Remove all real-time data of a feed. Returns true if anything was
    /// removed.
    pub fn clear(&mut self, feed_id: &FeedIdentifier) -> bool {
        let timetables = self.timetables.len();
        self.timetables.retain(|_, entry| entry.pattern.feed_id() != feed_id);
        self.dirty_timetables
            .retain(|(pattern_id, _)| self.timetables.contains_key(pattern_id));

        let added = self.last_added_trip_pattern.len();
        self.last_added_trip_pattern.retain(|trip, _| &trip.feed_id != feed_id);

        let stops = self.patterns_for_stop.len();
        self.patterns_for_stop.retain(|(stop_feed, _), _| stop_feed != feed_id);

        let modified = timetables != self.timetables.len()
            || added != self.last_added_trip_pattern.len()
            || stops != self.patterns_for_stop.len();
        if modified {
            trace!(feed_id = %feed_id, "cleared realtime data of feed");
            self.dirty = true;
        }
        modified
    }

    /// Remove every timetable and added-trip record for service dates on or
    /// before `watermark`, and unindex realtime patterns left without any
    /// timetable. Returns true if anything was removed.
    pub fn purge_expired_data(&mut self, watermark: NaiveDate) -> bool {
        let mut modified = false;
        self.timetables.retain(|_, entry| {
            if entry.by_date.keys().next().is_some_and(|&date| date <= watermark) {
                let entry = Arc::make_mut(entry);
                entry.by_date = entry.by_date.split_off(&(watermark + chrono::Days::new(1)));
                modified = true;
            }
            !entry.by_date.is_empty()
        });
        self.dirty_timetables.retain(|(_, date)| *date > watermark);

        let added = self.last_added_trip_pattern.len();
        self.last_added_trip_pattern
            .retain(|trip, _| trip.service_date > watermark);
        modified |= added != self.last_added_trip_pattern.len();

        // Realtime patterns stay discoverable only while they have a timetable.
        let timetables = &self.timetables;
        self.patterns_for_stop.retain(|_, patterns| {
            let before = patterns.len();
            patterns.retain(|pattern| timetables.contains_key(pattern.id()));
            modified |= before != patterns.len();
            !patterns.is_empty()
        });

        if modified {
            self.dirty = true;
        }
        modified
    }

    /// Finish the timetables changed since the last commit and return a
    /// read-only copy. The buffer is clean afterwards.
    pub fn commit(&mut self) -> TimetableSnapshot {
        for (pattern_id, service_date) in self.dirty_timetables.drain() {
            if let Some(timetable) = self
                .timetables
                .get_mut(&pattern_id)
                .and_then(|entry| Arc::make_mut(entry).by_date.get_mut(&service_date))
            {
                Arc::make_mut(timetable).finish();
            }
        }
        self.dirty = false;
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{stop_times, test_route, test_trip, FEED};
    use crate::timetable::StopPattern;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn scheduled_pattern() -> Arc<TripPattern> {
        let stop_times = stop_times(&[("A", 0, 0), ("B", 60, 60)]);
        let t1 = TripTimes::from_stop_times(test_trip("T1"), &stop_times, None).unwrap();
        let t2 = TripTimes::from_stop_times(test_trip("T2"), &stop_times, None).unwrap();
        Arc::new(
            TripPattern::new("R1:0:01", test_route(), StopPattern::from_stop_times(&stop_times))
                .with_scheduled_timetable(Timetable::new(vec![Arc::new(t1), Arc::new(t2)])),
        )
    }

    fn delayed(pattern: &TripPattern, trip: &str, delay: i32) -> TripTimes {
        let trip_id = TripIdentifier::new(trip);
        let mut times = pattern.scheduled_timetable().trip_times_for(&trip_id).unwrap().copy_of_scheduled_times();
        times.update_arrival_delay(1, delay);
        times.update_departure_delay(1, delay);
        times
    }

    #[test]
    fn test_resolve_falls_back_to_schedule() {
        let pattern = scheduled_pattern();
        let mut buffer = TimetableSnapshot::new();
        assert!(Arc::ptr_eq(&buffer.resolve(&pattern, date(1)), pattern.scheduled_timetable()));

        buffer.update(&pattern, delayed(&pattern, "T1", 30), date(1));
        let timetable = buffer.resolve(&pattern, date(1));
        assert_eq!(timetable.service_date(), Some(date(1)));
        assert_eq!(timetable.len(), 2);
        assert_eq!(timetable.trip_times_for(&TripIdentifier::new("T1")).unwrap().arrival_time(1), 90);
        assert!(Arc::ptr_eq(&buffer.resolve(&pattern, date(2)), pattern.scheduled_timetable()));
        assert!(buffer.is_dirty());
        assert!(!buffer.has_realtime_added_trip_patterns());
    }

    #[test]
    fn test_commit_does_not_leak_later_updates() {
        let pattern = scheduled_pattern();
        let mut buffer = TimetableSnapshot::new();
        buffer.update(&pattern, delayed(&pattern, "T1", 30), date(1));

        let snapshot = buffer.commit();
        assert!(!buffer.is_dirty());
        assert!(!snapshot.is_dirty());

        buffer.update(&pattern, delayed(&pattern, "T1", 90), date(1));
        let t1 = TripIdentifier::new("T1");
        assert_eq!(snapshot.trip_times(&pattern, &t1, date(1)).unwrap().arrival_time(1), 90);
        assert_eq!(buffer.trip_times(&pattern, &t1, date(1)).unwrap().arrival_time(1), 150);
    }

    #[test]
    fn test_commit_sorts_changed_timetables() {
        let pattern = scheduled_pattern();
        let mut buffer = TimetableSnapshot::new();
        let trip_id = TripIdentifier::new("T1");
        let mut times = pattern.scheduled_timetable().trip_times_for(&trip_id).unwrap().copy_of_scheduled_times();
        times.update_departure_delay(0, 600);
        times.update_arrival_delay(1, 600);
        times.update_departure_delay(1, 600);
        buffer.update(&pattern, times, date(1));

        let snapshot = buffer.commit();
        let order: Vec<_> = snapshot
            .resolve(&pattern, date(1))
            .trip_times()
            .iter()
            .map(|times| times.trip().id.to_string())
            .collect();
        assert_eq!(order, vec!["T2", "T1"]);
    }

    #[test]
    fn test_realtime_patterns_are_indexed() {
        let scheduled = scheduled_pattern();
        let stop_times = stop_times(&[("A", 0, 0), ("C", 60, 60)]);
        let realtime = Arc::new(
            TripPattern::new("R1:1:rt", test_route(), StopPattern::from_stop_times(&stop_times))
                .created_by_realtime_updater(Some(scheduled.clone())),
        );
        let mut buffer = TimetableSnapshot::new();
        let times = TripTimes::from_stop_times(test_trip("T9"), &stop_times, None).unwrap();
        buffer.update(&realtime, times, date(1));

        let feed = FeedIdentifier::new(FEED);
        let trip = TripOnServiceDate::new(feed.clone(), TripIdentifier::new("T9"), date(1));
        assert!(Arc::ptr_eq(buffer.last_added_trip_pattern(&trip).unwrap(), &realtime));
        assert_eq!(buffer.patterns_for_stop(&feed, &StopIdentifier::new("C")).len(), 1);
        assert!(buffer.patterns_for_stop(&feed, &StopIdentifier::new("B")).is_empty());

        assert!(buffer.clear(&feed));
        assert!(buffer.last_added_trip_pattern(&trip).is_none());
        assert_eq!(buffer.timetable_count(), 0);
        assert!(!buffer.clear(&feed));
    }

    #[test]
    fn test_purge_expired_data() {
        let pattern = scheduled_pattern();
        let mut buffer = TimetableSnapshot::new();
        for day in 1..=4 {
            buffer.update(&pattern, delayed(&pattern, "T1", 30), date(day));
        }
        let committed = buffer.commit();

        assert!(buffer.purge_expired_data(date(2)));
        assert_eq!(buffer.service_dates(&pattern), vec![date(3), date(4)]);
        assert!(buffer.is_dirty());
        assert!(!buffer.purge_expired_data(date(2)));

        assert_eq!(committed.timetable_count(), 4);
    }

    #[test]
    fn test_purge_unindexes_realtime_patterns() {
        let scheduled = scheduled_pattern();
        let stop_times = stop_times(&[("A", 0, 0), ("C", 60, 60)]);
        let realtime = Arc::new(
            TripPattern::new("R1:1:rt", test_route(), StopPattern::from_stop_times(&stop_times))
                .created_by_realtime_updater(Some(scheduled.clone())),
        );
        let mut buffer = TimetableSnapshot::new();
        let times = TripTimes::from_stop_times(test_trip("T9"), &stop_times, None).unwrap();
        buffer.update(&realtime, times.clone(), date(1));
        buffer.update(&realtime, times, date(3));
        buffer.update(&scheduled, delayed(&scheduled, "T1", 30), date(1));

        let feed = FeedIdentifier::new(FEED);
        let stop_c = StopIdentifier::new("C");
        assert!(buffer.purge_expired_data(date(2)));
        assert_eq!(buffer.patterns_for_stop(&feed, &stop_c).len(), 1);

        assert!(buffer.purge_expired_data(date(3)));
        assert!(buffer.patterns_for_stop(&feed, &stop_c).is_empty());
        assert!(buffer.patterns_for_stop(&feed, &StopIdentifier::new("A")).is_empty());
        assert!(!buffer.has_realtime_added_trip_patterns());
        assert_eq!(buffer.timetable_count(), 0);
    }
}
