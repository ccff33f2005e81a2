//! The trips of one pattern on one service date.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::identifiers::TripIdentifier;
use crate::timetable::trip_times::TripTimes;

/// Trip times of one pattern. The scheduled timetable of a pattern has no
/// service date; real-time copies are made per service date.
#[derive(Clone, Debug, Default)]
pub struct Timetable {
    service_date: Option<NaiveDate>,
    trip_times: Vec<Arc<TripTimes>>,
}

impl Timetable {
    pub fn new(trip_times: Vec<Arc<TripTimes>>) -> Self {
        let mut timetable = Self {
            service_date: None,
            trip_times,
        };
        timetable.finish();
        timetable
    }

    /// A copy of this timetable valid for `service_date` only.
    pub fn for_service_date(&self, service_date: NaiveDate) -> Self {
        Self {
            service_date: Some(service_date),
            trip_times: self.trip_times.clone(),
        }
    }

    pub fn service_date(&self) -> Option<NaiveDate> {
        self.service_date
    }

    /// True for scheduled timetables, and for real-time ones of `date`.
    pub fn is_valid_for(&self, date: NaiveDate) -> bool {
        self.service_date.map_or(true, |service_date| service_date == date)
    }

    pub fn trip_times(&self) -> &[Arc<TripTimes>] {
        &self.trip_times
    }

    pub fn len(&self) -> usize {
        self.trip_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trip_times.is_empty()
    }

    pub fn trip_index(&self, trip_id: &TripIdentifier) -> Option<usize> {
        self.trip_times.iter().position(|times| &times.trip().id == trip_id)
    }

    pub fn trip_times_for(&self, trip_id: &TripIdentifier) -> Option<&Arc<TripTimes>> {
        self.trip_index(trip_id).map(|index| &self.trip_times[index])
    }

    pub fn add_trip_times(&mut self, trip_times: Arc<TripTimes>) {
        self.trip_times.push(trip_times);
    }

    pub fn set_trip_times(&mut self, index: usize, trip_times: Arc<TripTimes>) {
        self.trip_times[index] = trip_times;
    }

    /// Replace the times of the trip if present, otherwise add them.
    pub fn set_or_add_trip_times(&mut self, trip_times: Arc<TripTimes>) {
        match self.trip_index(&trip_times.trip().id) {
            Some(index) => self.set_trip_times(index, trip_times),
            None => self.add_trip_times(trip_times),
        }
    }

    /// Restore the departure order after updates.
    pub fn finish(&mut self) {
        self.trip_times.sort_by_key(|times| times.sort_index());
    }

    /// Smallest and largest departure of any trip, as `(min, max)`.
    pub fn departure_range(&self) -> Option<(i32, i32)> {
        let first = self.trip_times.iter().map(|times| times.departure_time(0)).min()?;
        let last = self
            .trip_times
            .iter()
            .map(|times| times.departure_time(times.num_stops() - 1))
            .max()?;
        Some((first, last))
    }
}
