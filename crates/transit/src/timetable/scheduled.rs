//! Immutable scheduled times of one trip.

use std::sync::Arc;

use fixedbitset::FixedBitSet;

use crate::models::entities::{StopTime, Trip};
use crate::models::types::{Accessibility, BookingInfo, Result, TransitError};
use crate::timetable::deduplicator::Deduplicator;
use crate::timetable::validation::{ErrorCode, ValidationError};

/// Earliest allowed time; time-shifting between time zones may yield
/// negative times.
pub const MIN_TIME: i32 = -12 * 60 * 60;

/// Latest allowed time. No trip runs for more than ten days.
pub const MAX_TIME: i32 = 10 * 24 * 60 * 60;

/// Scheduled arrival and departure times of a trip, validated once at
/// construction and never mutated afterwards.
///
/// Times are stored relative to `time_shift`, so trips that run the same
/// schedule at different times of day can share their time arrays through
/// a [`Deduplicator`].
#[derive(Clone, Debug)]
pub struct ScheduledTripTimes {
    time_shift: i32,
    service_code: Option<u32>,
    arrival_times: Arc<[i32]>,
    departure_times: Arc<[i32]>,
    timepoints: Arc<FixedBitSet>,
    trip: Arc<Trip>,
    pickup_booking_infos: Arc<[Option<BookingInfo>]>,
    drop_off_booking_infos: Arc<[Option<BookingInfo>]>,
    headsigns: Option<Arc<[Option<Arc<str>>]>>,
    original_stop_sequence: Option<Arc<[u32]>>,
}

impl ScheduledTripTimes {
    pub fn builder(deduplicator: Option<&Deduplicator>) -> ScheduledTripTimesBuilder<'_> {
        ScheduledTripTimesBuilder::new(deduplicator)
    }

    /// Build the scheduled times of `trip` from its stop times.
    pub fn from_stop_times(
        trip: Arc<Trip>,
        stop_times: &[StopTime],
        deduplicator: Option<&Deduplicator>,
    ) -> Result<Self> {
        let first = stop_times
            .first()
            .ok_or_else(|| TransitError::InvalidData(format!("trip {} has no stop times", trip.id)))?;
        let time_shift = first.departure_time;

        let arrivals: Vec<i32> = stop_times.iter().map(|st| st.arrival_time - time_shift).collect();
        let departures: Vec<i32> = stop_times.iter().map(|st| st.departure_time - time_shift).collect();

        let mut timepoints = FixedBitSet::with_capacity(stop_times.len());
        for (index, stop_time) in stop_times.iter().enumerate() {
            timepoints.set(index, stop_time.timepoint);
        }

        let mut builder = Self::builder(deduplicator)
            .with_trip(trip)
            .with_time_shift(time_shift)
            .with_arrival_times(&arrivals)
            .with_departure_times(&departures)
            .with_timepoints(&timepoints)
            .with_pickup_booking_infos(stop_times.iter().map(|st| st.pickup_booking_info.clone()).collect())
            .with_drop_off_booking_infos(stop_times.iter().map(|st| st.drop_off_booking_info.clone()).collect());

        if stop_times.iter().any(|st| st.headsign.is_some()) {
            builder = builder.with_headsigns(stop_times.iter().map(|st| st.headsign.clone()).collect());
        }

        let sequences: Option<Vec<u32>> = stop_times.iter().map(|st| st.stop_sequence).collect();
        if let Some(sequences) = sequences {
            builder = builder.with_original_stop_sequence(&sequences);
        }

        builder.build()
    }

    /// Start a builder holding this trip's data, for changing a few fields.
    pub fn copy_of<'a>(&self, deduplicator: Option<&'a Deduplicator>) -> ScheduledTripTimesBuilder<'a> {
        ScheduledTripTimesBuilder {
            deduplicator,
            time_shift: self.time_shift,
            service_code: self.service_code,
            arrival_times: Some(self.arrival_times.clone()),
            departure_times: Some(self.departure_times.clone()),
            timepoints: Some(self.timepoints.clone()),
            trip: Some(self.trip.clone()),
            pickup_booking_infos: Some(self.pickup_booking_infos.clone()),
            drop_off_booking_infos: Some(self.drop_off_booking_infos.clone()),
            headsigns: self.headsigns.clone(),
            original_stop_sequence: self.original_stop_sequence.clone(),
        }
    }

    /// A copy keeping only the stops at `stop_indices` (ascending).
    pub fn select_stops(&self, stop_indices: &[usize]) -> Result<Self> {
        if let Some(&index) = stop_indices.iter().find(|&&index| index >= self.num_stops()) {
            return Err(TransitError::InvalidData(format!(
                "stop index {index} out of range for trip {}",
                self.trip.id
            )));
        }

        let arrivals: Vec<i32> = stop_indices.iter().map(|&i| self.arrival_times[i]).collect();
        let departures: Vec<i32> = stop_indices.iter().map(|&i| self.departure_times[i]).collect();
        let mut timepoints = FixedBitSet::with_capacity(stop_indices.len());
        for (to, &from) in stop_indices.iter().enumerate() {
            timepoints.set(to, self.timepoints.contains(from));
        }

        let mut builder = self
            .copy_of(None)
            .with_arrival_times(&arrivals)
            .with_departure_times(&departures)
            .with_timepoints(&timepoints)
            .with_pickup_booking_infos(
                stop_indices.iter().map(|&i| self.pickup_booking_infos[i].clone()).collect(),
            )
            .with_drop_off_booking_infos(
                stop_indices.iter().map(|&i| self.drop_off_booking_infos[i].clone()).collect(),
            );
        builder.headsigns = self
            .headsigns
            .as_ref()
            .map(|headsigns| stop_indices.iter().map(|&i| headsigns[i].clone()).collect());
        builder.original_stop_sequence = self
            .original_stop_sequence
            .as_ref()
            .map(|sequence| stop_indices.iter().map(|&i| sequence[i]).collect());
        builder.build()
    }

    pub fn service_code(&self) -> Option<u32> {
        self.service_code
    }

    pub fn time_shift(&self) -> i32 {
        self.time_shift
    }

    pub fn scheduled_arrival_time(&self, stop: usize) -> i32 {
        self.arrival_times[stop] + self.time_shift
    }

    pub fn scheduled_departure_time(&self, stop: usize) -> i32 {
        self.departure_times[stop] + self.time_shift
    }

    pub fn is_timepoint(&self, stop: usize) -> bool {
        self.timepoints.contains(stop)
    }

    pub fn trip(&self) -> &Arc<Trip> {
        &self.trip
    }

    /// Trips sharing a pattern are ordered by their first departure.
    pub fn sort_index(&self) -> i32 {
        self.scheduled_departure_time(0)
    }

    pub fn pickup_booking_info(&self, stop: usize) -> Option<&BookingInfo> {
        self.pickup_booking_infos[stop].as_ref()
    }

    pub fn drop_off_booking_info(&self, stop: usize) -> Option<&BookingInfo> {
        self.drop_off_booking_infos[stop].as_ref()
    }

    pub fn trip_headsign(&self) -> Option<&Arc<str>> {
        self.trip.headsign.as_ref()
    }

    /// Stop headsign, falling back to the trip headsign.
    pub fn headsign(&self, stop: usize) -> Option<&Arc<str>> {
        self.headsigns
            .as_ref()
            .and_then(|headsigns| headsigns[stop].as_ref())
            .or_else(|| self.trip_headsign())
    }

    pub fn num_stops(&self) -> usize {
        self.arrival_times.len()
    }

    pub fn wheelchair_accessibility(&self) -> Accessibility {
        self.trip.wheelchair_accessible
    }

    /// The feed's stop sequence number of the stop at `stop`.
    pub fn gtfs_sequence_of_stop_index(&self, stop: usize) -> Option<u32> {
        self.original_stop_sequence.as_ref().map(|sequence| sequence[stop])
    }

    /// Position of the stop with the feed's stop sequence number `sequence`.
    pub fn stop_index_of_gtfs_sequence(&self, sequence: u32) -> Option<usize> {
        self.original_stop_sequence
            .as_ref()?
            .iter()
            .position(|&candidate| candidate == sequence)
    }

    pub(crate) fn copy_arrival_times(&self) -> Vec<i32> {
        self.arrival_times.iter().map(|t| t + self.time_shift).collect()
    }

    pub(crate) fn copy_departure_times(&self) -> Vec<i32> {
        self.departure_times.iter().map(|t| t + self.time_shift).collect()
    }

    pub(crate) fn copy_headsigns(&self) -> Vec<Option<Arc<str>>> {
        match &self.headsigns {
            Some(headsigns) => headsigns.to_vec(),
            None => vec![None; self.num_stops()],
        }
    }

    pub(crate) fn set_service_code(&mut self, service_code: u32) {
        self.service_code = Some(service_code);
    }

    fn validate(&self) -> Result<()> {
        let last = self.num_stops() - 1;
        require_in_range(self.scheduled_departure_time(0), 0)?;
        require_in_range(self.scheduled_arrival_time(last), last)?;
        self.validate_non_increasing_times()?;
        Ok(())
    }

    /// The first arrival and the last departure are not checked; a search
    /// never uses them.
    fn validate_non_increasing_times(&self) -> std::result::Result<(), ValidationError> {
        let last = self.num_stops() - 1;
        if last < 1 {
            return Ok(());
        }

        let mut previous_departure = self.scheduled_departure_time(0);
        for stop in 1..=last {
            let arrival = self.scheduled_arrival_time(stop);
            if previous_departure > arrival {
                return Err(ValidationError::new(ErrorCode::NegativeHopTime, stop));
            }
            if stop == last {
                break;
            }
            let departure = self.scheduled_departure_time(stop);
            if departure < arrival {
                return Err(ValidationError::new(ErrorCode::NegativeDwellTime, stop));
            }
            previous_departure = departure;
        }
        Ok(())
    }
}

fn require_in_range(time: i32, stop_index: usize) -> Result<()> {
    if (MIN_TIME..=MAX_TIME).contains(&time) {
        Ok(())
    } else {
        Err(TransitError::TimeOutOfRange { time, stop_index })
    }
}

/// Builder for [`ScheduledTripTimes`]. Arrays are interned through the
/// deduplicator as they are set, when one is given.
pub struct ScheduledTripTimesBuilder<'a> {
    deduplicator: Option<&'a Deduplicator>,
    time_shift: i32,
    service_code: Option<u32>,
    arrival_times: Option<Arc<[i32]>>,
    departure_times: Option<Arc<[i32]>>,
    timepoints: Option<Arc<FixedBitSet>>,
    trip: Option<Arc<Trip>>,
    pickup_booking_infos: Option<Arc<[Option<BookingInfo>]>>,
    drop_off_booking_infos: Option<Arc<[Option<BookingInfo>]>>,
    headsigns: Option<Arc<[Option<Arc<str>>]>>,
    original_stop_sequence: Option<Arc<[u32]>>,
}

impl<'a> ScheduledTripTimesBuilder<'a> {
    pub fn new(deduplicator: Option<&'a Deduplicator>) -> Self {
        Self {
            deduplicator,
            time_shift: 0,
            service_code: None,
            arrival_times: None,
            departure_times: None,
            timepoints: None,
            trip: None,
            pickup_booking_infos: None,
            drop_off_booking_infos: None,
            headsigns: None,
            original_stop_sequence: None,
        }
    }

    #[must_use]
    pub fn with_trip(mut self, trip: Arc<Trip>) -> Self {
        self.trip = Some(trip);
        self
    }

    #[must_use]
    pub fn with_time_shift(mut self, time_shift: i32) -> Self {
        self.time_shift = time_shift;
        self
    }

    #[must_use]
    pub fn with_service_code(mut self, service_code: u32) -> Self {
        self.service_code = Some(service_code);
        self
    }

    #[must_use]
    pub fn with_arrival_times(mut self, times: &[i32]) -> Self {
        self.arrival_times = Some(self.int_array(times));
        self
    }

    #[must_use]
    pub fn with_departure_times(mut self, times: &[i32]) -> Self {
        self.departure_times = Some(self.int_array(times));
        self
    }

    #[must_use]
    pub fn with_timepoints(mut self, timepoints: &FixedBitSet) -> Self {
        self.timepoints = Some(match self.deduplicator {
            Some(dedup) => dedup.deduplicate_bit_set(timepoints),
            None => Arc::new(timepoints.clone()),
        });
        self
    }

    #[must_use]
    pub fn with_pickup_booking_infos(mut self, infos: Vec<Option<BookingInfo>>) -> Self {
        self.pickup_booking_infos = Some(infos.into());
        self
    }

    #[must_use]
    pub fn with_drop_off_booking_infos(mut self, infos: Vec<Option<BookingInfo>>) -> Self {
        self.drop_off_booking_infos = Some(infos.into());
        self
    }

    #[must_use]
    pub fn with_headsigns(mut self, headsigns: Vec<Option<Arc<str>>>) -> Self {
        let headsigns: Vec<Option<Arc<str>>> = match self.deduplicator {
            Some(dedup) => headsigns
                .into_iter()
                .map(|headsign| headsign.map(|h| dedup.deduplicate_string(&h)))
                .collect(),
            None => headsigns,
        };
        self.headsigns = Some(headsigns.into());
        self
    }

    #[must_use]
    pub fn with_original_stop_sequence(mut self, sequence: &[u32]) -> Self {
        self.original_stop_sequence = Some(match self.deduplicator {
            Some(dedup) => dedup.deduplicate_sequence_array(sequence),
            None => Arc::from(sequence),
        });
        self
    }

    fn int_array(&self, values: &[i32]) -> Arc<[i32]> {
        match self.deduplicator {
            Some(dedup) => dedup.deduplicate_int_array(values),
            None => Arc::from(values),
        }
    }

    pub fn build(self) -> Result<ScheduledTripTimes> {
        let trip = self
            .trip
            .ok_or_else(|| TransitError::InvalidData("scheduled trip times without a trip".into()))?;
        let missing = |field: &str| TransitError::InvalidData(format!("trip {} has no {field}", trip.id));

        let arrival_times = self.arrival_times.ok_or_else(|| missing("arrival times"))?;
        let departure_times = self.departure_times.ok_or_else(|| missing("departure times"))?;
        let num_stops = arrival_times.len();
        if num_stops == 0 {
            return Err(missing("stops"));
        }

        let timepoints = self.timepoints.unwrap_or_else(|| {
            let mut all = FixedBitSet::with_capacity(num_stops);
            all.insert_range(..);
            Arc::new(all)
        });
        let pickup_booking_infos = self
            .pickup_booking_infos
            .unwrap_or_else(|| vec![None; num_stops].into());
        let drop_off_booking_infos = self
            .drop_off_booking_infos
            .unwrap_or_else(|| vec![None; num_stops].into());

        let lengths_match = departure_times.len() == num_stops
            && timepoints.len() == num_stops
            && pickup_booking_infos.len() == num_stops
            && drop_off_booking_infos.len() == num_stops
            && self.headsigns.as_ref().map_or(true, |h| h.len() == num_stops)
            && self.original_stop_sequence.as_ref().map_or(true, |s| s.len() == num_stops);
        if !lengths_match {
            return Err(TransitError::InvalidData(format!(
                "per-stop arrays of trip {} differ in length",
                trip.id
            )));
        }

        let times = ScheduledTripTimes {
            time_shift: self.time_shift,
            service_code: self.service_code,
            arrival_times,
            departure_times,
            timepoints,
            trip,
            pickup_booking_infos,
            drop_off_booking_infos,
            headsigns: self.headsigns,
            original_stop_sequence: self.original_stop_sequence,
        };
        times.validate()?;
        Ok(times)
    }
}
