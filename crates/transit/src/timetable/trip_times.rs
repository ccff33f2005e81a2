//! Real-time view of one trip: scheduled times plus a lazily created
//! overlay of updated values.

use std::sync::Arc;

use crate::models::entities::{StopTime, Trip};
use crate::models::types::{
    Accessibility, BookingInfo, OccupancyStatus, RealTimeState, Result, StopRealTimeState, TransitError,
};
use crate::timetable::deduplicator::Deduplicator;
use crate::timetable::scheduled::ScheduledTripTimes;
use crate::timetable::validation::{ErrorCode, ValidationError};

/// Arrival and departure times of a single trip in a timetable, in seconds
/// after midnight of the service day.
///
/// Until the first real-time mutation every read goes straight to the
/// shared [`ScheduledTripTimes`]. The first mutating call copies the
/// scheduled values into an overlay and flips the state to
/// [`RealTimeState::Updated`].
#[derive(Clone, Debug)]
pub struct TripTimes {
    scheduled: Arc<ScheduledTripTimes>,
    real_time_state: RealTimeState,
    wheelchair_accessibility: Accessibility,
    overlay: Option<Box<RealTimeOverlay>>,
}

#[derive(Clone, Debug)]
struct RealTimeOverlay {
    arrival_times: Vec<i32>,
    departure_times: Vec<i32>,
    stop_states: Vec<StopRealTimeState>,
    headsigns: Vec<Option<Arc<str>>>,
    occupancy: Vec<OccupancyStatus>,
}

impl TripTimes {
    pub fn new(scheduled: Arc<ScheduledTripTimes>) -> Self {
        let wheelchair_accessibility = scheduled.wheelchair_accessibility();
        Self {
            scheduled,
            real_time_state: RealTimeState::Scheduled,
            wheelchair_accessibility,
            overlay: None,
        }
    }

    pub fn from_stop_times(
        trip: Arc<Trip>,
        stop_times: &[StopTime],
        deduplicator: Option<&Deduplicator>,
    ) -> Result<Self> {
        ScheduledTripTimes::from_stop_times(trip, stop_times, deduplicator)
            .map(|scheduled| Self::new(Arc::new(scheduled)))
    }

    /// A copy with the same trip-level state but none of the updated times.
    pub fn copy_of_scheduled_times(&self) -> Self {
        Self {
            scheduled: self.scheduled.clone(),
            real_time_state: self.real_time_state,
            wheelchair_accessibility: self.wheelchair_accessibility,
            overlay: None,
        }
    }

    pub fn scheduled(&self) -> &Arc<ScheduledTripTimes> {
        &self.scheduled
    }

    pub fn trip(&self) -> &Arc<Trip> {
        self.scheduled.trip()
    }

    pub fn num_stops(&self) -> usize {
        self.scheduled.num_stops()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    // ---- Times ----

    pub fn scheduled_arrival_time(&self, stop: usize) -> i32 {
        self.scheduled.scheduled_arrival_time(stop)
    }

    pub fn scheduled_departure_time(&self, stop: usize) -> i32 {
        self.scheduled.scheduled_departure_time(stop)
    }

    pub fn arrival_time(&self, stop: usize) -> i32 {
        match &self.overlay {
            Some(overlay) => overlay.arrival_times[stop],
            None => self.scheduled.scheduled_arrival_time(stop),
        }
    }

    pub fn departure_time(&self, stop: usize) -> i32 {
        match &self.overlay {
            Some(overlay) => overlay.departure_times[stop],
            None => self.scheduled.scheduled_departure_time(stop),
        }
    }

    pub fn arrival_delay(&self, stop: usize) -> i32 {
        self.arrival_time(stop) - self.scheduled_arrival_time(stop)
    }

    pub fn departure_delay(&self, stop: usize) -> i32 {
        self.departure_time(stop) - self.scheduled_departure_time(stop)
    }

    /// Key for ordering trips within a timetable: the first departure.
    /// Trips on one pattern are assumed never to overtake each other.
    pub fn sort_index(&self) -> i32 {
        self.departure_time(0)
    }

    pub fn update_arrival_time(&mut self, stop: usize, time: i32) {
        self.prepare_for_real_time_updates().arrival_times[stop] = time;
    }

    pub fn update_arrival_delay(&mut self, stop: usize, delay: i32) {
        let time = self.scheduled_arrival_time(stop).saturating_add(delay);
        self.update_arrival_time(stop, time);
    }

    pub fn update_departure_time(&mut self, stop: usize, time: i32) {
        self.prepare_for_real_time_updates().departure_times[stop] = time;
    }

    pub fn update_departure_delay(&mut self, stop: usize, delay: i32) {
        let time = self.scheduled_departure_time(stop).saturating_add(delay);
        self.update_departure_time(stop, time);
    }

    // ---- Per-stop state ----

    pub fn stop_real_time_state(&self, stop: usize) -> StopRealTimeState {
        self.overlay
            .as_ref()
            .map_or(StopRealTimeState::Default, |overlay| overlay.stop_states[stop])
    }

    pub fn set_recorded(&mut self, stop: usize) {
        self.set_stop_real_time_state(stop, StopRealTimeState::Recorded);
    }

    pub fn set_cancelled(&mut self, stop: usize) {
        self.set_stop_real_time_state(stop, StopRealTimeState::Cancelled);
    }

    pub fn set_no_data(&mut self, stop: usize) {
        self.set_stop_real_time_state(stop, StopRealTimeState::NoData);
    }

    pub fn set_prediction_inaccurate(&mut self, stop: usize) {
        self.set_stop_real_time_state(stop, StopRealTimeState::InaccuratePredictions);
    }

    pub fn is_recorded_stop(&self, stop: usize) -> bool {
        self.stop_real_time_state(stop) == StopRealTimeState::Recorded
    }

    pub fn is_cancelled_stop(&self, stop: usize) -> bool {
        self.stop_real_time_state(stop) == StopRealTimeState::Cancelled
    }

    pub fn is_no_data_stop(&self, stop: usize) -> bool {
        self.stop_real_time_state(stop) == StopRealTimeState::NoData
    }

    pub fn is_prediction_inaccurate(&self, stop: usize) -> bool {
        self.stop_real_time_state(stop) == StopRealTimeState::InaccuratePredictions
    }

    fn set_stop_real_time_state(&mut self, stop: usize, state: StopRealTimeState) {
        self.prepare_for_real_time_updates().stop_states[stop] = state;
    }

    /// Display only; routing never reads occupancy.
    pub fn occupancy_status(&self, stop: usize) -> OccupancyStatus {
        self.overlay
            .as_ref()
            .map_or(OccupancyStatus::NoDataAvailable, |overlay| overlay.occupancy[stop])
    }

    pub fn set_occupancy_status(&mut self, stop: usize, status: OccupancyStatus) {
        self.prepare_for_real_time_updates().occupancy[stop] = status;
    }

    pub fn headsign(&self, stop: usize) -> Option<&Arc<str>> {
        self.overlay
            .as_ref()
            .and_then(|overlay| overlay.headsigns[stop].as_ref())
            .or_else(|| self.scheduled.headsign(stop))
    }

    pub fn trip_headsign(&self) -> Option<&Arc<str>> {
        self.scheduled.trip_headsign()
    }

    pub fn set_headsign(&mut self, stop: usize, headsign: Arc<str>) {
        if self.overlay.is_none() && self.scheduled.headsign(stop) == Some(&headsign) {
            return;
        }
        self.prepare_for_real_time_updates().headsigns[stop] = Some(headsign);
    }

    // ---- Pass-through schedule data ----

    pub fn pickup_booking_info(&self, stop: usize) -> Option<&BookingInfo> {
        self.scheduled.pickup_booking_info(stop)
    }

    pub fn drop_off_booking_info(&self, stop: usize) -> Option<&BookingInfo> {
        self.scheduled.drop_off_booking_info(stop)
    }

    pub fn is_timepoint(&self, stop: usize) -> bool {
        self.scheduled.is_timepoint(stop)
    }

    pub fn gtfs_sequence_of_stop_index(&self, stop: usize) -> Option<u32> {
        self.scheduled.gtfs_sequence_of_stop_index(stop)
    }

    pub fn stop_index_of_gtfs_sequence(&self, sequence: u32) -> Option<usize> {
        self.scheduled.stop_index_of_gtfs_sequence(sequence)
    }

    pub fn service_code(&self) -> Option<u32> {
        self.scheduled.service_code()
    }

    pub fn set_service_code(&mut self, service_code: u32) {
        if self.scheduled.service_code() != Some(service_code) {
            Arc::make_mut(&mut self.scheduled).set_service_code(service_code);
        }
    }

    // ---- Trip-level state ----

    pub fn real_time_state(&self) -> RealTimeState {
        self.real_time_state
    }

    pub fn set_real_time_state(&mut self, state: RealTimeState) {
        self.real_time_state = state;
    }

    /// True for an unmodified trip from the published timetable.
    pub fn is_scheduled(&self) -> bool {
        self.real_time_state == RealTimeState::Scheduled
    }

    pub fn is_canceled(&self) -> bool {
        self.real_time_state == RealTimeState::Canceled
    }

    /// Soft-deleted trips stay in the data but are hidden from users.
    pub fn is_deleted(&self) -> bool {
        self.real_time_state == RealTimeState::Deleted
    }

    pub fn is_canceled_or_deleted(&self) -> bool {
        self.is_canceled() || self.is_deleted()
    }

    pub fn cancel_trip(&mut self) {
        self.real_time_state = RealTimeState::Canceled;
    }

    pub fn delete_trip(&mut self) {
        self.real_time_state = RealTimeState::Deleted;
    }

    pub fn wheelchair_accessibility(&self) -> Accessibility {
        self.wheelchair_accessibility
    }

    pub fn update_wheelchair_accessibility(&mut self, accessibility: Accessibility) {
        self.wheelchair_accessibility = accessibility;
    }

    // ---- Validation and propagation ----

    /// Check that no stop is departed before it is reached and no stop is
    /// reached before the previous one was left. Every stop is checked,
    /// including the first arrival and the last departure.
    pub fn validate_non_increasing_times(&self) -> std::result::Result<(), ValidationError> {
        let mut previous_departure = i32::MIN;
        for stop in 0..self.num_stops() {
            let arrival = self.arrival_time(stop);
            let departure = self.departure_time(stop);
            if departure < arrival {
                return Err(ValidationError::new(ErrorCode::NegativeDwellTime, stop));
            }
            if previous_departure > arrival {
                return Err(ValidationError::new(ErrorCode::NegativeHopTime, stop));
            }
            previous_departure = departure;
        }
        Ok(())
    }

    /// Give every stop before `first_updated` the delay of the first updated
    /// stop. An update carrying only a departure delay at that stop also
    /// delays its arrival, and one carrying only an arrival delay also delays
    /// its departure when it would otherwise leave before arriving.
    ///
    /// Returns true if any time changed.
    pub fn adjust_times_before_always(&mut self, first_updated: usize) -> bool {
        let mut adjusted = false;
        if self.arrival_delay(first_updated) == 0 {
            let departure_delay = self.departure_delay(first_updated);
            if departure_delay != 0 {
                self.update_arrival_delay(first_updated, departure_delay);
                adjusted = true;
            }
        }

        let delay = self.arrival_delay(first_updated);
        if delay == 0 {
            return false;
        }
        if self.departure_time(first_updated) < self.arrival_time(first_updated) {
            self.update_departure_delay(first_updated, delay);
        }

        for stop in (0..first_updated).rev() {
            self.update_departure_delay(stop, delay);
            self.update_arrival_delay(stop, delay);
            adjusted = true;
        }
        adjusted
    }

    /// Propagate the delay of the first updated stop backwards only as far as
    /// needed to keep times increasing. With `set_no_data` every earlier stop
    /// that is not cancelled is flagged as having no real-time data.
    ///
    /// Returns true if any time changed.
    pub fn adjust_times_before_when_required(&mut self, first_updated: usize, set_no_data: bool) -> bool {
        if self.arrival_time(first_updated) > self.departure_time(first_updated) {
            // Broken input at the updated stop itself is left to validation.
            return false;
        }

        let mut next_arrival = self.arrival_time(first_updated);
        let delay = self.arrival_delay(first_updated);
        let mut adjusted = false;
        let mut adjust_times = true;

        for stop in (0..first_updated).rev() {
            if set_no_data && !self.is_cancelled_stop(stop) {
                self.set_no_data(stop);
            }
            if !adjust_times {
                continue;
            }
            if self.departure_time(stop) < next_arrival {
                adjust_times = false;
                continue;
            }
            adjusted = true;
            self.update_departure_delay(stop, delay);

            if self.arrival_time(stop) < self.departure_time(stop) {
                adjust_times = false;
            } else {
                self.update_arrival_delay(stop, delay);
                next_arrival = self.arrival_time(stop);
            }
        }
        adjusted
    }

    // ---- Derived copies ----

    /// A copy in which the vehicle passes `stop` at `time`, arriving or
    /// departing. Only the schedule can be shifted, so this returns `None`
    /// once real-time times exist.
    pub fn time_shift(&self, stop: usize, time: i32, depart: bool) -> Result<Option<Self>> {
        if self.overlay.is_some() {
            return Ok(None);
        }
        let current = if depart { self.departure_time(stop) } else { self.arrival_time(stop) };
        self.shifted(time - current).map(Some)
    }

    /// Shift every time by `shift` seconds, for moving a trip into another
    /// time zone. Returns `None` once real-time times exist.
    pub fn adjust_times_to_time_zone(&self, shift: i32) -> Result<Option<Self>> {
        if self.overlay.is_some() {
            return Ok(None);
        }
        self.shifted(shift).map(Some)
    }

    fn shifted(&self, shift: i32) -> Result<Self> {
        let scheduled = self
            .scheduled
            .copy_of(None)
            .with_time_shift(self.scheduled.time_shift() + shift)
            .build()?;
        Ok(Self {
            scheduled: Arc::new(scheduled),
            real_time_state: self.real_time_state,
            wheelchair_accessibility: self.wheelchair_accessibility,
            overlay: None,
        })
    }

    /// A copy without the stops at `removed` (ascending indices), keeping the
    /// real-time values of the remaining stops.
    pub fn without_stops(&self, removed: &[usize]) -> Result<Self> {
        let kept: Vec<usize> = (0..self.num_stops()).filter(|stop| !removed.contains(stop)).collect();
        if kept.len() < 2 {
            return Err(TransitError::InvalidData(format!(
                "trip {} would keep fewer than two stops",
                self.trip().id
            )));
        }

        let scheduled = Arc::new(self.scheduled.select_stops(&kept)?);
        let overlay = self.overlay.as_ref().map(|overlay| {
            Box::new(RealTimeOverlay {
                arrival_times: kept.iter().map(|&i| overlay.arrival_times[i]).collect(),
                departure_times: kept.iter().map(|&i| overlay.departure_times[i]).collect(),
                stop_states: kept.iter().map(|&i| overlay.stop_states[i]).collect(),
                headsigns: kept.iter().map(|&i| overlay.headsigns[i].clone()).collect(),
                occupancy: kept.iter().map(|&i| overlay.occupancy[i]).collect(),
            })
        });
        Ok(Self {
            scheduled,
            real_time_state: self.real_time_state,
            wheelchair_accessibility: self.wheelchair_accessibility,
            overlay,
        })
    }

    fn prepare_for_real_time_updates(&mut self) -> &mut RealTimeOverlay {
        let scheduled = &self.scheduled;
        let real_time_state = &mut self.real_time_state;
        self.overlay.get_or_insert_with(|| {
            *real_time_state = RealTimeState::Updated;
            let num_stops = scheduled.num_stops();
            Box::new(RealTimeOverlay {
                arrival_times: scheduled.copy_arrival_times(),
                departure_times: scheduled.copy_departure_times(),
                stop_states: vec![StopRealTimeState::Default; num_stops],
                headsigns: scheduled.copy_headsigns(),
                occupancy: vec![OccupancyStatus::NoDataAvailable; num_stops],
            })
        })
    }
}
