//! Applying the stop-time updates of a SCHEDULED trip update to the trip's
//! scheduled times.

use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

use crate::realtime::config::BackwardsDelayPropagationType;
use crate::realtime::error::UpdateError;
use crate::realtime::update::{StopScheduleRelationship, StopTimeEvent, StopTimeUpdate, TripUpdate};
use crate::timetable::{StopPattern, Timetable, TripTimes, MAX_TIME, MIN_TIME};

/// Updated times of one trip, plus the stops the vehicle no longer serves.
#[derive(Clone, Debug)]
pub struct TripTimesPatch {
    pub trip_times: TripTimes,
    /// Ascending stop indices marked SKIPPED by the update.
    pub skipped_stop_indices: Vec<usize>,
}

/// Epoch seconds of the start of the service day `date`: local noon minus
/// twelve hours, which stays correct on days with a daylight saving change.
pub(crate) fn service_day_start(date: NaiveDate, timezone: Tz) -> Result<i64, UpdateError> {
    let noon = date
        .and_hms_opt(12, 0, 0)
        .ok_or(UpdateError::InvalidServiceDay(date))?;
    let local_noon = timezone
        .from_local_datetime(&noon)
        .earliest()
        .ok_or(UpdateError::InvalidServiceDay(date))?;
    Ok(local_noon.timestamp() - 12 * 60 * 60)
}

impl Timetable {
    /// Build new trip times for the trip of `update` from the scheduled
    /// times in this timetable.
    ///
    /// Stop-time updates are matched to stops in order, by stop sequence if
    /// they carry one and by stop id otherwise. Stops after an update keep
    /// its delay; stops before the first update are handled according to
    /// `propagation`. Updates left over after the last stop reject the
    /// whole trip update.
    pub fn create_updated_trip_times(
        &self,
        stop_pattern: &StopPattern,
        update: &TripUpdate,
        timezone: Tz,
        service_date: NaiveDate,
        propagation: BackwardsDelayPropagationType,
    ) -> Result<TripTimesPatch, UpdateError> {
        let trip_id = update.trip_id().ok_or(UpdateError::MissingTripId)?;
        let scheduled = self
            .trip_times_for(trip_id)
            .ok_or(UpdateError::TripNotInPattern)?;
        if update.stop_time_updates.is_empty() {
            return Err(UpdateError::NoStopTimeUpdates);
        }

        let mut times = scheduled.copy_of_scheduled_times();
        let midnight = service_day_start(service_date, timezone)?;
        let mut skipped_stop_indices = Vec::new();
        let mut delay: Option<i32> = None;
        let mut first_updated: Option<usize> = None;
        let mut updates = update.stop_time_updates.iter().peekable();

        for stop in 0..times.num_stops() {
            let matched = updates.next_if(|stop_time_update| match stop_time_update.stop_sequence {
                Some(sequence) => times.gtfs_sequence_of_stop_index(stop) == Some(sequence),
                None => stop_time_update
                    .stop_id
                    .as_ref()
                    .is_some_and(|stop_id| &stop_pattern.stop(stop).id == stop_id),
            });

            let Some(stop_time_update) = matched else {
                if let Some(delay) = delay {
                    times.update_arrival_delay(stop, delay);
                    times.update_departure_delay(stop, delay);
                }
                continue;
            };

            match stop_time_update.schedule_relationship {
                StopScheduleRelationship::Skipped => {
                    times.set_cancelled(stop);
                    if let Some(delay) = delay {
                        times.update_arrival_delay(stop, delay);
                        times.update_departure_delay(stop, delay);
                    }
                    skipped_stop_indices.push(stop);
                }
                StopScheduleRelationship::NoData => {
                    times.set_no_data(stop);
                    times.update_arrival_delay(stop, 0);
                    times.update_departure_delay(stop, 0);
                    delay = Some(0);
                }
                StopScheduleRelationship::Scheduled => {
                    if stop_time_update.arrival.is_none() && stop_time_update.departure.is_none() {
                        if let Some(delay) = delay {
                            times.update_arrival_delay(stop, delay);
                            times.update_departure_delay(stop, delay);
                        }
                        continue;
                    }
                    first_updated.get_or_insert(stop);
                    apply_stop_time_update(&mut times, stop, stop_time_update, midnight, &mut delay)?;
                }
            }
        }

        let unmatched = updates.count();
        if unmatched > 0 {
            debug!(trip_id = %trip_id, unmatched, "part of the trip update could not be applied");
            return Err(UpdateError::UnmatchedStopTimeUpdates(unmatched));
        }

        if let Some(first_updated) = first_updated.filter(|&index| index > 0) {
            let adjusted = match propagation {
                BackwardsDelayPropagationType::RequiredNoData => {
                    times.adjust_times_before_when_required(first_updated, true)
                }
                BackwardsDelayPropagationType::Required => {
                    times.adjust_times_before_when_required(first_updated, false)
                }
                BackwardsDelayPropagationType::Always => times.adjust_times_before_always(first_updated),
            };
            if adjusted {
                debug!(trip_id = %trip_id, first_updated, "propagated delay to earlier stops");
            }
        }

        for stop in 0..times.num_stops() {
            for time in [times.arrival_time(stop), times.departure_time(stop)] {
                time_of_service_day(i64::from(time), stop, midnight)?;
            }
        }
        times.validate_non_increasing_times()?;
        Ok(TripTimesPatch {
            trip_times: times,
            skipped_stop_indices,
        })
    }
}

fn apply_stop_time_update(
    times: &mut TripTimes,
    stop: usize,
    update: &StopTimeUpdate,
    midnight: i64,
    delay: &mut Option<i32>,
) -> Result<(), UpdateError> {
    match update.arrival {
        Some(event) => {
            let (time, event_delay) = resolve_event(event, stop, midnight, times.scheduled_arrival_time(stop))?;
            times.update_arrival_time(stop, time);
            *delay = Some(event_delay);
        }
        None => {
            if let Some(delay) = *delay {
                times.update_arrival_delay(stop, delay);
            }
        }
    }

    match update.departure {
        Some(event) => {
            let (time, event_delay) =
                resolve_event(event, stop, midnight, times.scheduled_departure_time(stop))?;
            times.update_departure_time(stop, time);
            *delay = Some(event_delay);
        }
        None => {
            if let Some(delay) = *delay {
                times.update_departure_delay(stop, delay);
            }
        }
    }
    Ok(())
}

/// Time after midnight and running delay for one event. The absolute time
/// wins for the stored value; the delay is the event's own if it has one.
fn resolve_event(event: StopTimeEvent, stop: usize, midnight: i64, scheduled: i32) -> Result<(i32, i32), UpdateError> {
    let seconds = match (event.time, event.delay) {
        (Some(time), _) => time.saturating_sub(midnight),
        (None, Some(delay)) => i64::from(scheduled) + i64::from(delay),
        (None, None) => return Err(UpdateError::EmptyStopTimeEvent(stop)),
    };
    let time = time_of_service_day(seconds, stop, midnight)?;
    let delay = match event.delay {
        Some(delay) => {
            // The delay is carried on to later stops, so it must stay within a service day too.
            time_of_service_day(i64::from(scheduled) + i64::from(delay), stop, midnight)?;
            delay
        }
        None => time - scheduled,
    };
    Ok((time, delay))
}

/// `seconds` after the start of the service day as a trip time, rejected
/// outside `MIN_TIME..=MAX_TIME`.
fn time_of_service_day(seconds: i64, stop: usize, midnight: i64) -> Result<i32, UpdateError> {
    i32::try_from(seconds)
        .ok()
        .filter(|seconds| (MIN_TIME..=MAX_TIME).contains(seconds))
        .ok_or(UpdateError::TimeOutOfRange {
            index: stop,
            time: midnight.saturating_add(seconds),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fixtures::{stop_times, test_trip};
    use crate::realtime::update::TripDescriptor;
    use crate::timetable::{ErrorCode, ValidationError};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn midnight() -> i64 {
        service_day_start(date(), Tz::UTC).unwrap()
    }

    fn setup() -> (Timetable, StopPattern) {
        let stop_times = stop_times(&[("A", 0, 0), ("B", 60, 60), ("C", 120, 120)]);
        let times = TripTimes::from_stop_times(test_trip("T1"), &stop_times, None).unwrap();
        (Timetable::new(vec![Arc::new(times)]), StopPattern::from_stop_times(&stop_times))
    }

    fn update(stop_time_updates: Vec<StopTimeUpdate>) -> TripUpdate {
        TripUpdate::new(TripDescriptor::new("T1")).with_stop_time_updates(stop_time_updates)
    }

    #[test]
    fn test_service_day_start() {
        assert_eq!(midnight(), 1_709_251_200);

        // Spring forward in Oslo: local noon is 10:00 UTC, the day starts 22:00 UTC the day before.
        let dst = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let start = service_day_start(dst, chrono_tz::Europe::Oslo).unwrap();
        assert_eq!(start, 1_711_836_000);
    }

    #[test]
    fn test_forward_and_backward_propagation() {
        let (timetable, pattern) = setup();
        let patch = timetable
            .create_updated_trip_times(
                &pattern,
                &update(vec![StopTimeUpdate::for_stop("B").with_arrival_delay(30)]),
                Tz::UTC,
                date(),
                BackwardsDelayPropagationType::Always,
            )
            .unwrap();

        let times = patch.trip_times;
        assert_eq!(times.departure_delay(0), 30);
        assert_eq!(times.arrival_time(1), 90);
        assert_eq!(times.departure_time(1), 90);
        assert_eq!(times.arrival_time(2), 150);
        assert!(patch.skipped_stop_indices.is_empty());
    }

    #[test]
    fn test_absolute_times_and_sequence_matching() {
        let (timetable, pattern) = setup();
        let patch = timetable
            .create_updated_trip_times(
                &pattern,
                &update(vec![
                    StopTimeUpdate::for_sequence(2).with_arrival_time(midnight() + 100),
                    StopTimeUpdate::for_sequence(3).with_arrival_time(midnight() + 110),
                ]),
                Tz::UTC,
                date(),
                BackwardsDelayPropagationType::Required,
            )
            .unwrap();

        let times = patch.trip_times;
        assert_eq!(times.arrival_time(1), 100);
        assert_eq!(times.departure_time(1), 100);
        assert_eq!(times.arrival_time(2), 110);
        assert_eq!(times.departure_time(0), 0);
        assert!(!times.is_no_data_stop(0));
    }

    #[test]
    fn test_skipped_and_no_data() {
        let (timetable, pattern) = setup();
        let patch = timetable
            .create_updated_trip_times(
                &pattern,
                &update(vec![
                    StopTimeUpdate::for_stop("A").with_departure_delay(20),
                    StopTimeUpdate::for_stop("B").skipped(),
                    StopTimeUpdate::for_stop("C").no_data(),
                ]),
                Tz::UTC,
                date(),
                BackwardsDelayPropagationType::RequiredNoData,
            )
            .unwrap();

        assert_eq!(patch.skipped_stop_indices, vec![1]);
        let times = patch.trip_times;
        assert!(times.is_cancelled_stop(1));
        assert_eq!(times.arrival_delay(1), 20);
        assert!(times.is_no_data_stop(2));
        assert_eq!(times.arrival_delay(2), 0);
    }

    #[test]
    fn test_unmatched_updates_reject() {
        let (timetable, pattern) = setup();
        let result = timetable.create_updated_trip_times(
            &pattern,
            &update(vec![
                StopTimeUpdate::for_stop("C").with_arrival_delay(10),
                StopTimeUpdate::for_stop("A").with_arrival_delay(10),
            ]),
            Tz::UTC,
            date(),
            BackwardsDelayPropagationType::Always,
        );
        assert!(matches!(result, Err(UpdateError::UnmatchedStopTimeUpdates(1))));
    }

    #[test]
    fn test_invalid_times_reject() {
        let (timetable, pattern) = setup();
        let result = timetable.create_updated_trip_times(
            &pattern,
            &update(vec![
                StopTimeUpdate::for_stop("B").with_arrival_delay(100),
                StopTimeUpdate::for_stop("C").with_arrival_delay(-50),
            ]),
            Tz::UTC,
            date(),
            BackwardsDelayPropagationType::Required,
        );
        assert!(matches!(
            result,
            Err(UpdateError::InvalidTripTimes(ValidationError {
                code: ErrorCode::NegativeHopTime,
                stop_index: 2
            }))
        ));
    }

    #[test]
    fn test_unknown_trip_and_empty_event() {
        let (timetable, pattern) = setup();
        let other = TripUpdate::new(TripDescriptor::new("T9"))
            .with_stop_time_update(StopTimeUpdate::for_stop("A").with_arrival_delay(1));
        assert!(matches!(
            timetable.create_updated_trip_times(&pattern, &other, Tz::UTC, date(), Default::default()),
            Err(UpdateError::TripNotInPattern)
        ));

        let empty_event = update(vec![StopTimeUpdate::for_stop("B").with_arrival(StopTimeEvent::default())]);
        assert!(matches!(
            timetable.create_updated_trip_times(&pattern, &empty_event, Tz::UTC, date(), Default::default()),
            Err(UpdateError::EmptyStopTimeEvent(1))
        ));
    }

    #[test]
    fn test_times_outside_service_day_reject() {
        let (timetable, pattern) = setup();
        let patch = |update_for_b: StopTimeUpdate| {
            timetable.create_updated_trip_times(
                &pattern,
                &update(vec![update_for_b]),
                Tz::UTC,
                date(),
                BackwardsDelayPropagationType::RequiredNoData,
            )
        };
        let forty_years = 40 * 365 * 24 * 60 * 60;

        assert!(matches!(
            patch(StopTimeUpdate::for_stop("B").with_arrival_delay(i32::MAX)),
            Err(UpdateError::TimeOutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            patch(StopTimeUpdate::for_stop("B").with_arrival_delay(i32::MIN)),
            Err(UpdateError::TimeOutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            patch(StopTimeUpdate::for_stop("B").with_arrival_time(midnight() + forty_years)),
            Err(UpdateError::TimeOutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            patch(StopTimeUpdate::for_stop("B").with_arrival_time(i64::MIN)),
            Err(UpdateError::TimeOutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            patch(StopTimeUpdate::for_stop("B").with_arrival(StopTimeEvent {
                time: Some(midnight() + 90),
                delay: Some(i32::MAX),
            })),
            Err(UpdateError::TimeOutOfRange { index: 1, .. })
        ));

        // In range at B, carried past the last allowed time at C
        assert!(matches!(
            patch(StopTimeUpdate::for_stop("B").with_arrival_delay(MAX_TIME - 60)),
            Err(UpdateError::TimeOutOfRange { index: 2, .. })
        ));
        assert!(patch(StopTimeUpdate::for_stop("B").with_arrival_delay(MAX_TIME - 120)).is_ok());
    }
}
