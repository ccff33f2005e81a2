//! Reasons a single trip update is rejected.

use chrono::NaiveDate;

use crate::identifiers::*;
use crate::models::types::TransitError;
use crate::realtime::update::ScheduleRelationship;
use crate::timetable::ValidationError;

/// Why a single trip update was rejected. A rejected update leaves the
/// buffer untouched; the rest of the batch is still applied.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("missing trip descriptor")]
    MissingTripDescriptor,

    #[error("no trip id found")]
    MissingTripId,

    #[error("failed to parse start date {0:?}")]
    InvalidStartDate(String),

    #[error("{0} trip has no start date")]
    MissingStartDate(ScheduleRelationship),

    #[error("no pattern found for trip")]
    PatternNotFound,

    #[error("trip is not in the timetable of its pattern")]
    TripNotInPattern,

    #[error("trip update contains no stop time updates")]
    NoStopTimeUpdates,

    #[error("{0} trip has fewer than two stops")]
    TooFewStops(ScheduleRelationship),

    #[error("skipped stops leave fewer than two stops")]
    TooFewRemainingStops,

    #[error("schedule already contains the trip id of an added trip")]
    TripAlreadyExists,

    #[error("schedule does not contain the trip id of a replacement trip")]
    TripNotFound,

    #[error("no service runs on {0}")]
    NoServiceOnDate(NaiveDate),

    #[error("trip does not run on {0}")]
    ServiceNotActive(NaiveDate),

    #[error("no service code for service {0}")]
    UnknownServiceCode(ServiceIdentifier),

    #[error("unknown stop id {0}")]
    UnknownStop(StopIdentifier),

    #[error("missing stop id at stop time update index {0}")]
    MissingStopId(usize),

    #[error("decreasing stop sequence at stop time update index {0}")]
    DecreasingStopSequence(usize),

    #[error("decreasing times at stop time update index {0}")]
    DecreasingTimes(usize),

    #[error("missing arrival time at stop time update index {0}")]
    MissingArrivalTime(usize),

    #[error("missing departure time at stop time update index {0}")]
    MissingDepartureTime(usize),

    #[error("time {time}s at stop index {index} is outside the service day")]
    TimeOutOfRange { index: usize, time: i64 },

    #[error("stop time update for stop index {0} has neither time nor delay")]
    EmptyStopTimeEvent(usize),

    #[error("{0} stop time updates do not match any stop of the trip")]
    UnmatchedStopTimeUpdates(usize),

    #[error("{0} has no local noon in the configured time zone")]
    InvalidServiceDay(NaiveDate),

    #[error("invalid trip times: {0}")]
    InvalidTripTimes(#[from] ValidationError),

    #[error("invalid schedule data: {0}")]
    Schedule(#[from] TransitError),

    #[error("no scheduled or previously added trip to cancel")]
    NothingToCancel,

    #[error("unscheduled trips are not supported")]
    UnscheduledUnsupported,
}
