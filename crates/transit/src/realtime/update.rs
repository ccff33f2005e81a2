//! Decoded trip-update records, as delivered by a feed decoder.
//!
//! These mirror the GTFS-realtime `TripUpdate` message closely enough that
//! a protobuf decoder can fill them field by field, but carry no wire-format
//! dependency themselves.

use std::fmt;

use chrono::NaiveDate;

use crate::identifiers::*;

/// How a trip update should be interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ScheduleRelationship {
    /// Real-time times for a trip of the static schedule
    #[default]
    Scheduled,
    /// A trip that is not in the static schedule
    Added,
    /// A trip running without a schedule
    Unscheduled,
    Canceled,
    /// A scheduled trip whose stops are replaced as a whole
    Replacement,
    /// A copy of a scheduled trip at another time
    Duplicated,
}

impl ScheduleRelationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleRelationship::Scheduled => "SCHEDULED",
            ScheduleRelationship::Added => "ADDED",
            ScheduleRelationship::Unscheduled => "UNSCHEDULED",
            ScheduleRelationship::Canceled => "CANCELED",
            ScheduleRelationship::Replacement => "REPLACEMENT",
            ScheduleRelationship::Duplicated => "DUPLICATED",
        }
    }
}

impl fmt::Display for ScheduleRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single stop of an updated trip should be interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum StopScheduleRelationship {
    #[default]
    Scheduled,
    /// The vehicle does not stop here
    Skipped,
    /// No real-time data; the stop keeps its scheduled times
    NoData,
}

/// Predicted or recorded arrival or departure at a stop.
///
/// `time` is in seconds since the Unix epoch, `delay` in seconds relative to
/// the schedule. When both are given the absolute time wins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopTimeEvent {
    pub time: Option<i64>,
    pub delay: Option<i32>,
}

impl StopTimeEvent {
    pub fn at(time: i64) -> Self {
        Self { time: Some(time), delay: None }
    }

    pub fn delayed(delay: i32) -> Self {
        Self { time: None, delay: Some(delay) }
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.delay.is_none()
    }
}

/// Real-time data for one stop of a trip, matched to the trip's stops by
/// stop sequence if present, otherwise by stop id.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct StopTimeUpdate {
    pub stop_id: Option<StopIdentifier>,
    pub stop_sequence: Option<u32>,
    pub arrival: Option<StopTimeEvent>,
    pub departure: Option<StopTimeEvent>,
    pub schedule_relationship: StopScheduleRelationship,
}

impl StopTimeUpdate {
    pub fn for_stop(stop_id: impl Into<StopIdentifier>) -> Self {
        Self {
            stop_id: Some(stop_id.into()),
            ..Self::default()
        }
    }

    pub fn for_sequence(stop_sequence: u32) -> Self {
        Self {
            stop_sequence: Some(stop_sequence),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_stop_sequence(mut self, stop_sequence: u32) -> Self {
        self.stop_sequence = Some(stop_sequence);
        self
    }

    #[must_use]
    pub fn with_arrival(mut self, event: StopTimeEvent) -> Self {
        self.arrival = Some(event);
        self
    }

    #[must_use]
    pub fn with_departure(mut self, event: StopTimeEvent) -> Self {
        self.departure = Some(event);
        self
    }

    #[must_use]
    pub fn with_arrival_time(self, time: i64) -> Self {
        self.with_arrival(StopTimeEvent::at(time))
    }

    #[must_use]
    pub fn with_arrival_delay(self, delay: i32) -> Self {
        self.with_arrival(StopTimeEvent::delayed(delay))
    }

    #[must_use]
    pub fn with_departure_time(self, time: i64) -> Self {
        self.with_departure(StopTimeEvent::at(time))
    }

    #[must_use]
    pub fn with_departure_delay(self, delay: i32) -> Self {
        self.with_departure(StopTimeEvent::delayed(delay))
    }

    #[must_use]
    pub fn skipped(mut self) -> Self {
        self.schedule_relationship = StopScheduleRelationship::Skipped;
        self
    }

    #[must_use]
    pub fn no_data(mut self) -> Self {
        self.schedule_relationship = StopScheduleRelationship::NoData;
        self
    }

    pub(crate) fn arrival_time(&self) -> Option<i64> {
        self.arrival.and_then(|event| event.time)
    }

    pub(crate) fn departure_time(&self) -> Option<i64> {
        self.departure.and_then(|event| event.time)
    }
}

/// Extra route data for added trips whose route is not in the schedule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct TripExtension {
    /// GTFS route type, basic or extended
    pub route_type: Option<u16>,
    pub route_long_name: Option<String>,
    pub route_url: Option<String>,
    pub agency_id: Option<AgencyIdentifier>,
}

/// Identifies the trip instance an update applies to.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct TripDescriptor {
    pub trip_id: Option<TripIdentifier>,
    pub route_id: Option<RouteIdentifier>,
    /// Service date as `YYYYMMDD`
    pub start_date: Option<String>,
    pub schedule_relationship: Option<ScheduleRelationship>,
    pub extension: Option<TripExtension>,
}

impl TripDescriptor {
    pub fn new(trip_id: impl Into<TripIdentifier>) -> Self {
        Self {
            trip_id: Some(trip_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_route_id(mut self, route_id: impl Into<RouteIdentifier>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }

    #[must_use]
    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    #[must_use]
    pub fn with_service_date(self, date: NaiveDate) -> Self {
        self.with_start_date(date.format("%Y%m%d").to_string())
    }

    #[must_use]
    pub fn with_schedule_relationship(mut self, relationship: ScheduleRelationship) -> Self {
        self.schedule_relationship = Some(relationship);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: TripExtension) -> Self {
        self.extension = Some(extension);
        self
    }

    /// The relationship to apply; SCHEDULED when the feed gives none.
    pub fn relationship(&self) -> ScheduleRelationship {
        self.schedule_relationship.unwrap_or_default()
    }

    /// Parse the start date, `None` if the descriptor has none.
    pub fn parse_start_date(&self) -> Option<Result<NaiveDate, chrono::ParseError>> {
        self.start_date
            .as_deref()
            .map(|date| NaiveDate::parse_from_str(date, "%Y%m%d"))
    }
}

/// Real-time update of a single trip.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct TripUpdate {
    pub trip: Option<TripDescriptor>,
    pub stop_time_updates: Vec<StopTimeUpdate>,
}

impl TripUpdate {
    pub fn new(trip: TripDescriptor) -> Self {
        Self {
            trip: Some(trip),
            stop_time_updates: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_stop_time_update(mut self, update: StopTimeUpdate) -> Self {
        self.stop_time_updates.push(update);
        self
    }

    #[must_use]
    pub fn with_stop_time_updates(mut self, updates: impl IntoIterator<Item = StopTimeUpdate>) -> Self {
        self.stop_time_updates.extend(updates);
        self
    }

    pub fn trip_id(&self) -> Option<&TripIdentifier> {
        self.trip.as_ref().and_then(|trip| trip.trip_id.as_ref())
    }
}

/// One decoded feed message: a batch of trip updates with the feed header.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TripUpdateMessage {
    pub feed_id: FeedIdentifier,
    /// The batch replaces all earlier real-time data of the feed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub full_dataset: bool,
    /// Header timestamp, seconds since the Unix epoch
    #[cfg_attr(feature = "serde", serde(default))]
    pub timestamp: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub updates: Vec<TripUpdate>,
}

impl TripUpdateMessage {
    pub fn new(feed_id: impl Into<FeedIdentifier>, updates: Vec<TripUpdate>) -> Self {
        Self {
            feed_id: feed_id.into(),
            full_dataset: false,
            timestamp: None,
            updates,
        }
    }

    #[must_use]
    pub fn with_full_dataset(mut self, full_dataset: bool) -> Self {
        self.full_dataset = full_dataset;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Resolves incomplete trip descriptors (for example ones identifying a
/// trip by route, direction and start time) to scheduled trips.
pub trait FuzzyTripMatcher: Send + Sync {
    fn match_trip(&self, feed_id: &FeedIdentifier, trip: &TripDescriptor) -> TripDescriptor;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_defaults_to_scheduled() {
        let descriptor = TripDescriptor::new("T1");
        assert_eq!(descriptor.relationship(), ScheduleRelationship::Scheduled);

        let canceled = descriptor.with_schedule_relationship(ScheduleRelationship::Canceled);
        assert_eq!(canceled.relationship(), ScheduleRelationship::Canceled);
        assert_eq!(canceled.relationship().to_string(), "CANCELED");
    }

    #[test]
    fn test_parse_start_date() {
        let descriptor = TripDescriptor::new("T1").with_start_date("20240301");
        assert_eq!(
            descriptor.parse_start_date().unwrap().unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );

        let round_trip = TripDescriptor::new("T1").with_service_date(NaiveDate::from_ymd_opt(2024, 12, 9).unwrap());
        assert_eq!(round_trip.start_date.as_deref(), Some("20241209"));

        assert!(TripDescriptor::new("T1").with_start_date("2024-03-01").parse_start_date().unwrap().is_err());
        assert!(TripDescriptor::new("T1").parse_start_date().is_none());
    }

    #[test]
    fn test_stop_time_update_builders() {
        let update = StopTimeUpdate::for_stop("A")
            .with_stop_sequence(3)
            .with_arrival_delay(30)
            .with_departure_time(1_000);

        assert_eq!(update.stop_sequence, Some(3));
        assert_eq!(update.arrival_time(), None);
        assert_eq!(update.departure_time(), Some(1_000));
        assert_eq!(update.schedule_relationship, StopScheduleRelationship::Scheduled);
        assert_eq!(
            StopTimeUpdate::for_sequence(1).skipped().schedule_relationship,
            StopScheduleRelationship::Skipped
        );
        assert!(StopTimeEvent::default().is_empty());
    }
}
