//! Static schedule entities.
//!
//! These are produced by the schedule import and shared read-only between
//! the static index, the scheduled timetables and every real-time snapshot.
//! The real-time updater only ever creates new `Route`s and `Trip`s for
//! trips that are not in the schedule.

use std::sync::Arc;

use crate::identifiers::*;
use crate::models::types::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Agency {
    pub id: AgencyIdentifier,
    pub feed_id: FeedIdentifier,
    pub name: Arc<str>,
}

#[derive(Clone, Debug)]
pub struct Route {
    pub id: RouteIdentifier,
    pub feed_id: FeedIdentifier,
    pub agency: Arc<Agency>,
    pub route_type: RouteType,
    /// The raw GTFS route type, when the route came from (or was synthesized
    /// for) a GTFS feed.
    pub gtfs_type: Option<u16>,
    pub short_name: Option<Arc<str>>,
    pub long_name: Option<Arc<str>>,
    pub url: Option<Arc<str>>,
}

#[derive(Clone, Debug)]
pub struct Stop {
    pub id: StopIdentifier,
    pub feed_id: FeedIdentifier,
    pub name: Arc<str>,
    pub wheelchair_boarding: Accessibility,
}

impl Stop {
    pub fn new(feed_id: FeedIdentifier, id: impl Into<StopIdentifier>, name: impl AsRef<str>) -> Self {
        Self {
            id: id.into(),
            feed_id,
            name: name.as_ref().into(),
            wheelchair_boarding: Accessibility::NoInformation,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Trip {
    pub id: TripIdentifier,
    pub feed_id: FeedIdentifier,
    pub route: Arc<Route>,
    pub service_id: ServiceIdentifier,
    pub headsign: Option<Arc<str>>,
    pub direction_id: Option<DirectionId>,
    pub wheelchair_accessible: Accessibility,
}

impl Trip {
    pub fn new(
        feed_id: FeedIdentifier,
        id: impl Into<TripIdentifier>,
        route: Arc<Route>,
        service_id: ServiceIdentifier,
    ) -> Self {
        Self {
            id: id.into(),
            feed_id,
            route,
            service_id,
            headsign: None,
            direction_id: None,
            wheelchair_accessible: Accessibility::NoInformation,
        }
    }
}

/// One stop visit of a trip, as read from the schedule (or built from an
/// added trip's update).
///
/// Times are seconds after midnight of the service day and may exceed 24h
/// for trips running past midnight.
#[derive(Clone, Debug)]
pub struct StopTime {
    pub stop: Arc<Stop>,
    pub arrival_time: i32,
    pub departure_time: i32,
    pub stop_sequence: Option<u32>,
    pub timepoint: bool,
    pub pickup: PickDrop,
    pub drop_off: PickDrop,
    pub headsign: Option<Arc<str>>,
    pub pickup_booking_info: Option<BookingInfo>,
    pub drop_off_booking_info: Option<BookingInfo>,
}

impl StopTime {
    pub fn new(stop: Arc<Stop>, arrival_time: i32, departure_time: i32) -> Self {
        Self {
            stop,
            arrival_time,
            departure_time,
            stop_sequence: None,
            timepoint: true,
            pickup: PickDrop::Scheduled,
            drop_off: PickDrop::Scheduled,
            headsign: None,
            pickup_booking_info: None,
            drop_off_booking_info: None,
        }
    }

    #[must_use]
    pub fn with_stop_sequence(mut self, stop_sequence: u32) -> Self {
        self.stop_sequence = Some(stop_sequence);
        self
    }

    #[must_use]
    pub fn with_headsign(mut self, headsign: impl AsRef<str>) -> Self {
        self.headsign = Some(headsign.as_ref().into());
        self
    }

    #[must_use]
    pub fn with_pickup_drop_off(mut self, pickup: PickDrop, drop_off: PickDrop) -> Self {
        self.pickup = pickup;
        self.drop_off = drop_off;
        self
    }
}
