//! Schedule builder and helpers shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use realtime_transit::prelude::*;
use tracing_subscriber::filter::LevelFilter;

pub const FEED: &str = "F";

const DEFAULT_AGENCY_ID: &str = "agency";
const DEFAULT_ROUTE_ID: &str = "R1";
const DEFAULT_SERVICE_ID: &str = "S1";

pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn feed() -> FeedIdentifier {
    FeedIdentifier::new(FEED)
}

pub fn service_date() -> NaiveDate {
    date("2024-03-01")
}

pub fn date(date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
}

/// Seconds after midnight of `HH:MM:SS`.
pub fn seconds(time: &str) -> i32 {
    NaiveTime::parse_from_str(time, "%H:%M:%S")
        .unwrap()
        .num_seconds_from_midnight() as i32
}

/// Epoch seconds of `time` on `date`, in UTC.
pub fn epoch(date: NaiveDate, time: &str) -> i64 {
    at(date, time).timestamp()
}

pub fn at(date: NaiveDate, time: &str) -> DateTime<Utc> {
    date.and_time(NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap())
        .and_utc()
}

/// A source whose clock is stopped at 08:00 on the default service date.
pub fn source(config: TimetableSnapshotSourceConfig) -> (TimetableSnapshotSource, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(at(service_date(), "08:00:00")));
    let source = TimetableSnapshotSource::new(config).with_clock(clock.clone());
    (source, clock)
}

pub fn default_source() -> (TimetableSnapshotSource, Arc<ManualClock>) {
    source(TimetableSnapshotSourceConfig::default())
}

/// The schedule a source applies its updates against.
pub struct Schedule {
    pub index: StaticScheduleIndex,
    pub calendar: CalendarIndex,
    pub service_codes: ServiceCodes,
    pub deduplicator: Deduplicator,
}

impl Schedule {
    pub fn ctx(&self) -> UpdateContext<'_> {
        UpdateContext::new(&self.calendar, &self.deduplicator, &self.index, &self.service_codes)
    }

    pub fn pattern(&self, trip_id: &str) -> Arc<TripPattern> {
        self.index
            .pattern_for_trip(&feed(), &TripIdentifier::new(trip_id))
            .unwrap_or_else(|| panic!("no pattern for trip {trip_id}"))
    }
}

/// Builder used to easily create a `Schedule`.
///
/// Unless set otherwise every trip runs on route `R1` with service `S1`,
/// which runs daily through February to April 2024.
///
/// ```ignore
/// let schedule = ScheduleBuilder::new()
///     .trip("T1", |trip| {
///         trip.st("A", "08:00:00").st("B", "08:01:00");
///     })
///     .build();
/// ```
pub struct ScheduleBuilder {
    stops: BTreeSet<String>,
    routes: BTreeSet<String>,
    calendars: Vec<ServiceCalendar>,
    trips: Vec<TripBuilder>,
}

pub struct TripBuilder {
    id: String,
    route_id: String,
    service_id: String,
    stop_times: Vec<(String, i32, i32)>,
}

impl TripBuilder {
    pub fn st(&mut self, stop_id: &str, time: &str) -> &mut Self {
        self.st_dwell(stop_id, time, time)
    }

    pub fn st_dwell(&mut self, stop_id: &str, arrival: &str, departure: &str) -> &mut Self {
        self.stop_times
            .push((stop_id.to_owned(), seconds(arrival), seconds(departure)));
        self
    }

    pub fn route(&mut self, route_id: &str) -> &mut Self {
        self.route_id = route_id.to_owned();
        self
    }

    pub fn service(&mut self, service_id: &str) -> &mut Self {
        self.service_id = service_id.to_owned();
        self
    }
}

impl Default for ScheduleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self {
            stops: BTreeSet::new(),
            routes: [DEFAULT_ROUTE_ID.to_owned()].into(),
            calendars: vec![ServiceCalendar::daily(
                ServiceIdentifier::new(DEFAULT_SERVICE_ID),
                date("2024-02-01"),
                date("2024-04-30"),
            )],
            trips: Vec::new(),
        }
    }

    /// Declare a stop that no scheduled trip serves.
    pub fn stop(mut self, stop_id: &str) -> Self {
        self.stops.insert(stop_id.to_owned());
        self
    }

    pub fn route(mut self, route_id: &str) -> Self {
        self.routes.insert(route_id.to_owned());
        self
    }

    pub fn service(mut self, service_id: &str, start: &str, end: &str) -> Self {
        self.calendars
            .push(ServiceCalendar::daily(ServiceIdentifier::new(service_id), date(start), date(end)));
        self
    }

    pub fn trip<F>(mut self, trip_id: &str, trip_initer: F) -> Self
    where
        F: FnOnce(&mut TripBuilder),
    {
        let mut trip = TripBuilder {
            id: trip_id.to_owned(),
            route_id: DEFAULT_ROUTE_ID.to_owned(),
            service_id: DEFAULT_SERVICE_ID.to_owned(),
            stop_times: Vec::new(),
        };
        trip_initer(&mut trip);
        for (stop_id, _, _) in &trip.stop_times {
            self.stops.insert(stop_id.clone());
        }
        self.routes.insert(trip.route_id.clone());
        self.trips.push(trip);
        self
    }

    pub fn build(self) -> Schedule {
        let feed = feed();
        let agency = Agency {
            id: AgencyIdentifier::new(DEFAULT_AGENCY_ID),
            feed_id: feed.clone(),
            name: "Agency".into(),
        };
        let stops: Vec<Stop> = self
            .stops
            .iter()
            .map(|id| Stop::new(feed.clone(), id.as_str(), id))
            .collect();
        let routes: Vec<Arc<Route>> = self
            .routes
            .iter()
            .map(|id| {
                Arc::new(Route {
                    id: RouteIdentifier::new(id),
                    feed_id: feed.clone(),
                    agency: Arc::new(agency.clone()),
                    route_type: RouteType::Bus,
                    gtfs_type: Some(3),
                    short_name: Some(id.as_str().into()),
                    long_name: None,
                    url: None,
                })
            })
            .collect();

        let trips = self
            .trips
            .iter()
            .map(|trip| {
                let route = routes
                    .iter()
                    .find(|route| route.id.as_str() == trip.route_id)
                    .cloned()
                    .unwrap();
                let stop_times = trip
                    .stop_times
                    .iter()
                    .enumerate()
                    .map(|(index, (stop_id, arrival, departure))| {
                        let stop = Arc::new(Stop::new(feed.clone(), stop_id.as_str(), stop_id));
                        StopTime::new(stop, *arrival, *departure).with_stop_sequence(index as u32 + 1)
                    })
                    .collect();
                let trip = Trip::new(
                    feed.clone(),
                    trip.id.as_str(),
                    route,
                    ServiceIdentifier::new(&trip.service_id),
                );
                (trip, stop_times)
            })
            .collect();

        let mut service_codes: ServiceCodes = self
            .calendars
            .iter()
            .map(|calendar| calendar.service_id.clone())
            .collect();
        let deduplicator = Deduplicator::new();
        let index = StaticScheduleIndex::from_data(
            vec![agency],
            stops,
            routes.iter().map(|route| (**route).clone()).collect(),
            trips,
            &mut service_codes,
            &deduplicator,
        )
        .unwrap();

        Schedule {
            index,
            calendar: CalendarIndex::new(self.calendars),
            service_codes,
            deduplicator,
        }
    }
}

/// Three stops A, B, C a minute apart: trip `T1` at 08:00 and `T2` at 09:00.
pub fn abc_schedule() -> Schedule {
    ScheduleBuilder::new()
        .stop("X")
        .trip("T1", |trip| {
            trip.st("A", "08:00:00").st("B", "08:01:00").st("C", "08:02:00");
        })
        .trip("T2", |trip| {
            trip.st("A", "09:00:00").st("B", "09:01:00").st("C", "09:02:00");
        })
        .build()
}

pub fn scheduled(trip_id: &str) -> TripDescriptor {
    TripDescriptor::new(trip_id).with_service_date(service_date())
}

pub fn with_relationship(trip_id: &str, relationship: ScheduleRelationship) -> TripDescriptor {
    scheduled(trip_id).with_schedule_relationship(relationship)
}

/// Stop time update with equal arrival and departure at `time` on the
/// default service date.
pub fn stop_at(stop_id: &str, time: &str) -> StopTimeUpdate {
    let time = epoch(service_date(), time);
    StopTimeUpdate::for_stop(stop_id)
        .with_arrival_time(time)
        .with_departure_time(time)
}

pub fn trip_ids(timetable: &Timetable) -> Vec<String> {
    timetable
        .trip_times()
        .iter()
        .map(|times| times.trip().id.to_string())
        .collect()
}
