//! Shared builders for unit tests.

use std::sync::Arc;

use crate::identifiers::*;
use crate::models::entities::{Agency, Route, Stop, StopTime, Trip};
use crate::models::types::RouteType;

pub const FEED: &str = "F";

pub fn test_route() -> Arc<Route> {
    let feed = FeedIdentifier::new(FEED);
    let agency = Arc::new(Agency {
        id: AgencyIdentifier::new("agency"),
        feed_id: feed.clone(),
        name: "Agency".into(),
    });
    Arc::new(Route {
        id: RouteIdentifier::new("R1"),
        feed_id: feed,
        agency,
        route_type: RouteType::Bus,
        gtfs_type: Some(3),
        short_name: Some("1".into()),
        long_name: None,
        url: None,
    })
}

pub fn test_trip(id: &str) -> Arc<Trip> {
    Arc::new(Trip::new(
        FeedIdentifier::new(FEED),
        id,
        test_route(),
        ServiceIdentifier::new("S1"),
    ))
}

/// Stop times from `(stop id, arrival, departure)`, with stop sequences
/// 1, 2, 3...
pub fn stop_times(times: &[(&str, i32, i32)]) -> Vec<StopTime> {
    times
        .iter()
        .enumerate()
        .map(|(index, &(stop_id, arrival, departure))| {
            let stop = Arc::new(Stop::new(FeedIdentifier::new(FEED), stop_id, stop_id));
            StopTime::new(stop, arrival, departure).with_stop_sequence(index as u32 + 1)
        })
        .collect()
}
