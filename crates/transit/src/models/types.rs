//! Core data types and enums for transit data.

use std::sync::Arc;

use crate::identifiers::*;
use crate::timetable::ValidationError;

// ============================================================================
// Enums
// ============================================================================

/// Transit mode of a route, decoded from GTFS basic or extended route types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteType {
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableTram,
    AerialLift,
    Funicular,
    Trolleybus,
    Monorail,
    Coach,
    Airplane,
    Taxi,
}

impl RouteType {
    /// Route type used for synthesized routes when the feed gives none
    /// (extended type 1700, "miscellaneous service").
    pub const DEFAULT_GTFS_TYPE: u16 = 1700;

    pub fn from_gtfs(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Tram),
            1 => Some(Self::Subway),
            2 => Some(Self::Rail),
            3 => Some(Self::Bus),
            4 => Some(Self::Ferry),
            5 => Some(Self::CableTram),
            6 => Some(Self::AerialLift),
            7 => Some(Self::Funicular),
            11 => Some(Self::Trolleybus),
            12 => Some(Self::Monorail),
            // Extended route types
            100..=199 => Some(Self::Rail),
            200..=299 => Some(Self::Coach),
            300..=399 => Some(Self::Rail),
            401 | 402 => Some(Self::Subway),
            400..=499 => Some(Self::Rail),
            500..=699 => Some(Self::Subway),
            700..=899 => Some(Self::Bus),
            900..=999 => Some(Self::Tram),
            1000..=1099 => Some(Self::Ferry),
            1100..=1199 => Some(Self::Airplane),
            1200..=1299 => Some(Self::Ferry),
            1300..=1399 => Some(Self::AerialLift),
            1400..=1499 => Some(Self::Funicular),
            1500..=1599 => Some(Self::Taxi),
            1700..=1799 => Some(Self::Bus),
            _ => None,
        }
    }
}

/// Trip direction (0 = outbound, 1 = inbound per GTFS)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DirectionId {
    Outbound = 0,
    Inbound = 1,
}

/// Pickup or drop-off arrangement at one stop of a trip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PickDrop {
    #[default]
    Scheduled = 0,
    None = 1,
    CallAgency = 2,
    CoordinateWithDriver = 3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Accessibility {
    Possible,
    NotPossible,
    #[default]
    NoInformation,
}

/// Vehicle crowding, for display only; never used by routing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OccupancyStatus {
    #[default]
    NoDataAvailable,
    Empty,
    ManySeatsAvailable,
    FewSeatsAvailable,
    StandingRoomOnly,
    CrushedStandingRoomOnly,
    Full,
    NotAcceptingPassengers,
}

/// Real-time state of a whole trip instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RealTimeState {
    /// No real-time data; the published schedule is used.
    #[default]
    Scheduled,
    /// Times differ from the schedule.
    Updated,
    Canceled,
    /// Soft-deleted; kept in the data but hidden from users.
    Deleted,
    /// A trip that is not in the static schedule.
    Added,
    /// A scheduled trip whose stop sequence was replaced.
    Modified,
}

/// Real-time state of one stop of a trip. `Default` means the trip-level
/// state applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StopRealTimeState {
    #[default]
    Default,
    Recorded,
    Cancelled,
    NoData,
    InaccuratePredictions,
}

// ============================================================================
// Data Structures
// ============================================================================

/// Booking arrangements for a pickup or drop-off on demand-responsive
/// services.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BookingInfo {
    pub message: Option<Arc<str>>,
    pub phone: Option<Arc<str>>,
    pub url: Option<Arc<str>>,
    /// Seconds of notice required before the pickup/drop-off.
    pub minimum_booking_notice: Option<u32>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Stop not found: {0}")]
    StopNotFound(StopIdentifier),

    #[error("Route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("Trip not found: {0}")]
    TripNotFound(TripIdentifier),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Time {time}s at stop index {stop_index} is outside the supported range")]
    TimeOutOfRange { time: i32, stop_index: usize },

    #[error("Invalid trip times: {0}")]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, TransitError>;
