//! Transit data models, types, and traits.

pub mod calendar;
pub mod entities;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use calendar::{CalendarIndex, CalendarService, ServiceCalendar, ServiceCodes, WeekdayFlags};
pub use entities::{Agency, Route, Stop, StopTime, Trip};
pub use traits::ScheduleIndex;
pub use types::{
    Accessibility, BookingInfo, DirectionId, OccupancyStatus, PickDrop, RealTimeState, Result, RouteType,
    StopRealTimeState, TransitError,
};
