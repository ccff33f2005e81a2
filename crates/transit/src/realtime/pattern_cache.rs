//! Patterns created by the real-time updater, shared by stop pattern.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::models::calendar::ServiceCodes;
use crate::models::entities::Trip;
use crate::realtime::error::UpdateError;
use crate::timetable::{StopPattern, StopPatternKey, Timetable, TripPattern};

/// Cache of trip patterns for stop sequences that are not in the schedule,
/// such as those of added trips or of trips skipping stops.
///
/// Resending the same update resolves to the same pattern every time, so
/// the cache only grows with genuinely new stop sequences. Only the
/// snapshot source touches it, while holding its writer lock.
#[derive(Debug, Default)]
pub struct TripPatternCache {
    cache: HashMap<StopPatternKey, Arc<TripPattern>>,
    counter: usize,
}

impl TripPatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pattern for `stop_pattern`, created from `trip`'s route if it is
    /// not cached yet. Either way the pattern runs on the trip's service.
    ///
    /// `original_pattern` is the scheduled pattern the trip deviates from,
    /// if any.
    pub fn get_or_create(
        &mut self,
        stop_pattern: &StopPattern,
        trip: &Trip,
        service_codes: &ServiceCodes,
        original_pattern: Option<&Arc<TripPattern>>,
    ) -> Result<Arc<TripPattern>, UpdateError> {
        let service_code = service_codes
            .get(&trip.service_id)
            .ok_or_else(|| UpdateError::UnknownServiceCode(trip.service_id.clone()))?;

        let key = stop_pattern.key();
        if let Some(pattern) = self.cache.get(&key) {
            pattern.set_service_code(service_code);
            return Ok(pattern.clone());
        }

        self.counter += 1;
        let id = format!("{}:{}:rt", trip.route.id, self.counter);
        trace!(pattern_id = %id, stops = stop_pattern.size(), "creating realtime trip pattern");

        let pattern = Arc::new(
            TripPattern::new(id, trip.route.clone(), stop_pattern.clone())
                .with_direction(trip.direction_id)
                .with_scheduled_timetable(Timetable::default())
                .created_by_realtime_updater(original_pattern.cloned()),
        );
        pattern.set_service_code(service_code);
        self.cache.insert(key, pattern.clone());
        Ok(pattern)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
