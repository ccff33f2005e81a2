//! The real-time timetable engine.
//!
//! [`TimetableSnapshotSource`] applies batches of trip updates to a
//! working buffer under a writer lock and publishes the buffer as an
//! immutable [`TimetableSnapshot`]. Readers never wait for the writer: they
//! get the latest published snapshot, and only trigger a new commit when
//! the lock happens to be free.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Days, NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::identifiers::*;
use crate::models::calendar::{CalendarService, ServiceCodes};
use crate::models::entities::{Agency, Route, Stop, StopTime, Trip};
use crate::models::traits::ScheduleIndex;
use crate::models::types::{RealTimeState, RouteType};
use crate::realtime::clock::{Clock, SystemClock};
use crate::realtime::config::{TimetableSnapshotSourceConfig, RETENTION_DAYS};
use crate::realtime::error::UpdateError;
use crate::realtime::patch::service_day_start;
use crate::realtime::pattern_cache::TripPatternCache;
use crate::realtime::snapshot::{TimetableSnapshot, TripOnServiceDate};
use crate::realtime::update::{
    FuzzyTripMatcher, ScheduleRelationship, TripDescriptor, TripUpdate, TripUpdateMessage,
};
use crate::timetable::{Deduplicator, StopPattern, TripTimes};

/// Latest arrival or departure of an added trip, in seconds after the
/// start of its service day.
const MAX_ARRIVAL_DEPARTURE_TIME: i64 = 48 * 60 * 60;

/// Name and id of the agency given to added trips whose agency is unknown.
const DUMMY_AGENCY: &str = "Dummy";

/// The static schedule the updates are applied against.
#[derive(Clone, Copy)]
pub struct UpdateContext<'a> {
    pub calendar: &'a dyn CalendarService,
    pub deduplicator: &'a Deduplicator,
    pub index: &'a dyn ScheduleIndex,
    pub service_codes: &'a ServiceCodes,
}

impl<'a> UpdateContext<'a> {
    pub fn new(
        calendar: &'a dyn CalendarService,
        deduplicator: &'a Deduplicator,
        index: &'a dyn ScheduleIndex,
        service_codes: &'a ServiceCodes,
    ) -> Self {
        Self {
            calendar,
            deduplicator,
            index,
            service_codes,
        }
    }
}

/// Result of applying one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub total: usize,
    pub applied: usize,
    /// DUPLICATED updates, which are accepted but not applied
    pub ignored: usize,
    /// Updates rejected before their schedule relationship was known
    pub invalid: usize,
    pub failures: BTreeMap<ScheduleRelationship, usize>,
}

impl UpdateSummary {
    pub fn failed(&self) -> usize {
        self.invalid + self.failures.values().sum::<usize>()
    }
}

enum Outcome {
    Applied,
    Ignored,
}

#[derive(Clone, Copy)]
struct Classified<'u> {
    descriptor: &'u TripDescriptor,
    trip_id: &'u TripIdentifier,
    service_date: NaiveDate,
    relationship: ScheduleRelationship,
}

#[derive(Default)]
struct SourceState {
    buffer: TimetableSnapshot,
    pattern_cache: TripPatternCache,
    last_purge_date: Option<NaiveDate>,
    last_snapshot_time: Option<DateTime<Utc>>,
    total_applied: u64,
    feed_timestamps: HashMap<FeedIdentifier, u64>,
}

pub struct TimetableSnapshotSource {
    config: TimetableSnapshotSourceConfig,
    clock: Arc<dyn Clock>,
    fuzzy_trip_matcher: Option<Arc<dyn FuzzyTripMatcher>>,
    state: Mutex<SourceState>,
    snapshot: ArcSwap<TimetableSnapshot>,
}

impl Default for TimetableSnapshotSource {
    fn default() -> Self {
        Self::new(TimetableSnapshotSourceConfig::default())
    }
}

impl TimetableSnapshotSource {
    pub fn new(config: TimetableSnapshotSourceConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            fuzzy_trip_matcher: None,
            state: Mutex::new(SourceState::default()),
            snapshot: ArcSwap::from_pointee(TimetableSnapshot::new()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_fuzzy_trip_matcher(mut self, matcher: Arc<dyn FuzzyTripMatcher>) -> Self {
        self.fuzzy_trip_matcher = Some(matcher);
        self
    }

    pub fn config(&self) -> &TimetableSnapshotSourceConfig {
        &self.config
    }

    /// The latest snapshot. Never blocks: while updates are being applied
    /// this returns the last published snapshot.
    ///
    /// The returned snapshot never changes; holders release it by dropping
    /// the `Arc`.
    pub fn timetable_snapshot(&self) -> Arc<TimetableSnapshot> {
        match self.state.try_lock() {
            Some(mut state) => self.commit(&mut state, false),
            None => self.snapshot.load_full(),
        }
    }

    /// Number of patterns created so far for stop sequences that are not in
    /// the schedule.
    pub fn realtime_pattern_count(&self) -> usize {
        self.state.lock().pattern_cache.len()
    }

    /// Apply a batch of trip updates for one feed.
    ///
    /// With `full_dataset` all earlier real-time data of the feed is dropped
    /// first. Updates are applied one by one: a rejected update is logged
    /// and skipped without affecting the others. Calls from several threads
    /// are serialized.
    pub fn apply_trip_updates(
        &self,
        ctx: &UpdateContext<'_>,
        full_dataset: bool,
        updates: &[TripUpdate],
        feed_id: &FeedIdentifier,
    ) -> UpdateSummary {
        let mut state = self.state.lock();
        self.apply_locked(&mut state, ctx, full_dataset, updates, feed_id)
    }

    /// Apply a feed message unless its header timestamp shows it was
    /// already seen. A message with the same timestamp as the last applied
    /// one of its feed is dropped as a resend; an older one is ignored.
    /// Returns `None` for dropped messages.
    pub fn apply_trip_update_message(
        &self,
        ctx: &UpdateContext<'_>,
        message: &TripUpdateMessage,
    ) -> Option<UpdateSummary> {
        let mut state = self.state.lock();
        if let Some(timestamp) = message.timestamp {
            match state.feed_timestamps.get(&message.feed_id) {
                Some(&last) if timestamp == last => {
                    debug!(feed_id = %message.feed_id, timestamp, "dropping feed message with unchanged timestamp");
                    return None;
                }
                Some(&last) if timestamp < last => {
                    info!(
                        feed_id = %message.feed_id,
                        timestamp,
                        last,
                        "ignoring feed message older than the last applied one"
                    );
                    return None;
                }
                _ => {}
            }
            state.feed_timestamps.insert(message.feed_id.clone(), timestamp);
        }
        Some(self.apply_locked(
            &mut state,
            ctx,
            message.full_dataset,
            &message.updates,
            &message.feed_id,
        ))
    }

    fn apply_locked(
        &self,
        state: &mut SourceState,
        ctx: &UpdateContext<'_>,
        full_dataset: bool,
        updates: &[TripUpdate],
        feed_id: &FeedIdentifier,
    ) -> UpdateSummary {
        if full_dataset {
            state.buffer.clear(feed_id);
        }

        debug!(feed_id = %feed_id, updates = updates.len(), "applying trip updates");
        let mut summary = UpdateSummary {
            total: updates.len(),
            ..UpdateSummary::default()
        };

        for update in updates {
            let update = self.match_trip(feed_id, update);
            let update: &TripUpdate = &update;

            let classified = match self.classify(update) {
                Ok(classified) => classified,
                Err(error) => {
                    let trip_id = update.trip_id().map_or("<none>", |id| id.as_str());
                    warn!(feed_id = %feed_id, trip_id, "{error}");
                    summary.invalid += 1;
                    continue;
                }
            };
            trace!(
                trip_id = %classified.trip_id,
                relationship = %classified.relationship,
                stop_time_updates = update.stop_time_updates.len(),
                "applying trip update"
            );

            match self.dispatch(state, ctx, feed_id, update, classified) {
                Ok(Outcome::Applied) => {
                    summary.applied += 1;
                    state.total_applied += 1;
                    if self.config.log_frequency > 0 && state.total_applied % self.config.log_frequency == 0 {
                        debug!(total = state.total_applied, "applied trip updates in total");
                    }
                }
                Ok(Outcome::Ignored) => summary.ignored += 1,
                Err(error) => {
                    warn!(
                        feed_id = %feed_id,
                        trip_id = %classified.trip_id,
                        relationship = %classified.relationship,
                        "failed to apply trip update: {error}"
                    );
                    *summary.failures.entry(classified.relationship).or_default() += 1;
                }
            }
        }

        info!(
            feed_id = %feed_id,
            "{} of {} update messages were applied successfully",
            summary.applied,
            summary.total
        );
        if !summary.failures.is_empty() {
            info!(feed_id = %feed_id, failures = ?summary.failures, "failures by schedule relationship");
        }

        let purged = self.config.purge_expired_data && self.purge_expired_data(state);
        self.commit(state, purged);
        summary
    }

    fn match_trip<'u>(&self, feed_id: &FeedIdentifier, update: &'u TripUpdate) -> Cow<'u, TripUpdate> {
        match (&self.fuzzy_trip_matcher, &update.trip) {
            (Some(matcher), Some(trip)) => Cow::Owned(TripUpdate {
                trip: Some(matcher.match_trip(feed_id, trip)),
                stop_time_updates: update.stop_time_updates.clone(),
            }),
            _ => Cow::Borrowed(update),
        }
    }

    fn classify<'u>(&self, update: &'u TripUpdate) -> Result<Classified<'u>, UpdateError> {
        let descriptor = update.trip.as_ref().ok_or(UpdateError::MissingTripDescriptor)?;
        let service_date = match descriptor.parse_start_date() {
            Some(Ok(date)) => date,
            Some(Err(_)) => {
                return Err(UpdateError::InvalidStartDate(
                    descriptor.start_date.clone().unwrap_or_default(),
                ))
            }
            None => self.today(),
        };
        let trip_id = descriptor.trip_id.as_ref().ok_or(UpdateError::MissingTripId)?;
        Ok(Classified {
            descriptor,
            trip_id,
            service_date,
            relationship: descriptor.relationship(),
        })
    }

    fn dispatch(
        &self,
        state: &mut SourceState,
        ctx: &UpdateContext<'_>,
        feed_id: &FeedIdentifier,
        update: &TripUpdate,
        classified: Classified<'_>,
    ) -> Result<Outcome, UpdateError> {
        let Classified {
            descriptor,
            trip_id,
            service_date,
            relationship,
        } = classified;

        match relationship {
            ScheduleRelationship::Scheduled => {
                self.handle_scheduled_trip(state, ctx, feed_id, trip_id, update, service_date)
            }
            ScheduleRelationship::Added => {
                self.handle_added_trip(state, ctx, feed_id, descriptor, trip_id, update, service_date)
            }
            ScheduleRelationship::Unscheduled => Err(UpdateError::UnscheduledUnsupported),
            ScheduleRelationship::Canceled => Self::handle_canceled_trip(state, ctx, feed_id, trip_id, service_date),
            ScheduleRelationship::Replacement => {
                self.handle_replacement_trip(state, ctx, feed_id, descriptor, trip_id, update, service_date)
            }
            ScheduleRelationship::Duplicated => return Ok(Outcome::Ignored),
        }
        .map(|()| Outcome::Applied)
    }

    fn handle_scheduled_trip(
        &self,
        state: &mut SourceState,
        ctx: &UpdateContext<'_>,
        feed_id: &FeedIdentifier,
        trip_id: &TripIdentifier,
        update: &TripUpdate,
        service_date: NaiveDate,
    ) -> Result<(), UpdateError> {
        let pattern = ctx
            .index
            .pattern_for_trip(feed_id, trip_id)
            .ok_or(UpdateError::PatternNotFound)?;
        if update.stop_time_updates.is_empty() {
            return Err(UpdateError::NoStopTimeUpdates);
        }

        let patch = pattern.scheduled_timetable().create_updated_trip_times(
            pattern.stop_pattern(),
            update,
            self.config.timezone,
            service_date,
            self.config.backwards_delay_propagation,
        )?;
        let mut trip_times = patch.trip_times;
        trip_times.set_real_time_state(RealTimeState::Updated);

        let skipped = patch.skipped_stop_indices;
        if skipped.is_empty() {
            // A trip moved to another pattern earlier returns to its own.
            Self::cancel_previously_added_trip(state, feed_id, trip_id, service_date);
            state.buffer.update(&pattern, trip_times, service_date);
            return Ok(());
        }

        if trip_times.num_stops() - skipped.len() < 2 {
            return Err(UpdateError::TooFewRemainingStops);
        }
        let trip_times = trip_times.without_stops(&skipped)?;
        let stop_pattern = pattern.stop_pattern().without_stops(&skipped);
        let trip = trip_times.trip().clone();
        let new_pattern = state
            .pattern_cache
            .get_or_create(&stop_pattern, &trip, ctx.service_codes, Some(&pattern))?;

        debug!(
            feed_id = %feed_id,
            trip_id = %trip_id,
            skipped = skipped.len(),
            pattern_id = %new_pattern.id(),
            "moving trip with skipped stops to realtime pattern"
        );
        Self::cancel_previously_added_trip(state, feed_id, trip_id, service_date);
        Self::cancel_scheduled_trip(state, ctx, feed_id, trip_id, service_date);
        state.buffer.update(&new_pattern, trip_times, service_date);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_added_trip(
        &self,
        state: &mut SourceState,
        ctx: &UpdateContext<'_>,
        feed_id: &FeedIdentifier,
        descriptor: &TripDescriptor,
        trip_id: &TripIdentifier,
        update: &TripUpdate,
        service_date: NaiveDate,
    ) -> Result<(), UpdateError> {
        if ctx.index.trip(feed_id, trip_id).is_some() {
            return Err(UpdateError::TripAlreadyExists);
        }
        if descriptor.start_date.is_none() {
            return Err(UpdateError::MissingStartDate(ScheduleRelationship::Added));
        }
        if update.stop_time_updates.len() < 2 {
            return Err(UpdateError::TooFewStops(ScheduleRelationship::Added));
        }
        let stops = resolve_new_trip_stops(ctx, feed_id, update)?;

        let route = resolve_route(ctx, feed_id, descriptor, trip_id);
        let service_id = ctx
            .calendar
            .service_ids_on_date(service_date)
            .into_iter()
            .next()
            .ok_or(UpdateError::NoServiceOnDate(service_date))?;
        let trip = Arc::new(Trip::new(feed_id.clone(), trip_id.clone(), route, service_id));

        self.add_trip(state, ctx, trip, update, &stops, service_date, RealTimeState::Added)
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_replacement_trip(
        &self,
        state: &mut SourceState,
        ctx: &UpdateContext<'_>,
        feed_id: &FeedIdentifier,
        descriptor: &TripDescriptor,
        trip_id: &TripIdentifier,
        update: &TripUpdate,
        service_date: NaiveDate,
    ) -> Result<(), UpdateError> {
        let trip = ctx.index.trip(feed_id, trip_id).ok_or(UpdateError::TripNotFound)?;
        if descriptor.start_date.is_none() {
            return Err(UpdateError::MissingStartDate(ScheduleRelationship::Replacement));
        }
        if !ctx.calendar.service_ids_on_date(service_date).contains(&trip.service_id) {
            return Err(UpdateError::ServiceNotActive(service_date));
        }
        if update.stop_time_updates.len() < 2 {
            return Err(UpdateError::TooFewStops(ScheduleRelationship::Replacement));
        }
        let stops = resolve_new_trip_stops(ctx, feed_id, update)?;

        self.add_trip(state, ctx, trip, update, &stops, service_date, RealTimeState::Modified)
    }

    fn handle_canceled_trip(
        state: &mut SourceState,
        ctx: &UpdateContext<'_>,
        feed_id: &FeedIdentifier,
        trip_id: &TripIdentifier,
        service_date: NaiveDate,
    ) -> Result<(), UpdateError> {
        let scheduled = Self::cancel_scheduled_trip(state, ctx, feed_id, trip_id, service_date);
        let added = Self::cancel_previously_added_trip(state, feed_id, trip_id, service_date);
        if scheduled || added {
            Ok(())
        } else {
            Err(UpdateError::NothingToCancel)
        }
    }

    /// Insert a trip built from the stop time updates of an ADDED or
    /// REPLACEMENT update. Everything that can fail happens before the
    /// buffer is touched.
    #[allow(clippy::too_many_arguments)]
    fn add_trip(
        &self,
        state: &mut SourceState,
        ctx: &UpdateContext<'_>,
        trip: Arc<Trip>,
        update: &TripUpdate,
        stops: &[Arc<Stop>],
        service_date: NaiveDate,
        real_time_state: RealTimeState,
    ) -> Result<(), UpdateError> {
        let midnight = service_day_start(service_date, self.config.timezone)?;

        let mut stop_times = Vec::with_capacity(stops.len());
        for (index, (stop_time_update, stop)) in update.stop_time_updates.iter().zip(stops).enumerate() {
            let arrival = stop_time_update
                .arrival_time()
                .ok_or(UpdateError::MissingArrivalTime(index))?;
            let departure = stop_time_update
                .departure_time()
                .ok_or(UpdateError::MissingDepartureTime(index))?;
            let mut stop_time = StopTime::new(
                stop.clone(),
                time_after_midnight(arrival, midnight, index)?,
                time_after_midnight(departure, midnight, index)?,
            );
            stop_time.stop_sequence = stop_time_update.stop_sequence;
            stop_times.push(stop_time);
        }

        let service_code = ctx
            .service_codes
            .get(&trip.service_id)
            .ok_or_else(|| UpdateError::UnknownServiceCode(trip.service_id.clone()))?;
        let mut trip_times = TripTimes::from_stop_times(trip.clone(), &stop_times, Some(ctx.deduplicator))?;
        for stop in 0..trip_times.num_stops() {
            trip_times.update_arrival_time(stop, trip_times.scheduled_arrival_time(stop));
            trip_times.update_departure_time(stop, trip_times.scheduled_departure_time(stop));
        }
        trip_times.set_service_code(service_code);
        trip_times.set_real_time_state(real_time_state);

        let stop_pattern = StopPattern::from_stop_times(&stop_times);
        let original_pattern = ctx.index.pattern_for_trip(&trip.feed_id, &trip.id);
        let pattern = state.pattern_cache.get_or_create(
            &stop_pattern,
            &trip,
            ctx.service_codes,
            original_pattern.as_ref(),
        )?;

        if real_time_state == RealTimeState::Modified {
            Self::cancel_scheduled_trip(state, ctx, &trip.feed_id, &trip.id, service_date);
        }
        Self::cancel_previously_added_trip(state, &trip.feed_id, &trip.id, service_date);
        state.buffer.update(&pattern, trip_times, service_date);
        Ok(())
    }

    /// Mark the scheduled instance of a trip canceled on `service_date`.
    /// Returns false if the schedule has no such trip.
    fn cancel_scheduled_trip(
        state: &mut SourceState,
        ctx: &UpdateContext<'_>,
        feed_id: &FeedIdentifier,
        trip_id: &TripIdentifier,
        service_date: NaiveDate,
    ) -> bool {
        let Some(pattern) = ctx.index.pattern_for_trip(feed_id, trip_id) else {
            return false;
        };
        let Some(scheduled) = pattern.scheduled_timetable().trip_times_for(trip_id) else {
            warn!(feed_id = %feed_id, trip_id = %trip_id, "could not cancel scheduled trip, it is not in the timetable");
            return false;
        };
        let mut trip_times = TripTimes::clone(scheduled);
        trip_times.cancel_trip();
        state.buffer.update(&pattern, trip_times, service_date);
        true
    }

    /// Mark the instance last added by the real-time updater for this trip
    /// and date canceled. The instance stays in its timetable and its
    /// pattern stays cached for reuse.
    fn cancel_previously_added_trip(
        state: &mut SourceState,
        feed_id: &FeedIdentifier,
        trip_id: &TripIdentifier,
        service_date: NaiveDate,
    ) -> bool {
        let key = TripOnServiceDate::new(feed_id.clone(), trip_id.clone(), service_date);
        let Some(pattern) = state.buffer.last_added_trip_pattern(&key).cloned() else {
            return false;
        };
        let timetable = state.buffer.resolve(&pattern, service_date);
        let Some(added) = timetable.trip_times_for(trip_id) else {
            warn!(feed_id = %feed_id, trip_id = %trip_id, "could not cancel previously added trip");
            return false;
        };
        let mut trip_times = TripTimes::clone(added);
        trip_times.cancel_trip();
        state.buffer.update(&pattern, trip_times, service_date);
        true
    }

    /// Publish the buffer if it changed and the last publish is long
    /// enough ago, or unconditionally with `force`.
    fn commit(&self, state: &mut SourceState, force: bool) -> Arc<TimetableSnapshot> {
        let now = self.clock.now();
        let due = state
            .last_snapshot_time
            .map_or(true, |last| now - last > self.config.max_snapshot_frequency());

        if force || due {
            if force || state.buffer.is_dirty() {
                debug!(force, timetables = state.buffer.timetable_count(), "committing timetable snapshot");
                self.snapshot.store(Arc::new(state.buffer.commit()));
            } else {
                debug!("buffer was unchanged, keeping old snapshot");
            }
            state.last_snapshot_time = Some(now);
        } else {
            debug!("snapshot frequency exceeded, reusing snapshot");
        }
        self.snapshot.load_full()
    }

    /// Drop real-time data older than the retention window, at most once
    /// per day. Returns true if anything was removed.
    fn purge_expired_data(&self, state: &mut SourceState) -> bool {
        let Some(watermark) = self.today().checked_sub_days(Days::new(RETENTION_DAYS)) else {
            return false;
        };
        if state.last_purge_date.is_some_and(|last| last >= watermark) {
            return false;
        }

        debug!(%watermark, "purging expired realtime data");
        state.last_purge_date = Some(watermark);
        state.buffer.purge_expired_data(watermark)
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.config.timezone).date_naive()
    }
}

/// Resolve the stops of an ADDED or REPLACEMENT update, checking that stop
/// sequences and times never decrease and that every stop has both times.
fn resolve_new_trip_stops(
    ctx: &UpdateContext<'_>,
    feed_id: &FeedIdentifier,
    update: &TripUpdate,
) -> Result<Vec<Arc<Stop>>, UpdateError> {
    let mut previous_sequence = None;
    let mut previous_time = None;
    let mut stops = Vec::with_capacity(update.stop_time_updates.len());

    for (index, stop_time_update) in update.stop_time_updates.iter().enumerate() {
        if let Some(sequence) = stop_time_update.stop_sequence {
            if previous_sequence.is_some_and(|previous| previous > sequence) {
                return Err(UpdateError::DecreasingStopSequence(index));
            }
            previous_sequence = Some(sequence);
        }

        let stop_id = stop_time_update
            .stop_id
            .as_ref()
            .ok_or(UpdateError::MissingStopId(index))?;
        let stop = ctx
            .index
            .stop(feed_id, stop_id)
            .ok_or_else(|| UpdateError::UnknownStop(stop_id.clone()))?;

        for time in [
            stop_time_update
                .arrival_time()
                .ok_or(UpdateError::MissingArrivalTime(index))?,
            stop_time_update
                .departure_time()
                .ok_or(UpdateError::MissingDepartureTime(index))?,
        ] {
            if previous_time.is_some_and(|previous| previous > time) {
                return Err(UpdateError::DecreasingTimes(index));
            }
            previous_time = Some(time);
        }
        stops.push(stop);
    }
    Ok(stops)
}

/// The route of an added trip: the scheduled route named by the
/// descriptor, or one made up from the descriptor's extension.
fn resolve_route(
    ctx: &UpdateContext<'_>,
    feed_id: &FeedIdentifier,
    descriptor: &TripDescriptor,
    trip_id: &TripIdentifier,
) -> Arc<Route> {
    if let Some(route) = descriptor
        .route_id
        .as_ref()
        .and_then(|route_id| ctx.index.route(feed_id, route_id))
    {
        return route;
    }

    let extension = descriptor.extension.clone().unwrap_or_default();
    let id = descriptor
        .route_id
        .clone()
        .unwrap_or_else(|| RouteIdentifier::new(trip_id.as_str()));
    let agency = ctx
        .index
        .agencies(feed_id)
        .into_iter()
        .find(|agency| extension.agency_id.as_ref() == Some(&agency.id))
        .unwrap_or_else(|| {
            Arc::new(Agency {
                id: AgencyIdentifier::new(DUMMY_AGENCY),
                feed_id: feed_id.clone(),
                name: DUMMY_AGENCY.into(),
            })
        });
    let gtfs_type = extension.route_type.unwrap_or(RouteType::DEFAULT_GTFS_TYPE);
    let name: Option<Arc<str>> = extension.route_long_name.as_deref().map(Arc::from);

    trace!(route_id = %id, gtfs_type, "synthesized route for added trip");
    Arc::new(Route {
        id,
        feed_id: feed_id.clone(),
        agency,
        route_type: RouteType::from_gtfs(gtfs_type).unwrap_or(RouteType::Bus),
        gtfs_type: Some(gtfs_type),
        short_name: name.clone(),
        long_name: name,
        url: extension.route_url.as_deref().map(Arc::from),
    })
}

fn time_after_midnight(time: i64, midnight: i64, index: usize) -> Result<i32, UpdateError> {
    let seconds = time - midnight;
    if !(0..=MAX_ARRIVAL_DEPARTURE_TIME).contains(&seconds) {
        return Err(UpdateError::TimeOutOfRange { index, time });
    }
    i32::try_from(seconds).map_err(|_| UpdateError::TimeOutOfRange { index, time })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_after_midnight_bounds() {
        assert_eq!(time_after_midnight(1_000, 1_000, 0).unwrap(), 0);
        assert_eq!(time_after_midnight(1_000 + 48 * 3600, 1_000, 0).unwrap(), 48 * 3600);
        assert!(matches!(
            time_after_midnight(999, 1_000, 2),
            Err(UpdateError::TimeOutOfRange { index: 2, time: 999 })
        ));
        assert!(time_after_midnight(1_001 + 48 * 3600, 1_000, 0).is_err());
    }

    #[test]
    fn test_summary_failed_count() {
        let mut summary = UpdateSummary {
            invalid: 1,
            ..UpdateSummary::default()
        };
        summary.failures.insert(ScheduleRelationship::Added, 2);
        summary.failures.insert(ScheduleRelationship::Canceled, 1);
        assert_eq!(summary.failed(), 4);
    }
}
