//! Service calendars: which services run on which dates.
//!
//! Implements GTFS calendar.txt and calendar_dates.txt logic, plus the
//! integer service codes that timetables use in place of service ids.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::identifiers::ServiceIdentifier;

/// Determines which days a transit service operates
#[derive(Clone, Debug)]
pub struct ServiceCalendar {
    pub service_id: ServiceIdentifier,

    // Regular schedule
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weekdays: WeekdayFlags,

    // Exception dates
    pub added_dates: Arc<HashSet<NaiveDate>>,   // Service runs on these dates
    pub removed_dates: Arc<HashSet<NaiveDate>>, // Service does not run on these dates
}

/// Compact representation of which weekdays a service runs
#[derive(Clone, Copy, Debug, Default)]
pub struct WeekdayFlags {
    pub(crate) flags: u8,
}

impl WeekdayFlags {
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    pub fn every_day() -> Self {
        Self::from_bools(true, true, true, true, true, true, true)
    }

    pub fn set(&mut self, weekday: Weekday) {
        self.flags |= 1 << weekday.number_from_monday();
    }

    pub fn unset(&mut self, weekday: Weekday) {
        self.flags &= !(1 << weekday.number_from_monday());
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        (self.flags & (1 << weekday.number_from_monday())) != 0
    }

    pub fn from_bools(mon: bool, tue: bool, wed: bool, thu: bool, fri: bool, sat: bool, sun: bool) -> Self {
        let mut flags = Self::new();
        if mon { flags.set(Weekday::Mon); }
        if tue { flags.set(Weekday::Tue); }
        if wed { flags.set(Weekday::Wed); }
        if thu { flags.set(Weekday::Thu); }
        if fri { flags.set(Weekday::Fri); }
        if sat { flags.set(Weekday::Sat); }
        if sun { flags.set(Weekday::Sun); }
        flags
    }
}

impl ServiceCalendar {
    /// A service running every day between two dates (inclusive)
    pub fn daily(service_id: ServiceIdentifier, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            service_id,
            start_date,
            end_date,
            weekdays: WeekdayFlags::every_day(),
            added_dates: Arc::default(),
            removed_dates: Arc::default(),
        }
    }

    /// Check if the service runs on a given date
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        // Check explicit additions first
        if self.added_dates.contains(&date) {
            return true;
        }

        // Check explicit removals
        if self.removed_dates.contains(&date) {
            return false;
        }

        // Check regular schedule
        if date < self.start_date || date > self.end_date {
            return false;
        }

        self.weekdays.contains(date.weekday())
    }
}

/// Answers which services are active on a date.
pub trait CalendarService: Send + Sync {
    /// Services running on `date`, in id order.
    fn service_ids_on_date(&self, date: NaiveDate) -> BTreeSet<ServiceIdentifier>;
}

/// In-memory [`CalendarService`] over a list of calendars.
#[derive(Clone, Debug, Default)]
pub struct CalendarIndex {
    calendars: Vec<ServiceCalendar>,
}

impl CalendarIndex {
    pub fn new(calendars: Vec<ServiceCalendar>) -> Self {
        Self { calendars }
    }

    pub fn add(&mut self, calendar: ServiceCalendar) {
        self.calendars.push(calendar);
    }

    pub fn calendars(&self) -> &[ServiceCalendar] {
        &self.calendars
    }
}

impl CalendarService for CalendarIndex {
    fn service_ids_on_date(&self, date: NaiveDate) -> BTreeSet<ServiceIdentifier> {
        self.calendars
            .iter()
            .filter(|calendar| calendar.runs_on(date))
            .map(|calendar| calendar.service_id.clone())
            .collect()
    }
}

/// Dense integer codes for service ids.
///
/// Patterns record the services their trips run on as a bitset over these
/// codes, which is much cheaper to test during a search than id sets.
#[derive(Clone, Debug, Default)]
pub struct ServiceCodes {
    codes: HashMap<ServiceIdentifier, u32>,
}

impl ServiceCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code of a service, assigning the next free one if the
    /// service is new.
    pub fn register(&mut self, service_id: ServiceIdentifier) -> u32 {
        let next = self.codes.len() as u32;
        *self.codes.entry(service_id).or_insert(next)
    }

    pub fn get(&self, service_id: &ServiceIdentifier) -> Option<u32> {
        self.codes.get(service_id).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromIterator<ServiceIdentifier> for ServiceCodes {
    fn from_iter<I: IntoIterator<Item = ServiceIdentifier>>(iter: I) -> Self {
        let mut codes = Self::new();
        for service_id in iter {
            codes.register(service_id);
        }
        codes
    }
}
