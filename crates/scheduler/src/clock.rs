//! Wall-clock access and next-run arithmetic.
//!
//! All schedules are expressed in local wall-clock time and stored as UTC
//! instants. Computations are generic over the time zone so they can be checked
//! against fixed offsets.

use std::sync::Mutex;

use chrono::{DateTime, Days, Local, NaiveDateTime, NaiveTime, Offset, TimeZone};

use crate::error::SchedulerError;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Local time of day at which the global refresh runs.
pub fn refresh_time() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 1, 0).unwrap_or(NaiveTime::MIN)
}

/// Longest forward shift looked past when resolving a skipped reading.
const MAX_GAP_HOURS: i64 = 48;

/// Resolve a local wall-clock reading in `tz`.
///
/// A reading repeated by a backward shift resolves to its first occurrence. A
/// reading skipped by a forward shift is read with the offset in force before
/// the shift, which lands as far past the gap as the reading was into it
/// (02:30 across a 02:00 to 03:00 gap becomes 03:30).
pub fn resolve_local<Tz: TimeZone>(
    tz: &Tz,
    naive: NaiveDateTime,
) -> Result<DateTime<Tz>, SchedulerError> {
    if let Some(resolved) = tz.from_local_datetime(&naive).earliest() {
        return Ok(resolved);
    }

    (1..=MAX_GAP_HOURS)
        .find_map(|h| {
            tz.offset_from_local_datetime(&(naive - chrono::Duration::hours(h)))
                .earliest()
        })
        .map(|before| tz.from_utc_datetime(&(naive - before.fix())))
        .ok_or(SchedulerError::NonexistentLocalTime(naive))
}

/// 00:01 on the calendar day after `now`.
pub fn next_refresh_at<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<DateTime<Tz>, SchedulerError> {
    let tomorrow = now.date_naive() + Days::new(1);
    resolve_local(&now.timezone(), tomorrow.and_time(refresh_time()))
}

/// The next instant strictly after `now` whose local time of day is `at`.
pub fn next_occurrence<Tz: TimeZone>(
    now: &DateTime<Tz>,
    at: NaiveTime,
) -> Result<DateTime<Tz>, SchedulerError> {
    let tz = now.timezone();
    let today = now.date_naive();

    if let Ok(candidate) = resolve_local(&tz, today.and_time(at)) {
        if candidate > *now {
            return Ok(candidate);
        }
    }
    resolve_local(&tz, (today + Days::new(1)).and_time(at))
}
