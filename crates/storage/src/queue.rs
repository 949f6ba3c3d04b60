//! Append-only, replayable job log.
//!
//! Each [`JobClass`] owns one ordered log. Entries are flat string records
//! identified by an opaque, monotonically issued position ([`JobId`]). The
//! schedulers only rely on append-order iteration and point deletes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use weatherbell_common::error::StorageError;

use crate::store::Result;

const FIELD_EXECUTE_AT: &str = "executeAt";
const FIELD_USER_ID: &str = "user_id";
const FIELD_JOB_ID: &str = "job_id";

/// Log partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobClass {
    /// The single global "refresh every demanded forecast" job.
    WeatherRefresh,
    /// One "deliver today's forecast" job per subscriber.
    UserNotify,
}

impl JobClass {
    /// Name of the underlying log (the Redis stream key).
    pub fn log_name(&self) -> &'static str {
        match self {
            JobClass::WeatherRefresh => "weather_updates",
            JobClass::UserNotify => "user_notifications",
        }
    }
}

impl std::fmt::Display for JobClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.log_name())
    }
}

/// Opaque log position of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flat key-value payload of a log entry.
pub type JobRecord = BTreeMap<String, String>;

/// A raw entry as read back from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: JobId,
    pub record: JobRecord,
}

impl QueueEntry {
    pub fn decode(&self, class: JobClass) -> Result<ScheduledJob> {
        ScheduledJob::from_record(class, &self.record)
    }
}

/// A unit of future work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledJob {
    Refresh { execute_at: DateTime<Utc> },
    Notify { user_id: i64, execute_at: DateTime<Utc> },
}

impl ScheduledJob {
    pub fn class(&self) -> JobClass {
        match self {
            ScheduledJob::Refresh { .. } => JobClass::WeatherRefresh,
            ScheduledJob::Notify { .. } => JobClass::UserNotify,
        }
    }

    pub fn execute_at(&self) -> DateTime<Utc> {
        match self {
            ScheduledJob::Refresh { execute_at } | ScheduledJob::Notify { execute_at, .. } => {
                *execute_at
            }
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.execute_at() <= now
    }

    pub fn to_record(&self) -> JobRecord {
        let mut record = JobRecord::new();
        let ts = self.execute_at().timestamp();
        record.insert(FIELD_EXECUTE_AT.to_string(), ts.to_string());
        match self {
            ScheduledJob::Refresh { .. } => {
                record.insert(FIELD_JOB_ID.to_string(), format!("weather_update:{}", ts));
            }
            ScheduledJob::Notify { user_id, .. } => {
                record.insert(FIELD_USER_ID.to_string(), user_id.to_string());
            }
        }
        record
    }

    pub fn from_record(class: JobClass, record: &JobRecord) -> Result<Self> {
        let execute_at = parse_field::<i64>(record, FIELD_EXECUTE_AT)?;
        let execute_at = Utc.timestamp_opt(execute_at, 0).single().ok_or_else(|| {
            StorageError::InvalidRecord(format!("executeAt {} out of range", execute_at))
        })?;

        match class {
            JobClass::WeatherRefresh => Ok(ScheduledJob::Refresh { execute_at }),
            JobClass::UserNotify => Ok(ScheduledJob::Notify {
                user_id: parse_field(record, FIELD_USER_ID)?,
                execute_at,
            }),
        }
    }
}

fn parse_field<T: std::str::FromStr>(record: &JobRecord, field: &str) -> Result<T> {
    let raw = record
        .get(field)
        .ok_or_else(|| StorageError::InvalidRecord(format!("missing field {}", field)))?;
    raw.parse()
        .map_err(|_| StorageError::InvalidRecord(format!("field {} has bad value {:?}", field, raw)))
}

/// Ordered log per job class.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn append(&self, class: JobClass, record: &JobRecord) -> Result<JobId>;

    /// Every entry of the log, in append order.
    async fn range_all(&self, class: JobClass) -> Result<Vec<QueueEntry>>;

    async fn delete(&self, class: JobClass, id: &JobId) -> Result<()>;
}
