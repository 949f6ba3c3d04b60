//! Background work: the daily forecast refresh, per-user notifications and
//! durable-tier cleanup.
//!
//! Every worker exposes `tick()`, one pass over its job log, and `run()`, which
//! repeats `tick()` until cancelled. Long-running loops are wrapped by
//! [`supervisor::Supervisor`].

pub mod cleanup;
pub mod clock;
pub mod context;
pub mod error;
pub mod notify;
pub mod openweather;
pub mod provider;
pub mod refresh;
pub mod supervisor;

pub use cleanup::CleanupTask;
pub use clock::{Clock, SystemClock};
pub use context::{Services, WorkerConfig};
pub use error::SchedulerError;
pub use notify::{NotificationScheduler, NotifyReport};
pub use provider::{ForecastProvider, ForecastService, ProviderError};
pub use refresh::{RefreshReport, RefreshScheduler};
pub use supervisor::Supervisor;

/// Result of one worker pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The fast tier is down; nothing was read.
    Unhealthy,
    /// The log was read but nothing was due.
    Idle,
    /// This many due jobs were handled.
    Processed(usize),
}
