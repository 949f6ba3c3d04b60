//! Two-tier persistence for users, cities and forecasts, plus the job queue
//! the schedulers run on.
//!
//! Every entity kind has a store contract (see [`store`]) implemented by a fast,
//! possibly volatile tier ([`cache::RedisCache`]) and a durable tier
//! ([`database::PgDatabase`]). [`facade::StorageFacade`] pairs the two.

pub mod cache;
pub mod database;
pub mod facade;
pub mod health;
pub mod memory;
pub mod queue;
pub mod store;

pub use facade::{CityFacade, FacadeStats, StatsSnapshot, StorageFacade, UserFacade, WeatherFacade};
pub use health::HealthMonitor;
pub use queue::{JobClass, JobId, JobQueue, JobRecord, QueueEntry, ScheduledJob};
pub use store::{CityStore, ForecastRetention, LivenessProbe, UserStore, WeatherStore};
