use std::sync::Arc;
use std::time::Duration;

use weatherbell_common::config::AppConfig;
use weatherbell_storage::{
    CityFacade, CityStore, HealthMonitor, JobQueue, UserFacade, UserStore, WeatherFacade,
    WeatherStore,
};

/// Everything the workers share, built once at startup.
pub struct Services {
    pub users: UserFacade,
    pub cities: CityFacade,
    pub forecasts: WeatherFacade,
    /// Job log, backed by the fast tier.
    pub queue: Arc<dyn JobQueue>,
    pub health: Arc<HealthMonitor>,
}

impl Services {
    /// Pair a fast and a durable tier that each implement every entity store.
    pub fn from_tiers<F, D>(
        fast: Arc<F>,
        durable: Arc<D>,
        queue: Arc<dyn JobQueue>,
        health: Arc<HealthMonitor>,
    ) -> Self
    where
        F: UserStore + CityStore + WeatherStore + 'static,
        D: UserStore + CityStore + WeatherStore + 'static,
    {
        Self {
            users: UserFacade::users(fast.clone(), durable.clone()),
            cities: CityFacade::cities(fast.clone(), durable.clone()),
            forecasts: WeatherFacade::forecasts(fast, durable),
            queue,
            health,
        }
    }
}

/// Pacing of the worker loops.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between log scans, and after a failed scan.
    pub poll_interval: Duration,
    /// Pause while the fast tier is unhealthy.
    pub unhealthy_backoff: Duration,
    /// Delay before the first scan.
    pub start_delay: Duration,
    /// Delay between provider requests during a bulk refresh.
    pub refresh_pacing: Duration,
    pub cleanup_interval: Duration,
    pub weather_retention: chrono::Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            unhealthy_backoff: Duration::from_secs(60 * 60),
            start_delay: Duration::from_secs(120),
            refresh_pacing: Duration::from_secs(2),
            cleanup_interval: Duration::from_secs(6 * 60 * 60),
            weather_retention: chrono::Duration::hours(48),
        }
    }
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.worker_poll_interval(),
            unhealthy_backoff: config.worker_unhealthy_backoff(),
            start_delay: config.worker_start_delay(),
            refresh_pacing: config.refresh_pacing(),
            cleanup_interval: config.cleanup_interval(),
            weather_retention: config.weather_retention(),
        }
    }
}
