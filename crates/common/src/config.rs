use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string
    pub redis_url: String,

    /// Telegram bot token used by the delivery sink
    pub telegram_bot_token: Option<String>,

    /// OpenWeather API key used by the forecast provider
    pub openweather_api_key: Option<String>,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Seconds between fast-tier liveness probes (default: 60)
    pub health_check_interval_secs: u64,

    /// Liveness probe timeout in milliseconds (default: 2000)
    pub health_probe_timeout_ms: u64,

    /// Seconds between job-log scans, also the backoff after a failed scan (default: 60)
    pub worker_poll_interval_secs: u64,

    /// Seconds a worker sleeps while the fast tier is unhealthy (default: 3600)
    pub worker_unhealthy_backoff_secs: u64,

    /// Seconds workers wait before their first poll (default: 120)
    pub worker_start_delay_secs: u64,

    /// Delay between consecutive provider requests during a bulk refresh (default: 2000)
    pub refresh_pacing_ms: u64,

    /// Fast-tier lifetime of a cached forecast in seconds (default: 90000 = 25h)
    pub forecast_cache_ttl_secs: u64,

    /// Seconds between durable-tier cleanup runs (default: 21600 = 6h)
    pub cleanup_interval_secs: u64,

    /// Age in hours after which durable forecasts are deleted (default: 48)
    pub weather_retention_hours: u64,

    /// Optional path to a gazetteer JSON file imported at startup
    pub cities_file: Option<String>,

    /// Port of the status endpoint (default: 3000)
    pub status_port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            openweather_api_key: std::env::var("OPENWEATHER_API_KEY").ok(),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 20)?,
            health_check_interval_secs: env_or("HEALTH_CHECK_INTERVAL_SECS", 60)?,
            health_probe_timeout_ms: env_or("HEALTH_PROBE_TIMEOUT_MS", 2000)?,
            worker_poll_interval_secs: env_or("WORKER_POLL_INTERVAL_SECS", 60)?,
            worker_unhealthy_backoff_secs: env_or("WORKER_UNHEALTHY_BACKOFF_SECS", 3600)?,
            worker_start_delay_secs: env_or("WORKER_START_DELAY_SECS", 120)?,
            refresh_pacing_ms: env_or("REFRESH_PACING_MS", 2000)?,
            forecast_cache_ttl_secs: env_or("FORECAST_CACHE_TTL_SECS", 90_000)?,
            cleanup_interval_secs: env_or("CLEANUP_INTERVAL_SECS", 21_600)?,
            weather_retention_hours: env_or("WEATHER_RETENTION_HOURS", 48)?,
            cities_file: std::env::var("CITIES_FILE").ok(),
            status_port: env_or("STATUS_PORT", 3000)?,
        })
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.health_probe_timeout_ms)
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_secs(self.worker_poll_interval_secs)
    }

    pub fn worker_unhealthy_backoff(&self) -> Duration {
        Duration::from_secs(self.worker_unhealthy_backoff_secs)
    }

    pub fn worker_start_delay(&self) -> Duration {
        Duration::from_secs(self.worker_start_delay_secs)
    }

    pub fn refresh_pacing(&self) -> Duration {
        Duration::from_millis(self.refresh_pacing_ms)
    }

    pub fn forecast_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.forecast_cache_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn weather_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.weather_retention_hours as i64)
    }
}

/// Read `key` from the environment, falling back to `default` when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| {
            anyhow::anyhow!("{} must be a valid {}", key, std::any::type_name::<T>())
        }),
        Err(_) => Ok(default),
    }
}
