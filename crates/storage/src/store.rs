//! Per-entity persistence contracts.
//!
//! Each contract is implemented once by the fast tier and once by the durable
//! tier. A missing entity is reported as [`StorageError::NotFound`] so that the
//! facade can treat a fast-tier miss the same way as a fast-tier failure.

use async_trait::async_trait;

use weatherbell_common::error::StorageError;
use weatherbell_common::types::{City, User, WeatherForecast};

pub type Result<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait CityStore: Send + Sync {
    /// Upsert a gazetteer entry by id.
    async fn save_city(&self, city: &City) -> Result<()>;

    /// Cities with exactly this display name, one per region.
    async fn find_cities(&self, name: &str) -> Result<Vec<City>>;

    /// Every distinct city name known to the store.
    async fn city_names(&self) -> Result<Vec<String>>;

    /// Distinct city ids currently selected by at least one user.
    async fn demanded_city_ids(&self) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn save_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, tg_id: i64) -> Result<User>;
}

#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Replace the stored forecast for `forecast.city_id`.
    async fn save_forecast(&self, forecast: &WeatherForecast) -> Result<()>;

    async fn get_forecast(&self, city_id: i64) -> Result<WeatherForecast>;
}

/// Age-based cleanup of stored forecasts. Only the durable tier needs it; the
/// fast tier expires forecasts by TTL.
#[async_trait]
pub trait ForecastRetention: Send + Sync {
    /// Delete forecasts not refreshed within `retention`. Returns how many were removed.
    async fn purge_forecasts_older_than(&self, retention: chrono::Duration) -> Result<u64>;
}

/// Cheap round trip used by the health monitor.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

/// Keep at most one city per region, preserving order.
pub(crate) fn dedup_by_region(cities: Vec<City>) -> Vec<City> {
    let mut seen = std::collections::HashSet::new();
    cities
        .into_iter()
        .filter(|city| seen.insert(city.region.clone()))
        .collect()
}
