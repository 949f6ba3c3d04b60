//! Read-with-fallback and write-to-both over a pair of storage tiers.
//!
//! Reads try the primary (fast) tier first and fall back to the secondary
//! (durable) tier on any primary error, including a miss. Writes go to both tiers
//! regardless of each other's outcome; the call fails only when both fail. A
//! single-tier failure is logged and counted, never returned.
//!
//! The facade never retries and never repairs a tier that missed a write.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use weatherbell_common::error::{DualStorageError, StorageError};
use weatherbell_common::types::{City, User, WeatherForecast};

use crate::store::{CityStore, UserStore, WeatherStore};

pub type UserFacade = StorageFacade<dyn UserStore>;
pub type CityFacade = StorageFacade<dyn CityStore>;
pub type WeatherFacade = StorageFacade<dyn WeatherStore>;

/// Lock-free counters describing how the facade's calls were served.
#[derive(Debug, Default)]
pub struct FacadeStats {
    primary_hits: AtomicU64,
    fallbacks: AtomicU64,
    primary_errors: AtomicU64,
    secondary_errors: AtomicU64,
    dual_failures: AtomicU64,
}

/// Point-in-time copy of [`FacadeStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub primary_hits: u64,
    pub fallbacks: u64,
    pub primary_errors: u64,
    pub secondary_errors: u64,
    pub dual_failures: u64,
}

impl FacadeStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            primary_hits: self.primary_hits.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            primary_errors: self.primary_errors.load(Ordering::Relaxed),
            secondary_errors: self.secondary_errors.load(Ordering::Relaxed),
            dual_failures: self.dual_failures.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A primary/secondary pair of same-shaped stores for one entity kind.
pub struct StorageFacade<S: ?Sized> {
    entity: &'static str,
    primary: Arc<S>,
    secondary: Arc<S>,
    stats: FacadeStats,
}

impl<S: ?Sized> StorageFacade<S> {
    pub fn new(entity: &'static str, primary: Arc<S>, secondary: Arc<S>) -> Self {
        Self {
            entity,
            primary,
            secondary,
            stats: FacadeStats::default(),
        }
    }

    pub fn stats(&self) -> &FacadeStats {
        &self.stats
    }

    /// Await `primary`; only if it fails, await `secondary`.
    ///
    /// Futures are lazy, so the secondary read is never issued on a primary hit.
    async fn read<T>(
        &self,
        op: &'static str,
        primary: impl Future<Output = Result<T, StorageError>>,
        secondary: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, DualStorageError> {
        let primary_err = match primary.await {
            Ok(value) => {
                FacadeStats::bump(&self.stats.primary_hits);
                return Ok(value);
            }
            Err(e) => e,
        };

        if primary_err.is_not_found() {
            tracing::debug!(entity = self.entity, op, "Primary miss, reading secondary");
        } else {
            FacadeStats::bump(&self.stats.primary_errors);
            tracing::warn!(
                entity = self.entity,
                op,
                tier = "primary",
                error = %primary_err,
                "Primary read failed, reading secondary"
            );
        }

        match secondary.await {
            Ok(value) => {
                FacadeStats::bump(&self.stats.fallbacks);
                tracing::debug!(entity = self.entity, op, "Served from secondary");
                Ok(value)
            }
            Err(secondary_err) => {
                if !secondary_err.is_not_found() {
                    FacadeStats::bump(&self.stats.secondary_errors);
                    tracing::warn!(
                        entity = self.entity,
                        op,
                        tier = "secondary",
                        error = %secondary_err,
                        "Secondary read failed"
                    );
                }
                FacadeStats::bump(&self.stats.dual_failures);
                Err(DualStorageError::new(primary_err, secondary_err))
            }
        }
    }

    /// Run both writes to completion; fail only if both failed.
    async fn write(
        &self,
        op: &'static str,
        primary: impl Future<Output = Result<(), StorageError>>,
        secondary: impl Future<Output = Result<(), StorageError>>,
    ) -> Result<(), DualStorageError> {
        let (primary, secondary) = tokio::join!(primary, secondary);

        match (primary, secondary) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) => {
                FacadeStats::bump(&self.stats.primary_errors);
                tracing::warn!(entity = self.entity, op, tier = "primary", error = %e, "Write to primary failed");
                Ok(())
            }
            (Ok(()), Err(e)) => {
                FacadeStats::bump(&self.stats.secondary_errors);
                tracing::warn!(entity = self.entity, op, tier = "secondary", error = %e, "Write to secondary failed");
                Ok(())
            }
            (Err(p), Err(s)) => {
                FacadeStats::bump(&self.stats.primary_errors);
                FacadeStats::bump(&self.stats.secondary_errors);
                FacadeStats::bump(&self.stats.dual_failures);
                tracing::error!(
                    entity = self.entity,
                    op,
                    primary_error = %p,
                    secondary_error = %s,
                    "Write failed on both tiers"
                );
                Err(DualStorageError::new(p, s))
            }
        }
    }
}

impl StorageFacade<dyn UserStore> {
    pub fn users(primary: Arc<dyn UserStore>, secondary: Arc<dyn UserStore>) -> Self {
        Self::new("user", primary, secondary)
    }

    pub async fn save(&self, user: &User) -> Result<(), DualStorageError> {
        self.write(
            "save_user",
            self.primary.save_user(user),
            self.secondary.save_user(user),
        )
        .await
    }

    pub async fn get(&self, tg_id: i64) -> Result<User, DualStorageError> {
        self.read(
            "get_user",
            self.primary.get_user(tg_id),
            self.secondary.get_user(tg_id),
        )
        .await
    }
}

impl StorageFacade<dyn CityStore> {
    pub fn cities(primary: Arc<dyn CityStore>, secondary: Arc<dyn CityStore>) -> Self {
        Self::new("city", primary, secondary)
    }

    pub async fn save(&self, city: &City) -> Result<(), DualStorageError> {
        self.write(
            "save_city",
            self.primary.save_city(city),
            self.secondary.save_city(city),
        )
        .await
    }

    pub async fn find(&self, name: &str) -> Result<Vec<City>, DualStorageError> {
        self.read(
            "find_cities",
            self.primary.find_cities(name),
            self.secondary.find_cities(name),
        )
        .await
    }

    pub async fn names(&self) -> Result<Vec<String>, DualStorageError> {
        self.read(
            "city_names",
            self.primary.city_names(),
            self.secondary.city_names(),
        )
        .await
    }

    pub async fn demanded_city_ids(&self) -> Result<Vec<i64>, DualStorageError> {
        self.read(
            "demanded_city_ids",
            self.primary.demanded_city_ids(),
            self.secondary.demanded_city_ids(),
        )
        .await
    }

    /// Upsert a whole gazetteer. Stops at the first city neither tier accepted.
    pub async fn load(&self, cities: &[City]) -> Result<usize, DualStorageError> {
        for city in cities {
            self.save(city).await.inspect_err(|e| {
                tracing::error!(city_id = city.id, name = %city.name, error = %e, "Failed to import city");
            })?;
        }
        tracing::info!(count = cities.len(), "Cities imported");
        Ok(cities.len())
    }
}

impl StorageFacade<dyn WeatherStore> {
    pub fn forecasts(primary: Arc<dyn WeatherStore>, secondary: Arc<dyn WeatherStore>) -> Self {
        Self::new("weather", primary, secondary)
    }

    pub async fn save(&self, forecast: &WeatherForecast) -> Result<(), DualStorageError> {
        self.write(
            "save_forecast",
            self.primary.save_forecast(forecast),
            self.secondary.save_forecast(forecast),
        )
        .await
    }

    pub async fn get(&self, city_id: i64) -> Result<WeatherForecast, DualStorageError> {
        self.read(
            "get_forecast",
            self.primary.get_forecast(city_id),
            self.secondary.get_forecast(city_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn tiers() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
        (Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    fn user_facade(primary: &Arc<MemoryStore>, secondary: &Arc<MemoryStore>) -> UserFacade {
        UserFacade::users(primary.clone(), secondary.clone())
    }

    fn example_city(id: i64, region: &str) -> City {
        City {
            id,
            name: "Example City".to_string(),
            federal_district: "Central".to_string(),
            region: region.to_string(),
            city_district: None,
            street: None,
        }
    }

    #[tokio::test]
    async fn test_save_then_get_hits_primary() {
        let (primary, secondary) = tiers();
        let facade = user_facade(&primary, &secondary);
        let user = User::new(1, 10, "Anna");

        facade.save(&user).await.unwrap();
        assert_eq!(facade.get(1).await.unwrap(), user);

        let stats = facade.stats().snapshot();
        assert_eq!(stats.primary_hits, 1);
        assert_eq!(stats.fallbacks, 0);
    }

    #[tokio::test]
    async fn test_save_succeeds_when_one_tier_is_down() {
        let (primary, secondary) = tiers();
        let facade = user_facade(&primary, &secondary);
        primary.set_available(false);

        facade.save(&User::new(2, 20, "Boris")).await.unwrap();
        assert_eq!(facade.stats().snapshot().primary_errors, 1);

        primary.set_available(true);
        secondary.set_available(false);
        facade.save(&User::new(3, 30, "Vera")).await.unwrap();
        assert_eq!(facade.stats().snapshot().secondary_errors, 1);
    }

    #[tokio::test]
    async fn test_dual_write_failure_carries_both_causes() {
        let (primary, secondary) = tiers();
        let facade = user_facade(&primary, &secondary);
        primary.fail_with("primary down");
        secondary.fail_with("secondary down");

        let err = facade.save(&User::new(4, 40, "Gleb")).await.unwrap_err();
        assert!(matches!(err.primary(), StorageError::Unavailable(m) if m == "primary down"));
        assert!(matches!(err.secondary(), StorageError::Unavailable(m) if m == "secondary down"));
        assert_eq!(facade.stats().snapshot().dual_failures, 1);
    }

    #[tokio::test]
    async fn test_get_falls_back_when_primary_fails() {
        let (primary, secondary) = tiers();
        let facade = user_facade(&primary, &secondary);
        let user = User::new(5, 50, "Daria");
        facade.save(&user).await.unwrap();

        primary.set_available(false);
        assert_eq!(facade.get(5).await.unwrap(), user);

        let stats = facade.stats().snapshot();
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.primary_errors, 1);
    }

    #[tokio::test]
    async fn test_get_falls_back_on_primary_miss() {
        let (primary, secondary) = tiers();
        let facade = user_facade(&primary, &secondary);
        let user = User::new(6, 60, "Egor");
        // Only the durable tier received the write.
        secondary.save_user(&user).await.unwrap();

        assert_eq!(facade.get(6).await.unwrap(), user);
        let stats = facade.stats().snapshot();
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.primary_errors, 0);
    }

    #[tokio::test]
    async fn test_get_missing_everywhere_is_not_found() {
        let (primary, secondary) = tiers();
        let facade = user_facade(&primary, &secondary);

        let err = facade.get(404).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_primary_hit_never_touches_secondary() {
        let (primary, secondary) = tiers();
        let facade = user_facade(&primary, &secondary);
        facade.save(&User::new(7, 70, "Zhanna")).await.unwrap();
        let before = secondary.operations();

        facade.get(7).await.unwrap();
        assert_eq!(secondary.operations(), before);
    }

    #[tokio::test]
    async fn test_city_find_and_names_fall_back() {
        let (primary, secondary) = tiers();
        let facade = CityFacade::cities(primary.clone(), secondary.clone());
        facade
            .load(&[example_city(42, "North"), example_city(43, "South")])
            .await
            .unwrap();

        primary.set_available(false);
        let found = facade.find("Example City").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(facade.names().await.unwrap(), vec!["Example City".to_string()]);
    }

    #[tokio::test]
    async fn test_load_stops_on_dual_failure() {
        let (primary, secondary) = tiers();
        let facade = CityFacade::cities(primary.clone(), secondary.clone());
        primary.set_available(false);
        secondary.set_available(false);

        assert!(facade.load(&[example_city(1, "North")]).await.is_err());
    }
}
