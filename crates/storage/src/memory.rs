//! In-process tier.
//!
//! Implements every store contract and the job queue on top of plain maps.
//! Availability can be switched off at runtime, which makes it the stand-in for
//! either real tier when exercising fallback and health behavior.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use weatherbell_common::error::StorageError;
use weatherbell_common::types::{City, User, WeatherForecast};

use crate::queue::{JobClass, JobId, JobQueue, JobRecord, QueueEntry};
use crate::store::{
    CityStore, ForecastRetention, LivenessProbe, Result, UserStore, WeatherStore,
    dedup_by_region,
};

#[derive(Default)]
struct Tables {
    users: HashMap<i64, User>,
    cities: BTreeMap<i64, City>,
    forecasts: HashMap<i64, (WeatherForecast, DateTime<Utc>)>,
    logs: HashMap<JobClass, Vec<QueueEntry>>,
    next_seq: u64,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    available: AtomicBool,
    failure: StdMutex<String>,
    operations: AtomicU64,
    append_failures: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            available: AtomicBool::new(true),
            failure: StdMutex::new("memory store offline".to_string()),
            operations: AtomicU64::new(0),
            append_failures: AtomicUsize::new(0),
        }
    }

    /// While unavailable every call fails with [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Go offline, reporting `message` from every call.
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = message.into();
        }
        self.set_available(false);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Reject the next `count` job appends while everything else keeps working.
    pub fn fail_appends(&self, count: usize) {
        self.append_failures.store(count, Ordering::SeqCst);
    }

    /// Number of calls made against this store, failed ones included.
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    /// Store a forecast with an explicit refresh time.
    pub async fn insert_forecast_at(&self, forecast: WeatherForecast, updated_at: DateTime<Utc>) {
        self.tables
            .lock()
            .await
            .forecasts
            .insert(forecast.city_id, (forecast, updated_at));
    }

    fn check(&self) -> Result<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.is_available() {
            return Ok(());
        }
        let message = self
            .failure
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|_| "memory store offline".to_string());
        Err(StorageError::Unavailable(message))
    }
}

#[async_trait]
impl CityStore for MemoryStore {
    async fn save_city(&self, city: &City) -> Result<()> {
        self.check()?;
        self.tables.lock().await.cities.insert(city.id, city.clone());
        Ok(())
    }

    async fn find_cities(&self, name: &str) -> Result<Vec<City>> {
        self.check()?;
        let matches: Vec<City> = self
            .tables
            .lock()
            .await
            .cities
            .values()
            .filter(|c| c.name == name)
            .cloned()
            .collect();
        if matches.is_empty() {
            return Err(StorageError::NotFound(format!("city {}", name)));
        }
        Ok(dedup_by_region(matches))
    }

    async fn city_names(&self) -> Result<Vec<String>> {
        self.check()?;
        let tables = self.tables.lock().await;
        let mut names: Vec<String> = tables.cities.values().map(|c| c.name.clone()).collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Err(StorageError::NotFound("city names".to_string()));
        }
        Ok(names)
    }

    async fn demanded_city_ids(&self) -> Result<Vec<i64>> {
        self.check()?;
        let tables = self.tables.lock().await;
        let mut ids: Vec<i64> = tables.users.values().filter_map(|u| u.city_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn save_user(&self, user: &User) -> Result<()> {
        self.check()?;
        self.tables.lock().await.users.insert(user.tg_id, user.clone());
        Ok(())
    }

    async fn get_user(&self, tg_id: i64) -> Result<User> {
        self.check()?;
        self.tables
            .lock()
            .await
            .users
            .get(&tg_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("user {}", tg_id)))
    }
}

#[async_trait]
impl WeatherStore for MemoryStore {
    async fn save_forecast(&self, forecast: &WeatherForecast) -> Result<()> {
        self.check()?;
        self.tables
            .lock()
            .await
            .forecasts
            .insert(forecast.city_id, (forecast.clone(), Utc::now()));
        Ok(())
    }

    async fn get_forecast(&self, city_id: i64) -> Result<WeatherForecast> {
        self.check()?;
        self.tables
            .lock()
            .await
            .forecasts
            .get(&city_id)
            .map(|(forecast, _)| forecast.clone())
            .ok_or_else(|| StorageError::NotFound(format!("forecast for city {}", city_id)))
    }
}

#[async_trait]
impl ForecastRetention for MemoryStore {
    async fn purge_forecasts_older_than(&self, retention: chrono::Duration) -> Result<u64> {
        self.check()?;
        let cutoff = Utc::now() - retention;
        let mut tables = self.tables.lock().await;
        let before = tables.forecasts.len();
        tables.forecasts.retain(|_, (_, updated_at)| *updated_at >= cutoff);
        Ok((before - tables.forecasts.len()) as u64)
    }
}

#[async_trait]
impl LivenessProbe for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check()
    }
}

#[async_trait]
impl JobQueue for MemoryStore {
    async fn append(&self, class: JobClass, record: &JobRecord) -> Result<JobId> {
        self.check()?;
        let rejected = self
            .append_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(StorageError::Unavailable(format!("append to {} rejected", class)));
        }
        let mut tables = self.tables.lock().await;
        tables.next_seq += 1;
        let id = JobId(format!("{}-0", tables.next_seq));
        tables.logs.entry(class).or_default().push(QueueEntry {
            id: id.clone(),
            record: record.clone(),
        });
        Ok(id)
    }

    async fn range_all(&self, class: JobClass) -> Result<Vec<QueueEntry>> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .await
            .logs
            .get(&class)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, class: JobClass, id: &JobId) -> Result<()> {
        self.check()?;
        if let Some(log) = self.tables.lock().await.logs.get_mut(&class) {
            log.retain(|entry| &entry.id != id);
        }
        Ok(())
    }
}
