use std::collections::BTreeSet;

use async_trait::async_trait;
use redis::AsyncCommands;

use weatherbell_common::error::StorageError;
use weatherbell_common::types::City;

use super::RedisCache;
use crate::store::{CityStore, Result, dedup_by_region};

const CITY_PREFIX: &str = "city:";
/// Hash of gazetteer id to the name the city is filed under.
const CITY_INDEX_KEY: &str = "city_index";

fn city_key(name: &str) -> String {
    format!("{}{}", CITY_PREFIX, name)
}

#[async_trait]
impl CityStore for RedisCache {
    async fn save_city(&self, city: &City) -> Result<()> {
        let mut conn = self.conn.clone();
        let data = serde_json::to_string(city)?;
        let previous: Option<String> = conn.hget(CITY_INDEX_KEY, city.id).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(previous) = previous.filter(|name| *name != city.name) {
            pipe.hdel(city_key(&previous), city.id).ignore();
        }
        pipe.hset(city_key(&city.name), city.id, data).ignore();
        pipe.hset(CITY_INDEX_KEY, city.id, &city.name).ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn find_cities(&self, name: &str) -> Result<Vec<City>> {
        let mut conn = self.conn.clone();
        let values: Vec<String> = conn.hvals(city_key(name)).await?;

        let mut cities: Vec<City> = values
            .iter()
            .filter_map(|raw| match serde_json::from_str::<City>(raw) {
                Ok(city) => Some(city),
                Err(e) => {
                    tracing::warn!(name, error = %e, "Skipping undecodable city in Redis");
                    None
                }
            })
            .collect();

        if cities.is_empty() {
            return Err(StorageError::NotFound(format!("city {:?}", name)));
        }

        // Hash iteration order is arbitrary; make listings stable.
        cities.sort_by_key(|c| c.id);
        Ok(dedup_by_region(cities))
    }

    async fn city_names(&self) -> Result<Vec<String>> {
        let keys = self.scan_keys(&format!("{}*", CITY_PREFIX)).await?;
        let names: BTreeSet<String> = keys
            .iter()
            .filter_map(|key| key.strip_prefix(CITY_PREFIX))
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(StorageError::NotFound("no cities cached".to_string()));
        }
        Ok(names.into_iter().collect())
    }

    async fn demanded_city_ids(&self) -> Result<Vec<i64>> {
        let keys = self.scan_keys("user:*").await?;
        if keys.is_empty() {
            return Err(StorageError::NotFound("no users cached".to_string()));
        }

        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.hget(key, "city_id");
        }
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        let ids: BTreeSet<i64> = values
            .into_iter()
            .flatten()
            .filter_map(|raw| raw.parse().ok())
            .collect();

        if ids.is_empty() {
            return Err(StorageError::NotFound("no cached user has a city".to_string()));
        }
        Ok(ids.into_iter().collect())
    }
}
