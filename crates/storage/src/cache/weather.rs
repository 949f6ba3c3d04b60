use async_trait::async_trait;
use redis::AsyncCommands;

use weatherbell_common::error::StorageError;
use weatherbell_common::types::WeatherForecast;

use super::RedisCache;
use crate::store::{Result, WeatherStore};

fn forecast_key(city_id: i64) -> String {
    format!("weather:city:{}", city_id)
}

#[async_trait]
impl WeatherStore for RedisCache {
    async fn save_forecast(&self, forecast: &WeatherForecast) -> Result<()> {
        let mut conn = self.conn.clone();
        let data = serde_json::to_string(forecast)?;

        let _: () = redis::cmd("SET")
            .arg(forecast_key(forecast.city_id))
            .arg(data)
            .arg("EX")
            .arg(self.forecast_ttl.as_secs())
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn get_forecast(&self, city_id: i64) -> Result<WeatherForecast> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(forecast_key(city_id)).await?;
        let data = data.ok_or_else(|| StorageError::NotFound(format!("forecast for city {}", city_id)))?;
        Ok(serde_json::from_str(&data)?)
    }
}
