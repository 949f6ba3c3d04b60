use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use weatherbell_common::error::StorageError;
use weatherbell_common::types::WeatherForecast;

use super::PgDatabase;
use crate::store::{ForecastRetention, Result, WeatherStore};

#[async_trait]
impl WeatherStore for PgDatabase {
    async fn save_forecast(&self, forecast: &WeatherForecast) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO weather (city_id, forecast, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (city_id) DO UPDATE SET forecast = $2, updated_at = NOW()
            "#,
        )
        .bind(forecast.city_id)
        .bind(Json(forecast))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_forecast(&self, city_id: i64) -> Result<WeatherForecast> {
        let row: Option<(Json<WeatherForecast>,)> =
            sqlx::query_as("SELECT forecast FROM weather WHERE city_id = $1")
                .bind(city_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(Json(forecast),)| forecast)
            .ok_or_else(|| StorageError::NotFound(format!("forecast for city {}", city_id)))
    }
}

#[async_trait]
impl ForecastRetention for PgDatabase {
    async fn purge_forecasts_older_than(&self, retention: chrono::Duration) -> Result<u64> {
        let cutoff = Utc::now() - retention;
        let result = sqlx::query("DELETE FROM weather WHERE updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
