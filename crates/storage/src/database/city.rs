use async_trait::async_trait;

use weatherbell_common::error::StorageError;
use weatherbell_common::types::City;

use super::PgDatabase;
use crate::store::{CityStore, Result, dedup_by_region};

#[async_trait]
impl CityStore for PgDatabase {
    async fn save_city(&self, city: &City) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cities (id, name, federal_district, region, city_district, street)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = $2, federal_district = $3, region = $4, city_district = $5, street = $6
            "#,
        )
        .bind(city.id)
        .bind(&city.name)
        .bind(&city.federal_district)
        .bind(&city.region)
        .bind(&city.city_district)
        .bind(&city.street)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_cities(&self, name: &str) -> Result<Vec<City>> {
        let cities: Vec<City> = sqlx::query_as(
            r#"
            SELECT id, name, federal_district, region, city_district, street
            FROM cities
            WHERE name = $1
            ORDER BY id
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        if cities.is_empty() {
            return Err(StorageError::NotFound(format!("city {:?}", name)));
        }
        Ok(dedup_by_region(cities))
    }

    async fn city_names(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT name FROM cities ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn demanded_city_ids(&self) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT city_id FROM users WHERE city_id IS NOT NULL ORDER BY city_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
