//! PostgreSQL durable tier.
//!
//! Every write is a single `INSERT … ON CONFLICT DO UPDATE`, so concurrent
//! writers never observe a half-applied row.

mod city;
mod user;
mod weather;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::store::{LivenessProbe, Result};

/// sqlx-backed implementation of the city, user and weather stores.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LivenessProbe for PgDatabase {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
