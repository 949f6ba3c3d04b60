//! Redis fast tier.
//!
//! Keys:
//! - `user:{tg_id}`: hash of user fields
//! - `city:{name}`: hash of gazetteer id → city JSON, so re-imports upsert by id
//! - `weather:city:{id}`: forecast JSON with a TTL
//! - `weather_updates`, `user_notifications`: job streams (see [`queue`])

mod city;
mod queue;
mod user;
mod weather;

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::store::{LivenessProbe, Result};

/// Default forecast lifetime in the fast tier (25 hours).
pub const DEFAULT_FORECAST_TTL: Duration = Duration::from_secs(25 * 60 * 60);

/// Keys fetched per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// Redis-backed implementation of every store contract plus the job queue.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    forecast_ttl: Duration,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            forecast_ttl: DEFAULT_FORECAST_TTL,
        }
    }

    pub fn with_forecast_ttl(mut self, ttl: Duration) -> Self {
        self.forecast_ttl = ttl;
        self
    }

    /// All keys matching `pattern`, collected with incremental SCAN.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }
}

#[async_trait]
impl LivenessProbe for RedisCache {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
