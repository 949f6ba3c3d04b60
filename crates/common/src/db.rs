use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// How long a worker waits for a pooled connection before the durable tier
/// reports the operation as failed.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect the durable tier.
///
/// Pass `AppConfig::db_max_connections` for `max_connections` (default 20).
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

/// Bring the `users`, `cities` and `weather` tables up to date.
pub async fn apply_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
