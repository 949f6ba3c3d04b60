//! Weatherbell background worker binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;

use weatherbell_common::config::AppConfig;
use weatherbell_common::db;
use weatherbell_common::redis_pool::create_redis_pool;
use weatherbell_notifier::TelegramSink;
use weatherbell_scheduler::openweather::OpenWeatherProvider;
use weatherbell_scheduler::{
    CleanupTask, ForecastService, NotificationScheduler, RefreshScheduler, Services, Supervisor,
    SystemClock, WorkerConfig,
};
use weatherbell_storage::HealthMonitor;
use weatherbell_storage::cache::RedisCache;
use weatherbell_storage::database::PgDatabase;

use weatherbell_worker::bootstrap::import_cities;
use weatherbell_worker::shutdown::install_signal_handler;
use weatherbell_worker::status::{StatusState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "weatherbell_worker=info,weatherbell_scheduler=info,weatherbell_storage=info,weatherbell_notifier=info"
                    .into()
            }),
        )
        .json()
        .init();

    tracing::info!("Weatherbell worker starting...");

    let config = AppConfig::from_env()?;
    let telegram_token = config
        .telegram_bot_token
        .clone()
        .ok_or_else(|| anyhow::anyhow!("TELEGRAM_BOT_TOKEN environment variable is required"))?;
    let openweather_key = config
        .openweather_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENWEATHER_API_KEY environment variable is required"))?;

    // Durable tier
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::apply_migrations(&pool).await?;
    let durable = Arc::new(PgDatabase::new(pool));

    // Fast tier, which also carries the job log
    let redis = create_redis_pool(&config.redis_url).await?;
    let fast = Arc::new(RedisCache::new(redis).with_forecast_ttl(config.forecast_cache_ttl()));

    let health = Arc::new(
        HealthMonitor::new(fast.clone())
            .with_timeout(config.health_probe_timeout())
            .with_interval(config.health_check_interval()),
    );
    let services = Arc::new(Services::from_tiers(
        fast.clone(),
        durable.clone(),
        fast.clone(),
        health.clone(),
    ));

    if let Some(path) = &config.cities_file {
        import_cities(&services, path).await?;
    }

    let worker_config = WorkerConfig::from_app_config(&config);
    let clock = Arc::new(SystemClock);
    let provider = Arc::new(OpenWeatherProvider::new(openweather_key)?);
    let forecasts = Arc::new(ForecastService::new(services.clone(), provider));
    let sink = Arc::new(TelegramSink::new(telegram_token)?);

    let refresh = Arc::new(RefreshScheduler::new(
        services.clone(),
        forecasts.clone(),
        clock.clone(),
        worker_config.clone(),
    ));
    let notify = Arc::new(NotificationScheduler::new(
        services.clone(),
        forecasts,
        sink,
        clock,
        worker_config.clone(),
    ));
    let cleanup = Arc::new(CleanupTask::new(
        durable,
        worker_config.cleanup_interval,
        worker_config.weather_retention,
    ));

    refresh.install().await?;

    let cancel = install_signal_handler();
    let mut tasks = JoinSet::new();

    tasks.spawn({
        let health = health.clone();
        let cancel = cancel.clone();
        async move { health.run(cancel).await }
    });

    let supervisor = |name: &'static str| {
        Supervisor::new(name, worker_config.start_delay, worker_config.poll_interval)
    };

    tasks.spawn({
        let supervisor = supervisor("refresh");
        let cancel = cancel.clone();
        async move {
            supervisor
                .run(cancel, |token| {
                    let refresh = refresh.clone();
                    async move { refresh.run(token).await }
                })
                .await;
        }
    });

    tasks.spawn({
        let supervisor = supervisor("notify");
        let cancel = cancel.clone();
        async move {
            supervisor
                .run(cancel, |token| {
                    let notify = notify.clone();
                    async move { notify.run(token).await }
                })
                .await;
        }
    });

    tasks.spawn({
        let supervisor = supervisor("cleanup");
        let cancel = cancel.clone();
        async move {
            supervisor
                .run(cancel, |token| {
                    let cleanup = cleanup.clone();
                    async move { cleanup.run(token).await }
                })
                .await;
        }
    });

    // Status endpoint
    let app = router(StatusState { health }).layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.status_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Status endpoint listening on {}", addr);

    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            let shutdown = async move { cancel.cancelled().await };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(error = %e, "Status endpoint failed");
            }
        }
    });

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Worker task panicked");
        }
    }

    tracing::info!("Weatherbell worker stopped.");
    Ok(())
}
