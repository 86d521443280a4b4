use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paylink_core::adapters::postgres::{PostgresMerchantConfig, PostgresTransactionRepository};
use paylink_core::adapters::reconciler::LoggingReconciler;
use paylink_core::config::Config;
use paylink_core::services::PaymentService;
use paylink_core::{create_app, AppState};

const SWEEP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let repository = Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let merchant = Arc::new(PostgresMerchantConfig::new(
        pool.clone(),
        &config.merchant_receive_address,
        &config.merchant_signing_secret,
    ));
    let payments = Arc::new(PaymentService::new(
        repository,
        merchant,
        Arc::new(LoggingReconciler),
    ));

    // Periodic housekeeping: force-expire stale pending transactions so the
    // lazy read-path expiry is not the only thing bounding growth.
    let sweeper = payments.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.sweep_expired().await {
                tracing::error!("expiry sweep failed: {e}");
            }
        }
    });

    let app = create_app(AppState {
        payments,
        environment: config.environment.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
