use urlmon_core::{
    config::Config,
    db::{create_pool, run_migrations},
    logging,
    store::MonitorStore,
    Result,
};
use tracing::info;

mod probe;
mod scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = Config::from_env()?;
    info!("Starting URL monitor scheduler with config: {:?}", config);

    let db_pool = create_pool(&config.database).await?;
    info!("Database connection established");

    run_migrations(&db_pool).await?;
    info!("Database migrations completed");

    let store = MonitorStore::new(db_pool);
    let mut scheduler = scheduler::MonitorScheduler::new(store, &config.scheduler).await?;

    scheduler.start().await?;

    info!("URL monitor scheduler is running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    scheduler.stop().await?;

    Ok(())
}
