use urlmon_core::{
    Result,
    config::Config,
    db::{create_pool, run_migrations},
    logging,
    store::MonitorStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

mod server;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = Config::from_env()?;
    info!("Starting URL monitor API server with config: {:?}", config);

    let db_pool = create_pool(&config.database).await?;
    info!("Database connection established");

    run_migrations(&db_pool).await?;
    info!("Database migrations completed");

    let state = Arc::new(server::AppState {
        store: MonitorStore::new(db_pool),
        config: config.clone(),
    });

    let app = server::create_app(state).await;

    let listener = TcpListener::bind(&format!("{}:{}", config.server.host, config.server.port))
        .await
        .expect("init tcp listener failed");

    info!(
        "Server listening on {}:{}",
        config.server.host, config.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
