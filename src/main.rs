//! Server binary: JSON API, static front-end and the job pipelines.

use tubeconv::adapters::local::http::{router, AppState};
use tubeconv::bootstrap;
use tubeconv::config::AppConfig;
use tubeconv::error::StartupError;
use tubeconv::logging::{init_logging, SERVER_FILTER};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    init_logging(SERVER_FILTER);

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!("server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    // 1. Services
    let repo = bootstrap::connect_repository(&config).await?;
    let services = bootstrap::build(&config, repo).await?;
    services.registry.recover_interrupted().await;

    // 2. HTTP layer
    let app = router(AppState {
        service: services.service.clone(),
        static_dir: config.static_dir(),
    });

    // 3. Start server
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(
        max_concurrent_jobs = config.max_concurrent_jobs,
        "listening at {}",
        config.bind_address()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(services.shutdown.clone()))
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("shutdown requested");
    shutdown.cancel();
}
