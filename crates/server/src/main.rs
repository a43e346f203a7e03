use anyhow::Result;
use deployment::Deployment;
use server::{DeploymentImpl, routes};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "server=info,services=info,db=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let deployment = DeploymentImpl::new().await?;
    let address = deployment.config().bind_address();
    let app = routes::router(deployment);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
