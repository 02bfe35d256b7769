use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use parklet::{Server, ServerConfig, SlotPool, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let pool = Arc::new(SlotPool::new(config.capacity));

    let server = Server::bind(&config, pool).await?;
    server.run_until(shutdown_signal()).await
}
