//! keybridge server entry point.

#![forbid(unsafe_code)]

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kb_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let server = Server::new(config).await?;
    server.run().await
}
