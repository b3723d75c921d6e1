use clap::Parser;
use std::sync::Arc;

use edge_server::cli::Cli;
use edge_server::lifecycle::shutdown_signal;
use edge_server::observability::init_tracing;
use edge_server::EdgeServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    init_tracing(&config.log);
    tracing::info!("edge-server v{} starting", env!("CARGO_PKG_VERSION"));

    let server = Arc::new(EdgeServer::create(config)?);
    tracing::info!(
        bind_address = %server.settings().bind_address,
        tls = server.settings().tls.is_some(),
        "Configuration loaded"
    );

    let signal_server = server.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_server.close();
    });

    server.bind_and_listen().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
