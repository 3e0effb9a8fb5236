//! Mock tenant server - Entry Point
//!
//! Multi-tenant mock backend keeping isolated state and a live connection
//! endpoint per user.

use log::{error, info};

use mock_tenant_server::Server;
use mock_tenant_server::config::ServerConfig;
use mock_tenant_server::error::ServerError;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching mock tenant server...");

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;
    let server = Server::new(config).await?;
    server.start().await
}
