use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::interaction::InteractionLogToggle;
use crate::server::routes::router;
use crate::user::UserRegistry;

/// Registries shared by every request handler.
///
/// Built once at startup and cloned into handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserRegistry>,
    pub interaction_logs: Arc<InteractionLogToggle>,
}

impl AppState {
    pub fn new(users: UserRegistry, interaction_logs: InteractionLogToggle) -> Self {
        Self {
            users: Arc::new(users),
            interaction_logs: Arc::new(interaction_logs),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(UserRegistry::from_config(config), InteractionLogToggle::new())
    }
}

pub struct Server {
    listener: TcpListener,
    state: AppState,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let http_socket = config.server.http_socket();

        let listener = TcpListener::bind(&http_socket).await.inspect_err(|e| {
            error!("Failed to bind to {}: {}", http_socket, e);
        })?;
        info!("Server bound to {}", http_socket);

        info!(
            "Endpoint mode {:?}, capacity {} users / {} endpoints",
            config.server.endpoint_mode, config.limits.max_users, config.limits.max_endpoints
        );

        Ok(Self {
            listener,
            state: AppState::from_config(&config),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serves the API until ctrl-c.
    pub async fn start(self) -> Result<(), ServerError> {
        info!("Starting mock tenant server on {}", self.local_addr()?);

        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
