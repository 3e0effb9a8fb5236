//! Module `registry`
//!
//! Centralized registry of per-user connection endpoints. Allocates a
//! channel route or a dedicated TCP listener for each user and keeps at most
//! one live endpoint per user id.

use log::{info, warn};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::{EndpointMode, StartupConfig};
use crate::connection::endpoint::ConnectionEndpoint;
use crate::error::ConnectionError;
use crate::results::ProvisionOutcome;

/// Registry that maps user ids to their connection endpoints.
pub struct ConnectionRegistry {
    endpoints: Mutex<HashMap<String, Arc<ConnectionEndpoint>>>,
    settings: StartupConfig,
    max_endpoints: usize,
}

impl ConnectionRegistry {
    pub fn new(settings: StartupConfig, max_endpoints: usize) -> Self {
        Self {
            endpoints: Mutex::new(HashMap::new()),
            settings,
            max_endpoints,
        }
    }

    pub fn mode(&self) -> EndpointMode {
        self.settings.endpoint_mode
    }

    /// Ensures `user_id` has a live endpoint and returns it.
    ///
    /// Known users get their existing endpoint back. Allocation happens
    /// under the registry lock, so concurrent calls for the same id never
    /// create a second endpoint.
    pub async fn add_user(
        &self,
        user_id: &str,
    ) -> Result<(ProvisionOutcome, Arc<ConnectionEndpoint>), ConnectionError> {
        let mut endpoints = self.endpoints.lock().await;

        if let Some(existing) = endpoints.get(user_id) {
            return Ok((ProvisionOutcome::AlreadyExists, Arc::clone(existing)));
        }

        if endpoints.len() >= self.max_endpoints {
            return Err(ConnectionError::CapacityExhausted(self.max_endpoints));
        }

        let endpoint = match self.settings.endpoint_mode {
            EndpointMode::Channel => {
                ConnectionEndpoint::channel(user_id, self.settings.channel_capacity)
            }
            EndpointMode::Tcp => self.bind_endpoint(user_id, &endpoints).await?,
        };
        let endpoint = Arc::new(endpoint);

        endpoints.insert(user_id.to_string(), Arc::clone(&endpoint));
        info!(
            "User {} bound to endpoint {} ({} endpoints)",
            user_id,
            endpoint.address(),
            endpoints.len()
        );

        Ok((ProvisionOutcome::Created, endpoint))
    }

    /// Binds a listener on the first free port of the endpoint range.
    async fn bind_endpoint(
        &self,
        user_id: &str,
        endpoints: &HashMap<String, Arc<ConnectionEndpoint>>,
    ) -> Result<ConnectionEndpoint, ConnectionError> {
        for port in self.settings.endpoint_port_range() {
            let Some(socket) = self.settings.endpoint_socket(port) else {
                return Err(ConnectionError::NoAvailablePort);
            };

            if Self::is_socket_taken(endpoints, port) {
                continue;
            }

            let listener = match TcpListener::bind(socket).await {
                Ok(listener) => listener,
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                    warn!("Endpoint port {} in use by another process, skipping", port);
                    continue;
                }
                Err(e) => return Err(ConnectionError::PortBindingFailed(socket, e)),
            };

            // On error the listener is dropped here, releasing the port
            let local_addr = listener
                .local_addr()
                .map_err(|e| ConnectionError::PortBindingFailed(socket, e))?;

            return Ok(ConnectionEndpoint::tcp(
                user_id,
                listener,
                local_addr,
                self.settings.channel_capacity,
            ));
        }

        Err(ConnectionError::NoAvailablePort)
    }

    /// Checks if a port is already held by a registered endpoint.
    fn is_socket_taken(endpoints: &HashMap<String, Arc<ConnectionEndpoint>>, port: u16) -> bool {
        endpoints
            .values()
            .any(|endpoint| endpoint.socket().map(|addr| addr.port()) == Some(port))
    }

    /// Removes the endpoint for a user. The listener and its acceptor are
    /// released once no other handle to the endpoint remains.
    pub async fn remove_user(&self, user_id: &str) -> Option<Arc<ConnectionEndpoint>> {
        let removed = self.endpoints.lock().await.remove(user_id);
        if removed.is_some() {
            info!("Removed endpoint for user {}", user_id);
        }
        removed
    }

    pub async fn get(&self, user_id: &str) -> Option<Arc<ConnectionEndpoint>> {
        self.endpoints.lock().await.get(user_id).cloned()
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.endpoints.lock().await.contains_key(user_id)
    }

    /// Every user id with a live endpoint, sorted for stable output.
    pub async fn list_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.endpoints.lock().await.keys().cloned().collect();
        users.sort();
        users
    }

    pub async fn len(&self) -> usize {
        self.endpoints.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::EndpointAddress;

    fn channel_registry(max_endpoints: usize) -> ConnectionRegistry {
        ConnectionRegistry::new(StartupConfig::default(), max_endpoints)
    }

    #[tokio::test]
    async fn add_user_returns_existing_endpoint() {
        let registry = channel_registry(10);

        let (outcome, first) = registry.add_user("alice").await.unwrap();
        assert_eq!(outcome, ProvisionOutcome::Created);

        let (outcome, second) = registry.add_user("alice").await.unwrap();
        assert_eq!(outcome, ProvisionOutcome::AlreadyExists);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn full_registry_rejects_new_users_only() {
        let registry = channel_registry(1);
        registry.add_user("alice").await.unwrap();

        assert!(matches!(
            registry.add_user("bob").await,
            Err(ConnectionError::CapacityExhausted(1))
        ));
        assert!(registry.add_user("alice").await.is_ok());
        assert_eq!(registry.list_users().await, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn list_users_is_sorted() {
        let registry = channel_registry(10);
        for user in ["carol", "alice", "bob"] {
            registry.add_user(user).await.unwrap();
        }
        assert_eq!(registry.list_users().await, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn tcp_mode_skips_ports_held_by_endpoints() {
        let settings = StartupConfig {
            endpoint_mode: EndpointMode::Tcp,
            endpoint_port_min: 47310,
            endpoint_port_max: 47330,
            ..StartupConfig::default()
        };
        let registry = ConnectionRegistry::new(settings, 10);

        let (_, alice) = registry.add_user("alice").await.unwrap();
        let (_, bob) = registry.add_user("bob").await.unwrap();

        let (EndpointAddress::Socket(a), EndpointAddress::Socket(b)) =
            (alice.address(), bob.address())
        else {
            panic!("tcp mode must bind sockets");
        };
        assert_ne!(a.port(), b.port());
        assert!((47310..47330).contains(&a.port()));
    }
}
