//! Module `endpoint`
//!
//! A live, addressable channel owned by a single user. Every endpoint
//! carries a broadcast channel; tcp-mode endpoints additionally own a bound
//! listener whose acceptor streams channel events to connected sockets.

use log::{debug, info, warn};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Characters escaped in the user id segment of a route
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Where clients reach an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointAddress {
    /// WebSocket route on the HTTP listener
    Route(String),
    /// Dedicated TCP listener
    Socket(SocketAddr),
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointAddress::Route(path) => write!(f, "{}", path),
            EndpointAddress::Socket(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// Connection endpoint for one user.
pub struct ConnectionEndpoint {
    user_id: String,
    address: EndpointAddress,
    events: broadcast::Sender<String>,
    acceptor: Option<JoinHandle<()>>,
}

impl ConnectionEndpoint {
    /// Route path for a user's WebSocket endpoint.
    pub fn route_for(user_id: &str) -> String {
        format!("/ws/{}", utf8_percent_encode(user_id, PATH_SEGMENT))
    }

    /// Creates a channel endpoint routed through the HTTP listener.
    pub fn channel(user_id: &str, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            user_id: user_id.to_string(),
            address: EndpointAddress::Route(Self::route_for(user_id)),
            events,
            acceptor: None,
        }
    }

    /// Creates a tcp endpoint around an already bound listener and starts
    /// accepting on it. Must be called from within a tokio runtime.
    pub fn tcp(
        user_id: &str,
        listener: TcpListener,
        local_addr: SocketAddr,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity);
        let acceptor = tokio::spawn(accept_loop(listener, events.clone(), user_id.to_string()));

        Self {
            user_id: user_id.to_string(),
            address: EndpointAddress::Socket(local_addr),
            events,
            acceptor: Some(acceptor),
        }
    }

    // --- Accessors ---

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn address(&self) -> &EndpointAddress {
        &self.address
    }

    /// Returns the bound socket for tcp endpoints.
    pub fn socket(&self) -> Option<SocketAddr> {
        match self.address {
            EndpointAddress::Socket(addr) => Some(addr),
            EndpointAddress::Route(_) => None,
        }
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    // --- Events ---

    /// Attaches a new subscriber to this endpoint's event channel.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    /// Sends an event to every subscriber, returning how many received it.
    pub fn publish(&self, event: impl Into<String>) -> usize {
        self.events.send(event.into()).unwrap_or(0)
    }
}

impl Drop for ConnectionEndpoint {
    fn drop(&mut self) {
        // Dropping the acceptor task releases the listener and its port
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
            debug!("Stopped acceptor for user {}", self.user_id);
        }
    }
}

impl fmt::Debug for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEndpoint")
            .field("user_id", &self.user_id)
            .field("address", &self.address)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

async fn accept_loop(listener: TcpListener, events: broadcast::Sender<String>, user_id: String) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("User {} endpoint accepted {}", user_id, peer);
                tokio::spawn(forward_events(stream, events.subscribe()));
            }
            Err(e) => {
                warn!("User {} endpoint accept failed: {}", user_id, e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

/// Writes each event to the stream as one line until either side goes away.
async fn forward_events(mut stream: TcpStream, mut events: broadcast::Receiver<String>) {
    let (mut reader, mut writer) = stream.split();
    let mut discard = [0u8; 512];

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let line = format!("{}\n", event);
                    if writer.write_all(line.as_bytes()).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            // Client input is ignored; EOF or an error means it disconnected
            read = reader.read(&mut discard) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            },
        }
    }

    debug!("Subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_endpoint_is_routed_by_user() {
        let endpoint = ConnectionEndpoint::channel("alice", 4);
        assert_eq!(
            endpoint.address(),
            &EndpointAddress::Route("/ws/alice".to_string())
        );
        assert_eq!(endpoint.socket(), None);
        assert_eq!(endpoint.address().to_string(), "/ws/alice");
    }

    #[test]
    fn route_escapes_reserved_characters() {
        assert_eq!(
            ConnectionEndpoint::route_for("team/a?b#c%d"),
            "/ws/team%2Fa%3Fb%23c%25d"
        );
        assert_eq!(
            ConnectionEndpoint::route_for("josé"),
            "/ws/jos%C3%A9"
        );
        assert_eq!(
            ConnectionEndpoint::route_for("2b6f-ab_c.d~e"),
            "/ws/2b6f-ab_c.d~e"
        );
    }

    #[test]
    fn publish_reaches_subscribers() {
        let endpoint = ConnectionEndpoint::channel("alice", 4);
        assert_eq!(endpoint.publish("nobody listening"), 0);

        let mut first = endpoint.subscribe();
        let mut second = endpoint.subscribe();
        assert_eq!(endpoint.subscriber_count(), 2);
        assert_eq!(endpoint.publish("hello"), 2);

        assert_eq!(first.try_recv().unwrap(), "hello");
        assert_eq!(second.try_recv().unwrap(), "hello");
    }
}
