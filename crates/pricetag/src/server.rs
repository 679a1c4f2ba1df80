//! `PricetagServer` builder and server loop.
//!
//! This is the entry point for running a pricetag server. It ties
//! together all the layers: transport → protocol → room → session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pricetag_protocol::{Codec, JsonCodec};
use pricetag_room::{RoomConfig, RoomRegistry};
use pricetag_session::Catalog;
use pricetag_transport::{PendingConnection, Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{PricetagError, ServerConfig};

/// Close reason sent to every player when the server stops.
const SHUTTING_DOWN: &str = "server shutting down";

const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry lock is only taken to join or leave a room.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry<C>>,
    pub(crate) codec: C,
    pub(crate) max_protocol_violations: u32,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a pricetag server.
///
/// # Example
///
/// ```rust,no_run
/// use pricetag::prelude::*;
///
/// # async fn start() -> Result<(), PricetagError> {
/// let server = PricetagServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PricetagServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    catalog: Catalog,
    max_protocol_violations: u32,
    handshake_timeout: Duration,
}

impl PricetagServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            catalog: Catalog::builtin(),
            max_protocol_violations: 5,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Takes every setting from a loaded config file.
    pub fn config(self, config: &ServerConfig) -> Self {
        self.bind(&config.bind_addr)
            .room_config(config.room_config())
            .catalog(config.catalog())
            .max_protocol_violations(config.protocol_violation_limit())
            .handshake_timeout(config.handshake_timeout())
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every new room gets.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the items every new room plays through.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets how many malformed frames in a row close a connection.
    pub fn max_protocol_violations(mut self, limit: u32) -> Self {
        self.max_protocol_violations = limit.max(1);
        self
    }

    /// How long a new connection gets to send its upgrade request.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<PricetagServer<JsonCodec>, PricetagError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        if self.catalog.is_empty() {
            tracing::warn!("catalog is empty, games cannot be started");
        }

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(self.room_config, self.catalog, JsonCodec)),
            codec: JsonCodec,
            max_protocol_violations: self.max_protocol_violations,
            handshake_timeout: self.handshake_timeout,
        });

        Ok(PricetagServer { transport, state })
    }
}

impl Default for PricetagServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running pricetag server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PricetagServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl PricetagServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PricetagServerBuilder {
        PricetagServerBuilder::new()
    }
}

impl<C> PricetagServer<C>
where
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), PricetagError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then closes every
    /// room and its connections.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), PricetagError> {
        tracing::info!(addr = ?self.local_addr().ok(), "pricetag server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer = pending.peer_addr();
                            let limit = state.handshake_timeout;
                            let conn = match tokio::time::timeout(limit, pending.upgrade()).await {
                                Ok(Ok(conn)) => conn,
                                Ok(Err(e)) => {
                                    tracing::debug!(%peer, error = %e, "handshake failed");
                                    return;
                                }
                                Err(_) => {
                                    tracing::info!(%peer, ?limit, "handshake timed out, dropping peer");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        let mut rooms = self.state.rooms.lock().await;
        rooms.shutdown_all(SHUTTING_DOWN).await;
        tracing::info!("pricetag server stopped");
        Ok(())
    }
}
