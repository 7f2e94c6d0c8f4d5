//! Core WebSocket server implementation.
//!
//! This module contains the `HubServer` struct, which binds the listening
//! socket, accepts connections, and spawns a handler task per client.

use crate::{config::HubConfig, error::HubError, hub::HubHandle, server::handlers::handle_connection};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// The WebSocket front end of the realm hub.
///
/// `HubServer` owns the TCP accept loop. Each accepted socket gets its own
/// task that performs the WebSocket handshake, authenticates the client's
/// connection token, and then pumps messages between the socket and the
/// hub via a [`HubHandle`]. The server never touches realm state directly;
/// all membership flows through the hub's command queue.
pub struct HubServer {
    /// Server configuration settings
    config: HubConfig,

    /// Handle used by connection tasks to reach the hub loop
    hub: HubHandle,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl HubServer {
    /// Creates a new server for the given configuration and hub handle.
    pub fn new(config: HubConfig, hub: HubHandle) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        Self {
            config,
            hub,
            shutdown_sender,
        }
    }

    /// Binds the configured address and accepts connections until
    /// [`shutdown`](HubServer::shutdown) is called or the listener fails.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the accept loop has stopped cleanly, or a
    /// [`HubError::Network`] if the listener could not be created.
    pub async fn run(&self) -> Result<(), HubError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| HubError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))?;
        info!("🚀 Accepting connections on {}", self.config.bind_address);

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let hub = self.hub.clone();
                            let config = self.config.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, addr, hub, config).await {
                                    debug!("Connection from {} ended: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            break;
                        }
                    }
                }
                _ = shutdown_receiver.recv() => {
                    info!("🛑 Accept loop stopping - shutdown requested");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    /// Initiates server shutdown, stopping the accept loop. Connections
    /// already established keep running until their sockets close.
    pub fn shutdown(&self) {
        let _ = self.shutdown_sender.send(());
    }
}
