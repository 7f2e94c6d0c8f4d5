//! Hub configuration types and defaults.
//!
//! This module contains the hub configuration structure and default values
//! used to initialize and customize hub and transport behavior.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration structure for the realm hub and its WebSocket transport.
///
/// Contains all necessary parameters to configure network binding,
/// per-connection buffering, frame limits, and keep-alive timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Secret key used to verify connection tokens
    pub secret_key: String,

    /// Outbound frames queued per connection before it is considered
    /// unresponsive and dropped by a broadcast
    pub send_buffer_size: usize,

    /// Maximum inbound message size in bytes
    pub max_message_size: usize,

    /// Time allowed to write a single frame to a peer, in seconds
    pub write_timeout_secs: u64,

    /// Time allowed between inbound frames before a connection is
    /// considered dead, in seconds. Pings are sent at 9/10 of this period.
    pub pong_timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".parse().expect("Invalid default bind address"),
            secret_key: String::new(),
            send_buffer_size: 256,
            max_message_size: 512,
            write_timeout_secs: 10,
            pong_timeout_secs: 60,
        }
    }
}
