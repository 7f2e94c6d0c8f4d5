//! WebSocket server implementation and connection handling.
//!
//! This module contains the accept loop and the logic for handling
//! individual client connections and their lifecycle.

pub mod core;
pub mod handlers;

pub use core::HubServer;
