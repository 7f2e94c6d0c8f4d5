//! # Realm Hub - Room-Scoped Broadcast Infrastructure
//!
//! A real-time broadcast hub that groups WebSocket connections into named
//! realms (rooms) and fans messages out to every connection in a realm.
//! This crate handles core networking and membership only; all realm
//! behavior (games, chat rules, whatever lives inside a room) is delegated
//! to a [`RealmHandler`] implementation supplied by the embedding
//! application.
//!
//! ## Design Philosophy
//!
//! The hub core contains **NO application logic** - it only provides
//! infrastructure:
//!
//! * **WebSocket connection management** - Handshake, token authentication,
//!   per-connection read/write pumps with keep-alive pings
//! * **Realm membership** - A single-writer registry mapping realms to
//!   their live connections
//! * **Message fan-out** - Non-blocking broadcast with forced disconnect of
//!   unresponsive consumers
//! * **Lifecycle dispatch** - Realm creation/join/leave/deletion callbacks
//!   into the registered handler
//!
//! ## Architecture Overview
//!
//! All structural mutation of the realm registry flows through one event
//! loop ([`RealmHub::run`]) consuming a command queue. Register,
//! unregister, inbound dispatch, and broadcast are therefore serialized:
//! a message is never processed concurrently with a membership change for
//! the same realm, and the registry needs no lock of its own.
//!
//! ### Message Flow
//!
//! 1. Client connects to the WebSocket endpoint with an authentication
//!    token carrying its realm and username
//! 2. The connection task registers with the hub; the hub creates the
//!    realm on first join and notifies the handler
//! 3. Inbound frames are decoded into a [`Message`], stamped server-side
//!    with the authenticated sender and realm, and handed to the hub
//! 4. The hub routes handler-bound types (table commands, guesses) to the
//!    [`RealmHandler`] and broadcasts everything else verbatim
//! 5. The handler emits its own broadcasts back through a [`MessageSender`]
//!
//! ### Backpressure
//!
//! Delivery is best-effort. Each connection owns a bounded outbound
//! queue; a connection whose queue is full at broadcast time is treated
//! as unresponsive and forcibly unregistered rather than allowed to stall
//! fan-out to the rest of the realm.

// Re-export core types and functions for easy access
pub use config::HubConfig;
pub use error::HubError;
pub use hub::{ConnectionId, HubCommands, HubHandle, HubStats, RealmConnection, RealmHub};
pub use message::{Message, MessageSender, MessageType, Realm, RealmHandler};
pub use server::HubServer;

// Public module declarations
pub mod auth;
pub mod config;
pub mod error;
pub mod hub;
pub mod message;
pub mod server;

// Internal modules (not part of public API)
mod tests;
