//! Message envelope and capability traits for realm communication.
//!
//! This module defines the wire format exchanged with clients and the two
//! seams between the hub and the application layer: [`RealmHandler`]
//! (implemented by the application, consumed by the hub) and
//! [`MessageSender`] (implemented by the hub, consumed by the application).

use crate::hub::ConnectionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque room identifier scoping connections, membership, and realm
/// state. Created implicitly when the first connection registers for it
/// and destroyed when the last connection leaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Realm(String);

impl Realm {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Realm {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Realm {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The set of message types understood on the wire.
///
/// `TableCmd` and `Guess` are consumed by the realm handler; `Private`
/// messages are never fanned out; every other type is broadcast verbatim
/// to the sender's realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Chat between realm members
    #[serde(rename = "chat")]
    Chat,
    /// A table command such as `"start"`; the command is in `data`
    #[serde(rename = "tableCmd")]
    TableCmd,
    /// A guess at one of the current questions
    #[serde(rename = "guess")]
    Guess,
    /// Pre-game countdown announcement; `data` is the countdown in seconds
    #[serde(rename = "countdown")]
    Countdown,
    /// The enriched question set for a starting round
    #[serde(rename = "questions")]
    Questions,
    /// The round timer duration in seconds
    #[serde(rename = "timer")]
    Timer,
    /// End-of-round announcement
    #[serde(rename = "gameover")]
    GameOver,
    /// A correct-answer event with the scorer's running total
    #[serde(rename = "score")]
    Score,
    /// A rejected request; `data` carries a stable error code
    #[serde(rename = "fail")]
    Fail,
    /// Informational message from the server
    #[serde(rename = "server")]
    Server,
    /// Message addressed to a single user; never broadcast
    #[serde(rename = "pm")]
    Private,
}

impl MessageType {
    /// Whether inbound messages of this type are routed to the realm
    /// handler instead of being fanned out.
    pub fn handler_bound(self) -> bool {
        matches!(self, MessageType::TableCmd | MessageType::Guess)
    }

    /// Whether messages of this type may be broadcast to a realm.
    pub fn broadcastable(self) -> bool {
        !matches!(self, MessageType::Private)
    }
}

/// An immutable envelope flowing between connections and the hub.
///
/// The wire shape is `{"data": ..., "type": ..., "from": ...}`. The realm
/// is carried out-of-band from the authenticated connection's session and
/// the sender is stamped server-side before dispatch, so neither can be
/// spoofed by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// String payload; semantics depend on `mtype`
    #[serde(default)]
    pub data: String,

    /// The message type
    #[serde(rename = "type")]
    pub mtype: MessageType,

    /// Sending user, populated by the server from the authenticated session
    #[serde(default)]
    pub from: String,

    /// The realm this message is scoped to; never read from the wire
    #[serde(skip)]
    pub realm: Realm,
}

impl Message {
    /// Builds a server-originated message for the given realm.
    pub fn server(realm: Realm, mtype: MessageType, data: String) -> Self {
        Self {
            data,
            mtype,
            from: String::new(),
            realm,
        }
    }
}

/// The lifecycle capability the hub dispatches into.
///
/// Implemented by the application layer (the game, for this server) and
/// stored behind a trait object in the hub, keeping the hub reusable for
/// realms with entirely different behavior.
///
/// All methods are invoked from the hub's single event loop, one at a
/// time. A slow implementation stalls traffic for every realm, so
/// implementations must stay boundedly fast; anything long-running belongs
/// on a spawned task.
#[async_trait]
pub trait RealmHandler: Send + Sync {
    /// Called with every inbound handler-bound message.
    async fn handle_message(&self, msg: Message);

    /// Called exactly once when a realm gains its first connection,
    /// before the corresponding `realm_join` is dispatched.
    async fn realm_creation(&self, realm: Realm);

    /// Called after a connection registers with a realm. `first_user` is
    /// true iff the realm had no connections before this registration.
    async fn realm_join(&self, realm: Realm, user: &str, conn_id: ConnectionId, first_user: bool);

    /// Called after a connection is removed from a realm.
    async fn realm_leave(&self, realm: Realm, user: &str, conn_id: ConnectionId);

    /// Called when a realm's last connection leaves and the realm is
    /// dropped from the registry.
    async fn realm_deletion(&self, realm: Realm);
}

/// The outbound broadcast capability handed to the application layer.
///
/// Sends are non-blocking enqueues onto the hub's command queue; actual
/// delivery happens on the hub loop under its backpressure policy.
pub trait MessageSender: Send + Sync {
    /// Broadcast a message to every connection in a realm.
    fn broadcast_message(&self, realm: &Realm, mtype: MessageType, data: String);
}
