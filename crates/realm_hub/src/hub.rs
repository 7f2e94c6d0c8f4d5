//! The single-writer realm hub actor.
//!
//! This module provides the central authority for realm membership and
//! message broadcast. All mutation flows through one event loop consuming
//! a command queue, so the realm registry is safe without a lock and a
//! message is never processed concurrently with a membership change for
//! the same realm.

use crate::message::{Message, MessageSender, MessageType, Realm, RealmHandler};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

/// Type alias for connection identifiers.
///
/// Connection IDs are used to uniquely identify client connections
/// throughout their lifecycle on the server. A single user may hold
/// several concurrent connections, each with its own ID.
pub type ConnectionId = Uuid;

/// A registered connection as the hub sees it: an identity plus a bounded
/// outbound queue of serialized frames. The hub references connections,
/// it never owns the underlying socket; dropping the queue sender is the
/// signal for the transport to close.
#[derive(Debug)]
pub struct RealmConnection {
    /// Unique identifier for this connection
    pub id: ConnectionId,

    /// The authenticated username behind this connection
    pub username: String,

    /// Bounded queue of serialized outbound frames
    pub outbound: mpsc::Sender<String>,
}

/// Point-in-time hub counters, served from the hub loop itself. Because
/// the command queue is FIFO, a stats reply reflects every command sent
/// before the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Number of live realms
    pub realms: usize,
    /// Number of registered connections across all realms
    pub connections: usize,
    /// Total broadcasts fanned out since startup
    pub broadcasts: u64,
}

/// Commands consumed by the hub event loop.
enum HubCommand {
    Register {
        realm: Realm,
        conn: RealmConnection,
    },
    Unregister {
        realm: Realm,
        conn_id: ConnectionId,
    },
    Inbound(Message),
    Broadcast(Message),
    Stats(oneshot::Sender<HubStats>),
}

/// The receiving half of the hub's command queue.
///
/// Produced by [`RealmHub::channel`] and consumed by [`RealmHub::new`];
/// opaque so the command set stays internal to this crate.
pub struct HubCommands {
    rx: mpsc::UnboundedReceiver<HubCommand>,
}

/// A cloneable handle for feeding the hub's command queue.
///
/// Every operation is a non-blocking enqueue; the hub loop applies them
/// in order. Handles are held by connection tasks, the application layer
/// (as its [`MessageSender`]), and the embedding application.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    /// Registers a connection with a realm, creating the realm if this is
    /// its first member.
    pub fn register(&self, realm: Realm, conn: RealmConnection) {
        self.send(HubCommand::Register { realm, conn });
    }

    /// Removes a connection from a realm. Unregistering a connection that
    /// is not present is a no-op, so duplicate unregisters from racing
    /// close paths are harmless.
    pub fn unregister(&self, realm: Realm, conn_id: ConnectionId) {
        self.send(HubCommand::Unregister { realm, conn_id });
    }

    /// Hands an inbound, server-stamped message to the hub for routing.
    pub fn inbound(&self, msg: Message) {
        self.send(HubCommand::Inbound(msg));
    }

    /// Requests current hub counters. Returns `None` if the hub loop has
    /// stopped.
    pub async fn stats(&self) -> Option<HubStats> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Stats(tx));
        rx.await.ok()
    }

    fn send(&self, cmd: HubCommand) {
        if self.commands.send(cmd).is_err() {
            warn!("Hub command dropped: hub loop is no longer running");
        }
    }
}

impl MessageSender for HubHandle {
    fn broadcast_message(&self, realm: &Realm, mtype: MessageType, data: String) {
        self.send(HubCommand::Broadcast(Message::server(
            realm.clone(),
            mtype,
            data,
        )));
    }
}

/// The hub actor owning the realm → connection-set registry.
///
/// Constructed from a command queue and a [`RealmHandler`], then driven by
/// [`run`](RealmHub::run) on its own task. Lifecycle callbacks are awaited
/// inline on the loop: `realm_creation` completes before the join that
/// triggered it is dispatched, so per-realm state is ready by the time the
/// handler sees the first user.
pub struct RealmHub {
    realms: HashMap<Realm, HashMap<ConnectionId, RealmConnection>>,
    commands: mpsc::UnboundedReceiver<HubCommand>,
    handler: Arc<dyn RealmHandler>,
    broadcasts: u64,
}

impl RealmHub {
    /// Creates the hub command queue.
    ///
    /// The [`HubHandle`] may be cloned freely and handed out before the
    /// hub itself is constructed, which lets the handler hold the hub's
    /// sender side.
    pub fn channel() -> (HubHandle, HubCommands) {
        let (tx, rx) = mpsc::unbounded_channel();
        (HubHandle { commands: tx }, HubCommands { rx })
    }

    /// Creates a hub over the given command queue, dispatching lifecycle
    /// events to `handler`.
    pub fn new(commands: HubCommands, handler: Arc<dyn RealmHandler>) -> Self {
        Self {
            realms: HashMap::new(),
            commands: commands.rx,
            handler,
            broadcasts: 0,
        }
    }

    /// Runs the hub event loop until every [`HubHandle`] is dropped.
    pub async fn run(mut self) {
        while let Some(cmd) = self.commands.recv().await {
            match cmd {
                HubCommand::Register { realm, conn } => self.register(realm, conn).await,
                HubCommand::Unregister { realm, conn_id } => {
                    self.unregister(&realm, conn_id).await
                }
                HubCommand::Inbound(msg) => self.dispatch(msg).await,
                HubCommand::Broadcast(msg) => self.broadcast(msg).await,
                HubCommand::Stats(reply) => {
                    let _ = reply.send(self.stats());
                }
            }
        }
        debug!("Hub loop stopped: all handles dropped");
    }

    fn stats(&self) -> HubStats {
        HubStats {
            realms: self.realms.len(),
            connections: self.realms.values().map(HashMap::len).sum(),
            broadcasts: self.broadcasts,
        }
    }

    /// Adds a connection to a realm's set, creating the realm first if
    /// needed. `realm_creation` is awaited before the membership update so
    /// realm state exists before any join is observed.
    async fn register(&mut self, realm: Realm, conn: RealmConnection) {
        let first_user = self.realms.get(&realm).map_or(true, HashMap::is_empty);
        if !self.realms.contains_key(&realm) {
            debug!("🆕 Creating realm {}", realm);
            self.realms.insert(realm.clone(), HashMap::new());
            self.handler.realm_creation(realm.clone()).await;
        }

        let conn_id = conn.id;
        let username = conn.username.clone();
        if let Some(conns) = self.realms.get_mut(&realm) {
            conns.insert(conn_id, conn);
        }
        debug!(
            "🔗 Registered {} ({}) in realm {} (first_user: {})",
            username, conn_id, realm, first_user
        );
        self.handler
            .realm_join(realm, &username, conn_id, first_user)
            .await;
    }

    /// Removes a connection, notifying the handler and deleting the realm
    /// when its set empties. Dropping the removed connection closes its
    /// outbound queue, which is the transport's signal to shut the socket.
    async fn unregister(&mut self, realm: &Realm, conn_id: ConnectionId) {
        let removed = match self.realms.get_mut(realm) {
            Some(conns) => conns.remove(&conn_id),
            None => None,
        };
        let Some(conn) = removed else {
            // Already gone; duplicate unregister from a racing close path.
            trace!("Unregister for unknown connection {} in realm {}", conn_id, realm);
            return;
        };

        debug!("❌ Unregistered {} ({}) from realm {}", conn.username, conn_id, realm);
        self.handler
            .realm_leave(realm.clone(), &conn.username, conn_id)
            .await;

        if self.realms.get(realm).is_some_and(HashMap::is_empty) {
            self.realms.remove(realm);
            debug!("🗑️ Deleting empty realm {}", realm);
            self.handler.realm_deletion(realm.clone()).await;
        }
    }

    /// Routes an inbound message: handler-bound types go to the realm
    /// handler, private messages are suppressed, and everything else is
    /// fanned out verbatim.
    async fn dispatch(&mut self, msg: Message) {
        if msg.mtype.handler_bound() {
            self.handler.handle_message(msg).await;
        } else if msg.mtype.broadcastable() {
            self.broadcast(msg).await;
        } else {
            trace!("Suppressing private message from {}", msg.from);
        }
    }

    /// Delivers a message to every connection in its realm.
    ///
    /// Delivery is non-blocking per connection: a full outbound queue
    /// marks that connection unresponsive and it is forcibly unregistered
    /// (taking the normal leave/deletion path) instead of stalling the
    /// rest of the realm.
    async fn broadcast(&mut self, msg: Message) {
        let raw = match serde_json::to_string(&msg) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to serialize broadcast for realm {}: {}", msg.realm, e);
                return;
            }
        };

        let mut stalled = Vec::new();
        match self.realms.get(&msg.realm) {
            Some(conns) => {
                for conn in conns.values() {
                    if conn.outbound.try_send(raw.clone()).is_err() {
                        stalled.push((conn.id, conn.username.clone()));
                    }
                }
                self.broadcasts += 1;
                trace!("📡 Broadcast {:?} to {} connections in realm {}", msg.mtype, conns.len(), msg.realm);
            }
            None => {
                trace!("Broadcast to unknown realm {}", msg.realm);
                return;
            }
        }

        for (conn_id, username) in stalled {
            warn!(
                "🐌 Disconnecting unresponsive connection {} ({}) in realm {}",
                username, conn_id, msg.realm
            );
            self.unregister(&msg.realm, conn_id).await;
        }
    }
}
