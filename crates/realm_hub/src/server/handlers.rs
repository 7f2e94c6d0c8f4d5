//! Connection handling logic for WebSocket clients.
//!
//! This module manages the lifecycle of one client connection: handshake,
//! token authentication, hub registration, the read loop, the write pump
//! with keep-alive pings, and cleanup.

use crate::{
    auth::validate_ws_request,
    config::HubConfig,
    error::HubError,
    hub::{ConnectionId, HubHandle, RealmConnection},
    message::Message,
};
use futures::{SinkExt, StreamExt};
use futures_util::stream::{SplitSink, SplitStream};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    accept_hdr_async_with_config,
    tungstenite::{
        handshake::server::{Request, Response},
        protocol::WebSocketConfig,
        Bytes, Message as WsMessage,
    },
    WebSocketStream,
};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Handles a single client connection from establishment to cleanup.
///
/// # Connection Flow
///
/// 1. Perform the WebSocket handshake, capturing the request query string
/// 2. Validate the connection token; unauthenticated sockets are dropped
///    without ever registering
/// 3. Register the connection with the hub under its authenticated realm
/// 4. Run the read loop and the write pump concurrently until either side
///    finishes; whichever ends first tears the socket down
/// 5. Unregister from the hub on the way out
///
/// Read errors, decode errors, and idle timeouts terminate only this
/// connection. The hub tolerates the duplicate unregister that can result
/// from a forced disconnect racing this cleanup path.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: HubHandle,
    config: HubConfig,
) -> Result<(), HubError> {
    let ws_config = WebSocketConfig::default()
        .max_message_size(Some(config.max_message_size))
        .max_frame_size(Some(config.max_message_size));

    // The token rides on the upgrade request's query string, so capture it
    // during the handshake.
    let mut query = String::new();
    let ws_stream = accept_hdr_async_with_config(
        stream,
        |req: &Request, resp: Response| {
            query = req.uri().query().unwrap_or_default().to_string();
            Ok(resp)
        },
        Some(ws_config),
    )
    .await
    .map_err(|e| HubError::Network(format!("WebSocket handshake failed: {e}")))?;

    let creds = match validate_ws_request(&query, &config.secret_key, unix_now()) {
        Ok(creds) => creds,
        Err(e) => {
            warn!("🔒 Rejecting connection from {}: {}", addr, e);
            return Err(e);
        }
    };

    let connection_id: ConnectionId = Uuid::new_v4();
    let (ws_sender, ws_receiver) = ws_stream.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(config.send_buffer_size);

    info!(
        "🔗 Connection {} for {} in realm {} from {}",
        connection_id, creds.username, creds.realm, addr
    );
    hub.register(
        creds.realm.clone(),
        RealmConnection {
            id: connection_id,
            username: creds.username.clone(),
            outbound: outbound_tx,
        },
    );

    // Run both pumps until one finishes. When the hub drops this
    // connection the write pump ends, and abandoning the read half here is
    // what actually closes the socket; a client-side close or read error
    // ends the read pump first and tears down the writer the same way.
    tokio::select! {
        _ = read_pump(ws_receiver, &hub, &creds, connection_id, &config) => {},
        _ = write_pump(ws_sender, outbound_rx, &config) => {},
    }

    hub.unregister(creds.realm, connection_id);
    Ok(())
}

/// Pumps frames from the WebSocket connection to the hub.
///
/// Decodes each text frame into a [`Message`], stamps the authenticated
/// identity over whatever the client claimed, and hands it to the hub.
/// Returns when the client closes, errs, sends something undecodable, or
/// goes quiet past the pong deadline.
async fn read_pump(
    mut ws_receiver: SplitStream<WebSocketStream<TcpStream>>,
    hub: &HubHandle,
    creds: &crate::auth::Credentials,
    connection_id: ConnectionId,
    config: &HubConfig,
) {
    // Any inbound frame (pongs included) refreshes the idle deadline;
    // tungstenite answers client pings on its own.
    let pong_wait = Duration::from_secs(config.pong_timeout_secs);
    loop {
        let frame = match tokio::time::timeout(pong_wait, ws_receiver.next()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(_) => {
                debug!("⏱️ Connection {} idle past the pong deadline", connection_id);
                return;
            }
        };

        match frame {
            Ok(WsMessage::Text(text)) => {
                let mut msg: Message = match serde_json::from_str(text.as_str()) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("Dropping connection {}: undecodable message: {}", connection_id, e);
                        return;
                    }
                };
                // Stamp the authenticated identity; client-supplied values
                // are never trusted for these fields.
                msg.realm = creds.realm.clone();
                msg.from = creds.username.clone();
                trace!("📨 {:?} message from {} in realm {}", msg.mtype, msg.from, msg.realm);
                hub.inbound(msg);
            }
            Ok(WsMessage::Close(_)) => {
                debug!("🔌 Client {} requested close", connection_id);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error for connection {}: {}", connection_id, e);
                return;
            }
        }
    }
}

/// Pumps frames from the hub to the WebSocket connection.
///
/// Sends queued text frames with a per-frame write deadline and pings the
/// peer at 9/10 of the pong window. A closed queue means the hub has let
/// go of this connection; the pump says goodbye with a close frame and
/// returns.
async fn write_pump(
    mut sink: SplitSink<WebSocketStream<TcpStream>, WsMessage>,
    mut outbound: mpsc::Receiver<String>,
    config: &HubConfig,
) {
    let write_wait = Duration::from_secs(config.write_timeout_secs);
    let ping_period = Duration::from_secs(config.pong_timeout_secs * 9 / 10);
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + ping_period, ping_period);

    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(raw) => {
                    match tokio::time::timeout(write_wait, sink.send(WsMessage::Text(raw.into()))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            debug!("Write failed: {}", e);
                            return;
                        }
                        Err(_) => {
                            debug!("Write timed out");
                            return;
                        }
                    }
                }
                None => {
                    let _ = tokio::time::timeout(write_wait, sink.send(WsMessage::Close(None))).await;
                    return;
                }
            },
            _ = ping.tick() => {
                let sent = tokio::time::timeout(write_wait, sink.send(WsMessage::Ping(Bytes::new()))).await;
                if !matches!(sent, Ok(Ok(()))) {
                    debug!("Ping failed; closing write pump");
                    return;
                }
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
