//! Per-connection handler: join, then relay frames both ways.
//!
//! Each connection runs this in its own Tokio task once its WebSocket
//! handshake has completed.
//! The flow is:
//!   1. Parse `name` and `room` from the upgrade request's query string
//!   2. Join the room through the registry (the only time the registry
//!      lock is taken, apart from leaving)
//!   3. Loop: forward decoded intents to the room, and the room's
//!      broadcasts and close requests to the socket
//!   4. On the way out, a drop guard leaves the room

use std::sync::Arc;

use pricetag_protocol::{ClientMessage, Codec, JoinRequest, RoomCode};
use pricetag_room::{PlayerConnection, RoomOutbound};
use pricetag_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::PricetagError;
use crate::server::ServerState;

/// Close reason for a client that keeps sending garbage.
const TOO_MANY_VIOLATIONS: &str = "too many invalid messages";

/// Drop guard that takes a player out of their room when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct MembershipGuard<C: Codec> {
    room: RoomCode,
    name: String,
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for MembershipGuard<C> {
    fn drop(&mut self) {
        let room = self.room.clone();
        let name = std::mem::take(&mut self.name);
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut rooms = state.rooms.lock().await;
            match rooms.leave(&room, &name, conn_id).await {
                Ok(remaining) => {
                    tracing::debug!(%room, player = %name, %conn_id, remaining, "left room");
                }
                // Already gone, e.g. the room was shut down.
                Err(e) => tracing::debug!(%room, player = %name, %conn_id, error = %e, "leave skipped"),
            }
        });
    }
}

/// Handles a single upgraded connection until it closes.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PricetagError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, target = conn.request_target(), "handling new connection");

    // --- Step 1: Who and where ---
    let JoinRequest { name, room } = match JoinRequest::from_request_target(conn.request_target()) {
        Ok(request) => request,
        Err(e) => {
            tracing::info!(%conn_id, error = %e, "rejecting connection");
            let _ = conn.close(Some(&e.to_string())).await;
            return Err(e.into());
        }
    };

    // --- Step 2: Join ---
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let seat = PlayerConnection::new(name.clone(), conn_id, outbound_tx);
    // Lock only for the join itself, drop before any socket I/O.
    let joined = {
        let mut rooms = state.rooms.lock().await;
        rooms.join(&room, seat).await
    };
    let handle = match joined {
        Ok(handle) => handle,
        Err(e) => {
            tracing::info!(%conn_id, %room, player = %name, error = %e, "join refused");
            let _ = conn.close(Some(&e.to_string())).await;
            return Err(e.into());
        }
    };
    tracing::info!(%conn_id, %room, player = %name, "player connected");

    let _guard = MembershipGuard {
        room: room.clone(),
        name: name.clone(),
        conn_id,
        state: Arc::clone(&state),
    };

    // --- Step 3: Relay ---
    let mut violations: u32 = 0;
    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, %room, player = %name, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, player = %name, error = %e, "recv error");
                        break;
                    }
                };

                match ClientMessage::decode(&state.codec, &data) {
                    Ok(intent) => {
                        violations = 0;
                        if let Err(e) = handle.send_intent(&name, conn_id, intent).await {
                            tracing::info!(%conn_id, %room, error = %e, "room went away");
                            let _ = conn.close(Some(&e.to_string())).await;
                            break;
                        }
                    }
                    Err(e) => {
                        violations += 1;
                        tracing::debug!(%conn_id, player = %name, error = %e, violations, "ignoring invalid message");
                        if violations >= state.max_protocol_violations {
                            tracing::info!(%conn_id, player = %name, "closing after repeated invalid messages");
                            let _ = conn.close(Some(TOO_MANY_VIOLATIONS)).await;
                            break;
                        }
                    }
                }
            }

            outbound = outbound_rx.recv() => match outbound {
                Some(RoomOutbound::Frame(frame)) => {
                    if let Err(e) = conn.send_text(&frame).await {
                        tracing::debug!(%conn_id, player = %name, error = %e, "send failed");
                        break;
                    }
                }
                Some(RoomOutbound::Close(reason)) => {
                    tracing::info!(%conn_id, %room, player = %name, %reason, "closed by room");
                    let _ = conn.close(Some(&reason)).await;
                    break;
                }
                None => break,
            },
        }
    }

    // _guard drops here → leave fires.
    Ok(())
}
