//! Room actor: an isolated Tokio task that owns one room's game.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. Nothing else touches the session, so there
//! is no lock around it: the actor's command queue is the serialisation
//! point for joins, leaves, intents, and timer ticks alike.

use std::ops::ControlFlow;
use std::sync::Arc;

use pricetag_protocol::{ClientMessage, Codec, Item, Phase, RoomCode, ServerMessage, Snapshot};
use pricetag_session::{Session, SessionError};
use pricetag_tick::{RoundTimer, TickInfo};
use pricetag_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{RoomConfig, RoomError};

/// An outbound message from the room actor to a player's connection handler.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOutbound {
    /// An encoded `STATE_UPDATE`. Every player in the room gets the same
    /// allocation.
    Frame(Arc<str>),
    /// Close the connection with this reason.
    Close(String),
}

/// Channel sender for delivering outbound messages to a player.
pub type OutboundSender = mpsc::UnboundedSender<RoomOutbound>;

/// A player's seat in a room: who they are and how to reach them.
///
/// The connection handler keeps the receiving end of `outbound` and
/// forwards everything on it to the socket.
#[derive(Debug, Clone)]
pub struct PlayerConnection {
    pub name: String,
    /// Distinguishes this connection from a later one using the same
    /// name, so a stale connection can't act for or evict its successor.
    pub connection_id: ConnectionId,
    pub outbound: OutboundSender,
}

impl PlayerConnection {
    pub fn new(name: impl Into<String>, connection_id: ConnectionId, outbound: OutboundSender) -> Self {
        Self {
            name: name.into(),
            connection_id,
            outbound,
        }
    }

    fn is(&self, name: &str, connection_id: ConnectionId) -> bool {
        self.connection_id == connection_id && self.name == name
    }
}

/// Commands sent to a room actor through its channel.
///
/// Variants that carry a `oneshot::Sender` expect a reply; the rest are
/// fire-and-forget.
pub(crate) enum RoomCommand {
    /// Seat a player.
    Join {
        connection: PlayerConnection,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a player. Replies with how many players remain.
    Leave {
        name: String,
        connection_id: ConnectionId,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    /// A player's game intent.
    Intent {
        name: String,
        connection_id: ConnectionId,
        intent: ClientMessage,
    },

    /// Request the current snapshot.
    Snapshot { reply: oneshot::Sender<Snapshot> },

    /// Close every connection with `reason` and stop.
    Shutdown { reason: String },
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone: it's an `mpsc::Sender` wrapper. The registry holds
/// one per room, and each connection handler caches one for its intents.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Seats a player. The first player in an empty room becomes host.
    ///
    /// # Errors
    /// [`RoomError::Locked`], [`RoomError::Full`], [`RoomError::NameTaken`],
    /// or [`RoomError::Unavailable`] if the actor is gone.
    pub async fn join(&self, connection: PlayerConnection) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                connection,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player seated through `connection_id`. Returns the
    /// number of players left.
    pub async fn leave(&self, name: &str, connection_id: ConnectionId) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                name: name.to_owned(),
                connection_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Delivers a player's intent (fire-and-forget).
    ///
    /// Refused intents are logged by the actor and otherwise ignored.
    pub async fn send_intent(
        &self,
        name: &str,
        connection_id: ConnectionId,
        intent: ClientMessage,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Intent {
                name: name.to_owned(),
                connection_id,
                intent,
            })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Requests the room's current state.
    pub async fn snapshot(&self) -> Result<Snapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to close every connection and stop.
    pub async fn shutdown(&self, reason: impl Into<String>) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown {
                reason: reason.into(),
            })
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<C: Codec> {
    code: RoomCode,
    config: RoomConfig,
    session: Session,
    /// Outbound channels, in join order.
    connections: Vec<PlayerConnection>,
    timer: RoundTimer,
    /// The session's timer epoch the timer was last synced to.
    timer_epoch: u64,
    codec: Arc<C>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<C: Codec> RoomActor<C> {
    /// Runs the actor loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(room = %self.code, items = self.session.items().len(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if self.handle_command(cmd).is_break() {
                        break;
                    }
                }
                info = self.timer.wait_for_tick() => self.handle_tick(info),
            }
        }

        self.timer.disarm();
        tracing::info!(room = %self.code, "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        match cmd {
            RoomCommand::Join { connection, reply } => {
                let result = self.handle_join(connection);
                let _ = reply.send(result);
            }
            RoomCommand::Leave {
                name,
                connection_id,
                reply,
            } => {
                let result = self.handle_leave(&name, connection_id);
                let _ = reply.send(result);
            }
            RoomCommand::Intent {
                name,
                connection_id,
                intent,
            } => self.handle_intent(&name, connection_id, intent),
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            RoomCommand::Shutdown { reason } => {
                self.close_all(&reason);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_join(&mut self, connection: PlayerConnection) -> Result<(), RoomError> {
        if self.session.phase() == Phase::GameOver {
            return Err(RoomError::Locked(self.code.clone()));
        }
        if !self.config.has_room_for(self.connections.len()) {
            return Err(RoomError::Full(self.code.clone()));
        }
        match self.session.add_player(&connection.name) {
            Ok(_) => {}
            Err(SessionError::DuplicateName(name)) => {
                return Err(RoomError::NameTaken {
                    name,
                    room: self.code.clone(),
                });
            }
            Err(e) => {
                tracing::warn!(room = %self.code, player = %connection.name, error = %e, "join refused");
                return Err(RoomError::Unavailable(self.code.clone()));
            }
        }

        tracing::debug!(
            room = %self.code,
            player = %connection.name,
            conn = %connection.connection_id,
            players = self.connections.len() + 1,
            "connection seated"
        );
        self.connections.push(connection);
        self.after_change();
        Ok(())
    }

    fn handle_leave(&mut self, name: &str, connection_id: ConnectionId) -> Result<usize, RoomError> {
        let Some(index) = self.connections.iter().position(|c| c.is(name, connection_id)) else {
            return Err(RoomError::NotInRoom {
                name: name.to_owned(),
                room: self.code.clone(),
            });
        };
        self.connections.remove(index);

        if let Err(e) = self.session.remove_player(name) {
            tracing::warn!(room = %self.code, player = %name, error = %e, "seated player missing from session");
        }
        self.after_change();
        Ok(self.connections.len())
    }

    fn handle_intent(&mut self, name: &str, connection_id: ConnectionId, intent: ClientMessage) {
        if !self.connections.iter().any(|c| c.is(name, connection_id)) {
            tracing::warn!(
                room = %self.code,
                player = %name,
                conn = %connection_id,
                "intent from a connection not seated here, ignoring"
            );
            return;
        }

        let kind = intent.kind();
        let result = match intent {
            ClientMessage::StartGame => self.session.start_game(name),
            ClientMessage::Guess(value) => self.session.guess(name, value),
            ClientMessage::ResetGame => self.session.reset_game(name),
        };

        match result {
            Ok(()) => self.after_change(),
            Err(e) if e.is_authorization() || e.is_state() => {
                tracing::debug!(room = %self.code, player = %name, intent = kind, reason = %e, "intent refused");
            }
            Err(e) => {
                tracing::info!(room = %self.code, player = %name, intent = kind, reason = %e, "intent rejected");
            }
        }
    }

    fn handle_tick(&mut self, info: TickInfo) {
        match self.session.tick() {
            Ok(()) => {
                tracing::trace!(room = %self.code, tick = info.tick, time_left = self.session.time_left(), "tick");
                self.after_change();
            }
            Err(e) => {
                // The countdown was stopped without the epoch moving on.
                tracing::debug!(room = %self.code, reason = %e, "stray tick, disarming");
                self.timer.disarm();
            }
        }
    }

    /// Re-syncs the timer and broadcasts the new state.
    fn after_change(&mut self) {
        self.sync_timer();
        self.broadcast();
    }

    /// Restarts the countdown cadence whenever the session reloads its
    /// countdown, and parks it outside the timed phases.
    ///
    /// Re-arming replaces any tick still pending for the previous phase,
    /// which is what keeps an early-resolved round from also expiring.
    fn sync_timer(&mut self) {
        let epoch = self.session.timer_epoch();
        if epoch == self.timer_epoch {
            return;
        }
        self.timer_epoch = epoch;
        if self.session.phase().is_timed() {
            self.timer.arm();
        } else {
            self.timer.disarm();
        }
    }

    /// Encodes the snapshot once and fans it out to every connection.
    fn broadcast(&self) {
        if self.connections.is_empty() {
            return;
        }
        let message = ServerMessage::StateUpdate(self.session.snapshot());
        let frame: Arc<str> = match self.codec.encode_text(&message) {
            Ok(text) => text.into(),
            Err(e) => {
                tracing::error!(room = %self.code, error = %e, "failed to encode state update");
                return;
            }
        };
        for connection in &self.connections {
            // A closed receiver means the handler is on its way out and
            // will send its own leave.
            let _ = connection.outbound.send(RoomOutbound::Frame(Arc::clone(&frame)));
        }
    }

    fn close_all(&mut self, reason: &str) {
        tracing::info!(room = %self.code, players = self.connections.len(), %reason, "room shutting down");
        for connection in self.connections.drain(..) {
            let _ = connection.outbound.send(RoomOutbound::Close(reason.to_owned()));
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room<C: Codec>(
    code: RoomCode,
    config: RoomConfig,
    items: Vec<Item>,
    codec: Arc<C>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let session = Session::new(code.clone(), config.session.clone(), items);
    let actor = RoomActor {
        code: code.clone(),
        timer: RoundTimer::new(config.timer.clone()),
        timer_epoch: session.timer_epoch(),
        session,
        connections: Vec::new(),
        config,
        codec,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
