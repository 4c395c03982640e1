//! In-memory registry of live connections grouped by room.
//!
//! All participants of a room must be served by the same hub instance;
//! there is no cross-process fan-out. Broadcast is fire-and-forget: a send
//! to a dead or slow peer is dropped, never retried, and never stalls
//! delivery to the others.

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::protocol::{RelayEvent, ServerMessage};

/// Information about a live connection
pub struct ConnectionInfo {
    pub id: String,
    /// Opaque display identity shown to peers, "Guest" when absent
    pub display_name: String,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

/// Registry of live connections and the rooms they have joined
pub struct RealtimeHub {
    connections: RwLock<HashMap<String, ConnectionInfo>>,
    rooms: RwLock<HashMap<String, HashSet<String>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection, returning its id
    pub async fn register(
        &self,
        display_name: impl Into<String>,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let display_name = display_name.into();
        tracing::info!("Connection {} registered as '{}'", id, display_name);

        self.connections.write().await.insert(
            id.clone(),
            ConnectionInfo {
                id: id.clone(),
                display_name,
                sender,
            },
        );
        id
    }

    /// Remove a connection from the registry and from every room group
    ///
    /// Called on disconnect; there is no explicit leave message in the
    /// protocol.
    pub async fn unregister(&self, connection_id: &str) {
        self.connections.write().await.remove(connection_id);

        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });

        tracing::info!("Connection {} unregistered", connection_id);
    }

    /// Add a connection to a room's broadcast group
    ///
    /// Idempotent. On first join the pre-existing members are told who
    /// arrived; the joiner hears nothing, and neither do future joiners.
    pub async fn join(&self, connection_id: &str, room_id: &str) {
        let newly_joined = {
            let mut rooms = self.rooms.write().await;
            rooms
                .entry(room_id.to_string())
                .or_default()
                .insert(connection_id.to_string())
        };

        if !newly_joined {
            tracing::debug!("Connection {} re-joined room '{}'", connection_id, room_id);
            return;
        }

        let display_name = match self.connections.read().await.get(connection_id) {
            Some(info) => info.display_name.clone(),
            None => return,
        };
        tracing::info!("'{}' joined room '{}'", display_name, room_id);

        self.broadcast(
            room_id,
            connection_id,
            ServerMessage::UserJoined {
                user_email: display_name,
            },
        )
        .await;
    }

    /// Relay an editing event to every other member of the room
    ///
    /// The sender never receives its own event. The relayed state is not
    /// persisted; live-viewed and durably stored content only reconcile
    /// through an explicit update operation.
    pub async fn relay(&self, connection_id: &str, room_id: &str, event: RelayEvent) {
        let from = match self.connections.read().await.get(connection_id) {
            Some(info) => info.display_name.clone(),
            None => return,
        };

        self.broadcast(room_id, connection_id, event.into_server_message(&from))
            .await;
    }

    /// Number of connections currently joined to a room
    pub async fn room_size(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    async fn broadcast(&self, room_id: &str, exclude: &str, message: ServerMessage) {
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(room_id) else {
            return;
        };

        let connections = self.connections.read().await;
        for member_id in members {
            if member_id == exclude {
                continue;
            }
            if let Some(info) = connections.get(member_id) {
                if info.sender.send(message.clone()).is_err() {
                    tracing::warn!(
                        "Dropped message to dead connection {} in room '{}'",
                        member_id,
                        room_id
                    );
                }
            }
        }
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
