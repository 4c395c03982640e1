use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::hub::RealtimeHub;
use crate::protocol::{decode_message, encode_message, ClientMessage, RelayEvent, ServerMessage};

/// Handles one live editing connection
///
/// Frames in both directions are JSON text. Malformed or unknown inbound
/// frames are logged and ignored; the connection stays up.
pub struct ConnectionHandler {
    socket: WebSocket,
    hub: Arc<RealtimeHub>,
    display_name: String,
}

impl ConnectionHandler {
    pub fn new(socket: WebSocket, hub: Arc<RealtimeHub>, display_name: String) -> Self {
        Self {
            socket,
            hub,
            display_name,
        }
    }

    /// Drive the connection until either side closes it
    pub async fn handle(self) {
        let (mut ws_sender, mut ws_receiver) = self.socket.split();

        // Outbox for messages broadcast to this connection.
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
        let connection_id = self.hub.register(self.display_name.clone(), tx).await;

        info!(
            "Connection {} established as '{}'",
            connection_id, self.display_name
        );

        let sender_task = {
            let connection_id = connection_id.clone();
            tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    match encode_message(&message) {
                        Ok(frame) => {
                            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(
                                "Failed to encode message for connection {}: {}",
                                connection_id, err
                            );
                        }
                    }
                }
                debug!("Sender task ended for connection {}", connection_id);
            })
        };

        let receiver_task = {
            let hub = self.hub.clone();
            let connection_id = connection_id.clone();
            tokio::spawn(async move {
                while let Some(msg) = ws_receiver.next().await {
                    match msg {
                        Ok(Message::Text(text)) => {
                            match decode_message::<ClientMessage>(&text) {
                                Ok(message) => {
                                    dispatch(&hub, &connection_id, message).await;
                                }
                                Err(err) => {
                                    debug!(
                                        "Ignoring malformed frame from connection {}: {}",
                                        connection_id, err
                                    );
                                }
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("Connection {} closed normally", connection_id);
                            break;
                        }
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                            // Axum answers pings automatically.
                        }
                        Ok(Message::Binary(_)) => {
                            debug!(
                                "Ignoring binary frame from connection {}",
                                connection_id
                            );
                        }
                        Err(err) => {
                            warn!("WebSocket error on connection {}: {}", connection_id, err);
                            break;
                        }
                    }
                }
                debug!("Receiver task ended for connection {}", connection_id);
            })
        };

        // Either task ending means the connection is done.
        tokio::select! {
            _ = sender_task => {}
            _ = receiver_task => {}
        }

        self.hub.unregister(&connection_id).await;
        info!("Connection {} disconnected", connection_id);
    }
}

/// Route a client message to the hub
async fn dispatch(hub: &RealtimeHub, connection_id: &str, message: ClientMessage) {
    match message {
        ClientMessage::JoinRoom { room_id } => {
            hub.join(connection_id, &room_id).await;
        }
        ClientMessage::CodeChange { room_id, code } => {
            hub.relay(connection_id, &room_id, RelayEvent::ContentChanged { code })
                .await;
        }
        ClientMessage::LanguageChange { room_id, language } => {
            hub.relay(
                connection_id,
                &room_id,
                RelayEvent::LanguageChanged { language },
            )
            .await;
        }
    }
}
