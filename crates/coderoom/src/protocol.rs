use serde::{Deserialize, Serialize};

/// Messages sent from client to hub
///
/// Carried as JSON text frames, tagged by `type` with the event names the
/// editing clients already speak (`join-room`, `code-change`,
/// `language-change`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join a room's broadcast group
    JoinRoom { room_id: String },
    /// The sender's editor content changed
    CodeChange { room_id: String, code: String },
    /// The sender's editor language changed
    LanguageChange { room_id: String, language: String },
}

/// Messages sent from hub to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// A new participant joined; sent to the pre-existing members only
    UserJoined { user_email: String },
    /// Another participant's content, last write wins
    CodeUpdate { code: String, from: String },
    /// Another participant's language choice
    LanguageUpdate { language: String, from: String },
}

/// An editing event relayed through a room's broadcast group
///
/// The hub stamps the sender's display identity on it when broadcasting.
/// Relayed state is never persisted; the stores only change through an
/// explicit update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    ContentChanged { code: String },
    LanguageChanged { language: String },
}

impl RelayEvent {
    /// The outbound message for this event as sent by `from`
    pub fn into_server_message(self, from: &str) -> ServerMessage {
        match self {
            Self::ContentChanged { code } => ServerMessage::CodeUpdate {
                code,
                from: from.to_string(),
            },
            Self::LanguageChanged { language } => ServerMessage::LanguageUpdate {
                language,
                from: from.to_string(),
            },
        }
    }
}

/// Encode a message as a JSON text frame
pub fn encode_message<T: Serialize>(message: &T) -> serde_json::Result<String> {
    serde_json::to_string(message)
}

/// Decode a message from a JSON text frame
pub fn decode_message<T: for<'de> Deserialize<'de>>(frame: &str) -> serde_json::Result<T> {
    serde_json::from_str(frame)
}
