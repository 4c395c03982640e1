use thiserror::Error;

/// Result type for room operations
pub type RoomResult<T> = Result<T, RoomError>;

/// Errors that can occur in room operations
///
/// The transport layer maps these onto HTTP statuses: `NotFound` -> 404,
/// `Validation` -> 400, `Forbidden` -> 403, `UpstreamStore` -> 500.
#[derive(Error, Debug)]
pub enum RoomError {
    #[error("room not found: {id}")]
    NotFound { id: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("upstream store error: {0}")]
    UpstreamStore(String),
}

impl RoomError {
    /// Shorthand for a `NotFound` on the given room id
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for RoomError {
    fn from(err: std::io::Error) -> Self {
        Self::UpstreamStore(err.to_string())
    }
}

impl From<serde_json::Error> for RoomError {
    fn from(err: serde_json::Error) -> Self {
        Self::UpstreamStore(format!("corrupt room record: {}", err))
    }
}
