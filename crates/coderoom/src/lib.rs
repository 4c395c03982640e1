//! # coderoom - Room Store & Real-Time Synchronization Core
//!
//! Backing store and live relay for collaborative code editing rooms.
//!
//! Rooms live in one of two storage tiers: guest rooms are ephemeral,
//! in-memory, and die 24 hours after creation no matter what; rooms
//! created by authenticated users are durable on disk until deleted.
//! A stateless authorization policy decides who may read, write, share,
//! or delete a room, and a [`RealtimeHub`] relays live editing events
//! between the connections joined to a room.
//!
//! The HTTP/WebSocket transport is behind the `axum` feature (on by
//! default); the core compiles without it.

pub mod error;
pub mod hub;
pub mod model;
pub mod policy;
pub mod protocol;
pub mod service;
pub mod store;

#[cfg(feature = "axum")]
pub mod axum;

// Re-exports for convenience
pub use error::{RoomError, RoomResult};
pub use hub::RealtimeHub;
pub use model::{
    CreateRoom, IdentityContext, Member, Role, Room, RoomPatch, RoomType, ShareRequest, ShareRole,
};
pub use protocol::{ClientMessage, RelayEvent, ServerMessage};
pub use service::{RoomListing, RoomService};
pub use store::{DurableStore, EphemeralStore, RoomLocation, RoomRepository};

#[cfg(feature = "axum")]
pub use axum::{identity_from_headers, router, AppState, ConnectionHandler};
