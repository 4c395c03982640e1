//! Room persistence across two storage tiers.
//!
//! Guest rooms live in [`EphemeralStore`] with a fixed 24h lifetime;
//! authenticated-owner rooms live in [`DurableStore`] until deleted.
//! [`RoomRepository::resolve`] locates a room across both.

pub mod durable;
pub mod ephemeral;

pub use durable::DurableStore;
pub use ephemeral::{EphemeralStore, EPHEMERAL_TTL_HOURS};

use std::sync::Arc;

use crate::error::{RoomError, RoomResult};
use crate::model::Room;

/// Which tier a resolved room came from, with the room itself
///
/// Produced once by [`RoomRepository::resolve`]; callers match on it
/// instead of re-querying the tiers.
#[derive(Debug, Clone)]
pub enum RoomLocation {
    Ephemeral(Room),
    Durable(Room),
}

impl RoomLocation {
    pub fn room(&self) -> &Room {
        match self {
            Self::Ephemeral(room) | Self::Durable(room) => room,
        }
    }

    pub fn into_room(self) -> Room {
        match self {
            Self::Ephemeral(room) | Self::Durable(room) => room,
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable(_))
    }
}

/// Both storage tiers behind one lookup
pub struct RoomRepository {
    ephemeral: Arc<EphemeralStore>,
    durable: Arc<DurableStore>,
}

impl RoomRepository {
    pub fn new(ephemeral: Arc<EphemeralStore>, durable: Arc<DurableStore>) -> Self {
        Self { ephemeral, durable }
    }

    pub fn ephemeral(&self) -> &EphemeralStore {
        &self.ephemeral
    }

    pub fn durable(&self) -> &DurableStore {
        &self.durable
    }

    /// Locate a room, trying the ephemeral tier first
    ///
    /// First hit wins: a guest room shadows a durable room that happens to
    /// share its id. The tiers draw ids from the same alphabet, so a
    /// cross-tier collision is possible in principle and not guarded
    /// against.
    pub async fn resolve(&self, id: &str) -> RoomResult<RoomLocation> {
        match self.ephemeral.get(id) {
            Ok(room) => return Ok(RoomLocation::Ephemeral(room)),
            Err(RoomError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        let room = self.durable.get(id).await?;
        Ok(RoomLocation::Durable(room))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateRoom, IdentityContext};
    use tempfile::TempDir;

    async fn repo() -> (TempDir, RoomRepository) {
        let dir = TempDir::new().unwrap();
        let durable = DurableStore::open(dir.path()).await.unwrap();
        let repo = RoomRepository::new(Arc::new(EphemeralStore::new()), Arc::new(durable));
        (dir, repo)
    }

    #[tokio::test]
    async fn resolve_finds_rooms_in_either_tier() {
        let (_dir, repo) = repo().await;

        let guest = repo.ephemeral().create(CreateRoom::default());
        let durable = repo
            .durable()
            .create(CreateRoom::default(), &IdentityContext::auth("u-1", None))
            .await
            .unwrap();

        let hit = repo.resolve(&guest.id).await.unwrap();
        assert!(matches!(hit, RoomLocation::Ephemeral(_)));

        let hit = repo.resolve(&durable.id).await.unwrap();
        assert!(hit.is_durable());
        assert_eq!(hit.room().id, durable.id);
    }

    #[tokio::test]
    async fn resolve_misses_both_tiers() {
        let (_dir, repo) = repo().await;
        assert!(matches!(
            repo.resolve("nosuch").await,
            Err(RoomError::NotFound { .. })
        ));
    }
}
