use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::{RoomError, RoomResult};
use crate::model::{
    generate_room_id, generate_room_name, CreateRoom, Member, Room, RoomPatch, RoomType,
};

/// Lifetime of a guest room, fixed at creation
pub const EPHEMERAL_TTL_HOURS: i64 = 24;

/// In-memory store for guest rooms with a fixed 24h lifetime
///
/// Each room carries an absolute `expires_at` instant; reads and updates
/// drop entries past it, so an expired room is indistinguishable from one
/// that never existed. Updates merge into the stored room and leave
/// `expires_at` untouched: editing a room never postpones its death.
pub struct EphemeralStore {
    rooms: DashMap<String, Room>,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Create a guest room
    ///
    /// Guest rooms are always public and owned by "anonymous", regardless
    /// of what the payload asks for.
    pub fn create(&self, payload: CreateRoom) -> Room {
        self.create_at(payload, Utc::now())
    }

    pub(crate) fn create_at(&self, payload: CreateRoom, now: DateTime<Utc>) -> Room {
        let id = generate_room_id();
        let room = Room {
            id: id.clone(),
            name: generate_room_name(),
            language: payload.language.unwrap_or_else(|| "javascript".to_string()),
            content: payload.content.unwrap_or_default(),
            created_at: now,
            owner: "anonymous".to_string(),
            room_type: RoomType::Public,
            members: vec![Member::owner("anonymous")],
            is_ephemeral: true,
            expires_at: Some(now + Duration::hours(EPHEMERAL_TTL_HOURS)),
        };

        info!("Created guest room '{}'", id);
        self.rooms.insert(id, room.clone());
        room
    }

    /// Get a guest room; expired rooms read as not found
    pub fn get(&self, id: &str) -> RoomResult<Room> {
        self.get_at(id, Utc::now())
    }

    pub(crate) fn get_at(&self, id: &str, now: DateTime<Utc>) -> RoomResult<Room> {
        // The read guard must be released before removing an expired entry,
        // or the remove deadlocks on the same shard.
        let expired_hit = match self.rooms.get(id) {
            Some(entry) => {
                if !expired(entry.value(), now) {
                    return Ok(entry.value().clone());
                }
                true
            }
            None => false,
        };

        if expired_hit {
            self.rooms.remove(id);
            debug!("Guest room '{}' expired", id);
        }
        Err(RoomError::not_found(id))
    }

    /// Merge a patch into a guest room
    ///
    /// Read-merge-write; concurrent updates race and the later write wins.
    pub fn update(&self, id: &str, patch: &RoomPatch) -> RoomResult<Room> {
        self.update_at(id, patch, Utc::now())
    }

    pub(crate) fn update_at(
        &self,
        id: &str,
        patch: &RoomPatch,
        now: DateTime<Utc>,
    ) -> RoomResult<Room> {
        let mut room = self.get_at(id, now)?;
        room.apply(patch);
        self.rooms.insert(id.to_string(), room.clone());
        Ok(room)
    }

    /// Drop every room past its expiry, returning how many were removed
    ///
    /// Expiry is also enforced lazily on read; this exists for the
    /// periodic janitor so dead rooms do not pile up unread.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub(crate) fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, room| !expired(room, now));
        let removed = before.saturating_sub(self.rooms.len());
        if removed > 0 {
            info!("Purged {} expired guest rooms", removed);
        }
        removed
    }

    /// Number of rooms currently stored, including not-yet-purged expired ones
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for EphemeralStore {
    fn default() -> Self {
        Self::new()
    }
}

fn expired(room: &Room, now: DateTime<Utc>) -> bool {
    match room.expires_at {
        Some(expires_at) => now >= expires_at,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn create_forces_public_anonymous_defaults() {
        let store = EphemeralStore::new();
        let room = store.create_at(
            CreateRoom {
                room_type: Some(RoomType::Private),
                ..Default::default()
            },
            t0(),
        );

        assert_eq!(room.room_type, RoomType::Public);
        assert_eq!(room.owner, "anonymous");
        assert!(room.is_ephemeral);
        assert_eq!(room.language, "javascript");
        assert_eq!(
            room.expires_at,
            Some(t0() + Duration::hours(EPHEMERAL_TTL_HOURS))
        );
        assert_eq!(room.members.len(), 1);
    }

    #[test]
    fn expired_room_reads_as_not_found() {
        let store = EphemeralStore::new();
        let room = store.create_at(CreateRoom::default(), t0());

        let just_before = t0() + Duration::hours(24) - Duration::seconds(1);
        assert!(store.get_at(&room.id, just_before).is_ok());

        let just_after = t0() + Duration::hours(24) + Duration::seconds(1);
        assert!(matches!(
            store.get_at(&room.id, just_after),
            Err(RoomError::NotFound { .. })
        ));
        // Removed on the expired read, not merely hidden.
        assert!(store.is_empty());
    }

    #[test]
    fn update_does_not_extend_expiry() {
        let store = EphemeralStore::new();
        let room = store.create_at(CreateRoom::default(), t0());

        let patch = RoomPatch {
            content: Some("edited".into()),
            ..Default::default()
        };
        let updated = store
            .update_at(&room.id, &patch, t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.expires_at, room.expires_at);

        // Still dead at the original deadline despite the edit.
        let after_original_expiry = t0() + Duration::hours(24) + Duration::seconds(1);
        assert!(store.get_at(&room.id, after_original_expiry).is_err());
    }

    #[test]
    fn update_of_expired_room_is_not_found() {
        let store = EphemeralStore::new();
        let room = store.create_at(CreateRoom::default(), t0());

        let patch = RoomPatch {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let late = t0() + Duration::hours(25);
        assert!(store.update_at(&room.id, &patch, late).is_err());
    }

    #[test]
    fn purge_removes_only_expired_rooms() {
        let store = EphemeralStore::new();
        let old = store.create_at(CreateRoom::default(), t0());
        let fresh = store.create_at(CreateRoom::default(), t0() + Duration::hours(12));

        let removed = store.purge_expired_at(t0() + Duration::hours(25));
        assert_eq!(removed, 1);
        assert!(store.get_at(&old.id, t0() + Duration::hours(25)).is_err());
        assert!(store
            .get_at(&fresh.id, t0() + Duration::hours(25))
            .is_ok());
    }
}
