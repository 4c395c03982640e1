use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info};

use crate::error::{RoomError, RoomResult};
use crate::model::{
    generate_room_id, generate_room_name, is_valid_room_id, CreateRoom, IdentityContext, Member,
    Room, RoomPatch, RoomType,
};

/// Durable store for authenticated-owner rooms
///
/// One JSON document per room at `<root>/<id>.json`. Rooms persist until
/// explicitly deleted; there is no expiry. Updates are read-merge-write,
/// so concurrent writers to the same room race last-write-wins.
pub struct DurableStore {
    root: PathBuf,
}

impl DurableStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> RoomResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!("Opened durable room store at {:?}", root);
        Ok(Self { root })
    }

    fn room_path(&self, id: &str) -> RoomResult<PathBuf> {
        // Ids become file stems; anything outside the id alphabet must
        // never reach the filesystem.
        if !is_valid_room_id(id) {
            return Err(RoomError::not_found(id));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }

    /// Create a room owned by the authenticated caller
    pub async fn create(&self, payload: CreateRoom, owner: &IdentityContext) -> RoomResult<Room> {
        let user_id = owner
            .user_id()
            .ok_or_else(|| RoomError::forbidden("durable rooms require an authenticated owner"))?;

        let id = generate_room_id();
        let room = Room {
            id: id.clone(),
            name: generate_room_name(),
            language: payload.language.unwrap_or_else(|| "javascript".to_string()),
            content: payload.content.unwrap_or_default(),
            created_at: Utc::now(),
            owner: user_id.to_string(),
            room_type: payload.room_type.unwrap_or(RoomType::Public),
            members: vec![Member::owner(user_id)],
            is_ephemeral: false,
            expires_at: None,
        };

        self.write_room(&room).await?;
        info!("Created room '{}' for owner '{}'", id, user_id);
        Ok(room)
    }

    /// Fetch a room by id
    pub async fn get(&self, id: &str) -> RoomResult<Room> {
        let path = self.room_path(id)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Room '{}' not found in durable store", id);
                return Err(RoomError::not_found(id));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&data)?)
    }

    /// Merge a patch into a room, field by field
    pub async fn update(&self, id: &str, patch: &RoomPatch) -> RoomResult<Room> {
        let mut room = self.get(id).await?;
        room.apply(patch);
        self.write_room(&room).await?;
        Ok(room)
    }

    /// Replace a room's member list wholesale
    pub async fn put_members(&self, id: &str, members: Vec<Member>) -> RoomResult<Room> {
        let mut room = self.get(id).await?;
        room.members = members;
        self.write_room(&room).await?;
        Ok(room)
    }

    /// Read every room in the store
    ///
    /// Unbounded directory scan, O(total rooms); only `list` uses it.
    /// Unparseable files are logged and skipped rather than failing the
    /// whole scan.
    pub async fn scan_all(&self) -> RoomResult<Vec<Room>> {
        let mut rooms = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match read_room(&path).await {
                Ok(room) => rooms.push(room),
                Err(err) => error!("Skipping unreadable room file {:?}: {}", path, err),
            }
        }

        Ok(rooms)
    }

    /// Delete a room; removing an absent room is not found
    pub async fn delete(&self, id: &str) -> RoomResult<()> {
        let path = self.room_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted room '{}'", id);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Err(RoomError::not_found(id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_room(&self, room: &Room) -> RoomResult<()> {
        let path = self.room_path(&room.id)?;
        let json = serde_json::to_string_pretty(room)?;
        tokio::fs::write(&path, json).await?;
        Ok(())
    }
}

async fn read_room(path: &Path) -> RoomResult<Room> {
    let data = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&data)?)
}
