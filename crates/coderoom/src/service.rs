use serde::Serialize;
use tracing::debug;

use crate::error::{RoomError, RoomResult};
use crate::model::{CreateRoom, IdentityContext, Member, Role, Room, RoomPatch, ShareRequest};
use crate::policy::{self, Action};
use crate::store::{RoomLocation, RoomRepository};

/// Result of `list`: durable rooms partitioned by the caller's role
#[derive(Debug, Default, Serialize)]
pub struct RoomListing {
    pub owned: Vec<Room>,
    pub shared: Vec<Room>,
}

/// Orchestrates the stores and the authorization policy into the
/// externally usable room operations
///
/// Every operation is request-scoped: the caller's [`IdentityContext`] is
/// passed in explicitly and no state is held between calls.
pub struct RoomService {
    repo: RoomRepository,
}

impl RoomService {
    pub fn new(repo: RoomRepository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &RoomRepository {
        &self.repo
    }

    /// Create a room in the tier chosen by the caller's identity
    ///
    /// Guests get an ephemeral room, forced public whatever the payload
    /// says; authenticated callers get a durable room they own.
    pub async fn create(
        &self,
        identity: &IdentityContext,
        payload: CreateRoom,
    ) -> RoomResult<Room> {
        if identity.is_authenticated() {
            self.repo.durable().create(payload, identity).await
        } else {
            Ok(self.repo.ephemeral().create(payload))
        }
    }

    /// Fetch a room the caller may read
    pub async fn get(&self, id: &str, identity: &IdentityContext) -> RoomResult<Room> {
        let location = self.repo.resolve(id).await?;
        policy::check(location.room(), identity, Action::Read)?;
        Ok(location.into_room())
    }

    /// Update a room with the allow-listed fields
    pub async fn update(
        &self,
        id: &str,
        patch: &RoomPatch,
        identity: &IdentityContext,
    ) -> RoomResult<Room> {
        if patch.is_empty() {
            return Err(RoomError::validation("no updatable fields provided"));
        }

        let location = self.repo.resolve(id).await?;
        policy::check(location.room(), identity, Action::Write)?;

        match location {
            RoomLocation::Ephemeral(room) => self.repo.ephemeral().update(&room.id, patch),
            RoomLocation::Durable(room) => self.repo.durable().update(&room.id, patch).await,
        }
    }

    /// Change a durable room's member list, returning the resulting list
    ///
    /// `role = remove` deletes the matching member and is a no-op when
    /// nothing matches. Any other role upserts: an existing member's role
    /// is replaced, otherwise the member is appended.
    pub async fn share(
        &self,
        id: &str,
        request: &ShareRequest,
        identity: &IdentityContext,
    ) -> RoomResult<Vec<Member>> {
        if request.user_id.is_none() && request.email.is_none() {
            return Err(RoomError::validation("userId or email is required"));
        }
        if !identity.is_authenticated() {
            return Err(RoomError::forbidden("guest room sharing not supported"));
        }

        let location = self.repo.resolve(id).await?;
        let room = match location {
            RoomLocation::Ephemeral(_) => {
                return Err(RoomError::forbidden("guest room sharing not supported"));
            }
            RoomLocation::Durable(room) => room,
        };
        policy::check(&room, identity, Action::Share)?;

        let user_id = request.user_id.as_deref();
        let email = request.email.as_deref();
        let mut members = room.members;

        match request.role.as_role() {
            None => {
                // Removal is idempotent: a non-member leaves the list as is.
                members.retain(|member| !member.matches_keys(user_id, email));
            }
            Some(role) => {
                match members
                    .iter_mut()
                    .find(|member| member.matches_keys(user_id, email))
                {
                    Some(member) => member.role = role,
                    None => members.push(Member {
                        user_id: request.user_id.clone(),
                        email: request.email.clone(),
                        role,
                    }),
                }
            }
        }

        let updated = self.repo.durable().put_members(id, members).await?;
        debug!("Room '{}' now has {} members", id, updated.members.len());
        Ok(updated.members)
    }

    /// List durable rooms the caller is a member of
    ///
    /// Scans every durable room and partitions by the caller's role.
    /// Ephemeral rooms are never listed.
    pub async fn list(&self, identity: &IdentityContext) -> RoomResult<RoomListing> {
        if !identity.is_authenticated() {
            return Err(RoomError::forbidden("authentication required"));
        }

        let mut listing = RoomListing::default();
        for room in self.repo.durable().scan_all().await? {
            match policy::membership_role(&room, identity) {
                Some(Role::Owner) => listing.owned.push(room),
                Some(_) => listing.shared.push(room),
                None => {}
            }
        }
        Ok(listing)
    }

    /// Delete a durable room; irreversible
    ///
    /// Ephemeral rooms have no delete path and read as not found here;
    /// they die by expiry alone.
    pub async fn delete(&self, id: &str, identity: &IdentityContext) -> RoomResult<()> {
        let location = self.repo.resolve(id).await?;
        let room = match location {
            RoomLocation::Ephemeral(_) => return Err(RoomError::not_found(id)),
            RoomLocation::Durable(room) => room,
        };
        policy::check(&room, identity, Action::Delete)?;

        self.repo.durable().delete(id).await
    }
}
