//! Pure authorization rules evaluated over `(room, identity, action)`.
//!
//! | Room type | read | write | share | delete |
//! |-----------|------|-------|-------|--------|
//! | public    | anyone | anyone | owner | owner, authenticated |
//! | private   | member | owner/editor | owner | owner |

use crate::error::{RoomError, RoomResult};
use crate::model::{IdentityContext, Role, Room, RoomType};

/// An operation subject to per-room authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Share,
    Delete,
}

/// The caller's membership role in the room, if any
///
/// Matching is by user id or email; the first matching member wins.
pub fn membership_role(room: &Room, identity: &IdentityContext) -> Option<Role> {
    room.members
        .iter()
        .find(|member| member.matches(identity))
        .map(|member| member.role)
}

/// Check whether `identity` may perform `action` on `room`
pub fn check(room: &Room, identity: &IdentityContext, action: Action) -> RoomResult<()> {
    let role = membership_role(room, identity);
    let is_owner = role == Some(Role::Owner);

    let allowed = match (room.room_type, action) {
        (RoomType::Public, Action::Read | Action::Write) => true,
        (RoomType::Public, Action::Share) => is_owner,
        (RoomType::Public, Action::Delete) => is_owner && identity.is_authenticated(),

        (RoomType::Private, Action::Read) => role.is_some(),
        (RoomType::Private, Action::Write) => {
            matches!(role, Some(Role::Owner | Role::Editor))
        }
        (RoomType::Private, Action::Share | Action::Delete) => is_owner,
    };

    if allowed {
        Ok(())
    } else {
        Err(RoomError::forbidden(match action {
            Action::Read => "not a member of this room",
            Action::Write => "no write access to this room",
            Action::Share => "only the room owner can share",
            Action::Delete => "only the room owner can delete",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Member;
    use chrono::Utc;
    use rstest::rstest;

    fn room(room_type: RoomType, members: Vec<Member>) -> Room {
        Room {
            id: "r-test".into(),
            name: "Test Room".into(),
            language: "javascript".into(),
            content: String::new(),
            created_at: Utc::now(),
            owner: "owner-1".into(),
            room_type,
            members,
            is_ephemeral: false,
            expires_at: None,
        }
    }

    fn member(user_id: &str, role: Role) -> Member {
        Member {
            user_id: Some(user_id.into()),
            email: None,
            role,
        }
    }

    fn owner() -> IdentityContext {
        IdentityContext::auth("owner-1", None)
    }

    fn editor() -> IdentityContext {
        IdentityContext::auth("editor-1", None)
    }

    fn viewer() -> IdentityContext {
        IdentityContext::auth("viewer-1", None)
    }

    fn stranger() -> IdentityContext {
        IdentityContext::auth("stranger-1", None)
    }

    fn full_membership() -> Vec<Member> {
        vec![
            member("owner-1", Role::Owner),
            member("editor-1", Role::Editor),
            member("viewer-1", Role::Viewer),
        ]
    }

    #[rstest]
    // public rooms: read/write open to everyone, even guests
    #[case(RoomType::Public, IdentityContext::guest(), Action::Read, true)]
    #[case(RoomType::Public, IdentityContext::guest(), Action::Write, true)]
    #[case(RoomType::Public, stranger(), Action::Read, true)]
    #[case(RoomType::Public, stranger(), Action::Write, true)]
    // public rooms: share and delete stay owner-gated
    #[case(RoomType::Public, owner(), Action::Share, true)]
    #[case(RoomType::Public, editor(), Action::Share, false)]
    #[case(RoomType::Public, IdentityContext::guest(), Action::Share, false)]
    #[case(RoomType::Public, owner(), Action::Delete, true)]
    #[case(RoomType::Public, viewer(), Action::Delete, false)]
    // private rooms: members only
    #[case(RoomType::Private, stranger(), Action::Read, false)]
    #[case(RoomType::Private, IdentityContext::guest(), Action::Read, false)]
    #[case(RoomType::Private, viewer(), Action::Read, true)]
    #[case(RoomType::Private, viewer(), Action::Write, false)]
    #[case(RoomType::Private, editor(), Action::Write, true)]
    #[case(RoomType::Private, owner(), Action::Write, true)]
    #[case(RoomType::Private, editor(), Action::Share, false)]
    #[case(RoomType::Private, owner(), Action::Share, true)]
    #[case(RoomType::Private, editor(), Action::Delete, false)]
    #[case(RoomType::Private, owner(), Action::Delete, true)]
    fn authorization_table(
        #[case] room_type: RoomType,
        #[case] identity: IdentityContext,
        #[case] action: Action,
        #[case] allowed: bool,
    ) {
        let room = room(room_type, full_membership());
        assert_eq!(check(&room, &identity, action).is_ok(), allowed);
    }

    #[test]
    fn public_delete_requires_authenticated_owner() {
        // A guest whose email matches an owner member still cannot delete a
        // public room.
        let mut members = full_membership();
        members.push(Member {
            user_id: None,
            email: Some("anon@example.com".into()),
            role: Role::Owner,
        });
        let room = room(RoomType::Public, members);

        let guest = IdentityContext::Guest {
            email: Some("anon@example.com".into()),
        };
        assert!(check(&room, &guest, Action::Delete).is_err());
        assert!(check(&room, &guest, Action::Share).is_ok());
    }

    #[test]
    fn membership_matches_by_email() {
        let members = vec![Member {
            user_id: None,
            email: Some("shared@example.com".into()),
            role: Role::Editor,
        }];
        let room = room(RoomType::Private, members);
        let identity = IdentityContext::auth("whoever", Some("shared@example.com".into()));

        assert_eq!(membership_role(&room, &identity), Some(Role::Editor));
        assert!(check(&room, &identity, Action::Write).is_ok());
    }
}
