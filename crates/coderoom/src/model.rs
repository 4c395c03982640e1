use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Visibility of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[default]
    Public,
    Private,
}

/// Role of a member within a room
///
/// Ordering is owner > editor > viewer; a listed member without edit
/// rights is effectively a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

/// An identity attached to a room with a role
///
/// At least one of `user_id` / `email` is present. Identity matching is by
/// user id *or* email; either alone is sufficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

impl Member {
    pub fn owner(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            email: None,
            role: Role::Owner,
        }
    }

    /// Whether this member record refers to the given identity
    pub fn matches(&self, identity: &IdentityContext) -> bool {
        self.matches_keys(identity.user_id(), identity.email())
    }

    /// Whether this member record refers to the given user id or email
    pub fn matches_keys(&self, user_id: Option<&str>, email: Option<&str>) -> bool {
        let by_id = matches!((&self.user_id, user_id), (Some(a), Some(b)) if a == b);
        let by_email = matches!((&self.email, email), (Some(a), Some(b)) if a == b);
        by_id || by_email
    }
}

/// A collaborative editing room
///
/// Field names on the wire follow the gateway contract
/// (`createdAt`, `type`, `isEphemeral`, ...). `expires_at` is present only
/// on ephemeral rooms and is fixed at creation; updates never move it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub language: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub owner: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub members: Vec<Member>,
    #[serde(default)]
    pub is_ephemeral: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Apply an update patch in place
    pub fn apply(&mut self, patch: &RoomPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(language) = &patch.language {
            self.language = language.clone();
        }
        if let Some(room_type) = patch.room_type {
            self.room_type = room_type;
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
    }
}

/// Externally resolved caller identity
///
/// Produced once at the transport boundary and passed explicitly through
/// the whole call chain; nothing below the transport reads request state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityContext {
    Guest { email: Option<String> },
    Auth { user_id: String, email: Option<String> },
}

impl IdentityContext {
    pub fn guest() -> Self {
        Self::Guest { email: None }
    }

    pub fn auth(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self::Auth {
            user_id: user_id.into(),
            email,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Auth { user_id, .. } => Some(user_id),
            Self::Guest { .. } => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Auth { email, .. } | Self::Guest { email } => email.as_deref(),
        }
    }

    /// Display name shown to other live participants
    pub fn display_name(&self) -> &str {
        self.email().unwrap_or("Guest")
    }
}

/// Creation payload; everything is optional and defaulted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub language: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub room_type: Option<RoomType>,
}

/// Update payload restricted to the allowed fields
///
/// Unknown body fields are dropped by deserialization; a patch with no
/// fields set is rejected by the service as a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    pub name: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "type")]
    pub room_type: Option<RoomType>,
    pub content: Option<String>,
}

impl RoomPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.language.is_none()
            && self.room_type.is_none()
            && self.content.is_none()
    }
}

/// Requested role in a share call; `remove` deletes the member instead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareRole {
    Owner,
    Editor,
    Viewer,
    Remove,
}

impl ShareRole {
    /// The membership role this grants, or `None` for a removal
    pub fn as_role(self) -> Option<Role> {
        match self {
            Self::Owner => Some(Role::Owner),
            Self::Editor => Some(Role::Editor),
            Self::Viewer => Some(Role::Viewer),
            Self::Remove => None,
        }
    }
}

/// Membership change applied by `RoomService::share`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: ShareRole,
}

/// Alphabet for generated room ids (nanoid-compatible)
const ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub(crate) const ROOM_ID_LEN: usize = 6;

/// Generate a short random room id, unique per storage tier in practice
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    (0..ROOM_ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Whether `id` could have come out of `generate_room_id`
///
/// The durable store uses ids as file stems, so anything outside the id
/// alphabet must never reach the filesystem.
pub(crate) fn is_valid_room_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.bytes().all(|b| ID_ALPHABET.contains(&b))
}

const ADJECTIVES: &[&str] = &[
    "Amber", "Bold", "Brave", "Bright", "Calm", "Clever", "Crimson", "Curious",
    "Daring", "Eager", "Electric", "Gentle", "Golden", "Happy", "Hidden", "Jolly",
    "Keen", "Lively", "Lucky", "Mellow", "Misty", "Noble", "Quiet", "Rapid",
    "Scarlet", "Silent", "Silver", "Swift", "Vivid", "Wandering", "Wild", "Witty",
];

const ANIMALS: &[&str] = &[
    "Albatross", "Badger", "Bear", "Beaver", "Bison", "Condor", "Coyote", "Crane",
    "Dolphin", "Falcon", "Ferret", "Fox", "Gazelle", "Heron", "Ibex", "Jaguar",
    "Kestrel", "Lemur", "Lynx", "Marmot", "Meerkat", "Narwhal", "Ocelot", "Otter",
    "Owl", "Panther", "Puffin", "Raven", "Salamander", "Tapir", "Walrus", "Wolf",
];

/// Generate a display name like "Swift Otter"
pub fn generate_room_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).unwrap_or(&"Swift");
    let animal = ANIMALS.choose(&mut rng).unwrap_or(&"Otter");
    format!("{} {}", adjective, animal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_matches_by_user_id_or_email() {
        let member = Member {
            user_id: Some("u-1".into()),
            email: Some("a@example.com".into()),
            role: Role::Editor,
        };

        let by_id = IdentityContext::auth("u-1", None);
        let by_email = IdentityContext::auth("someone-else", Some("a@example.com".into()));
        let neither = IdentityContext::auth("u-2", Some("b@example.com".into()));

        assert!(member.matches(&by_id));
        assert!(member.matches(&by_email));
        assert!(!member.matches(&neither));
    }

    #[test]
    fn guest_with_no_email_matches_nothing() {
        let member = Member {
            user_id: None,
            email: Some("a@example.com".into()),
            role: Role::Viewer,
        };
        assert!(!member.matches(&IdentityContext::guest()));
    }

    #[test]
    fn room_serializes_with_wire_field_names() {
        let room = Room {
            id: "abc123".into(),
            name: "Swift Otter".into(),
            language: "javascript".into(),
            content: String::new(),
            created_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            owner: "anonymous".into(),
            room_type: RoomType::Public,
            members: vec![Member::owner("anonymous")],
            is_ephemeral: true,
            expires_at: Some("2026-01-02T00:00:00Z".parse().unwrap()),
        };

        let value = serde_json::to_value(&room).unwrap();
        assert_eq!(value["type"], json!("public"));
        assert_eq!(value["isEphemeral"], json!(true));
        assert_eq!(value["members"][0]["role"], json!("owner"));
        assert!(value.get("createdAt").is_some());
        assert!(value.get("expiresAt").is_some());
    }

    #[test]
    fn durable_room_omits_expiry() {
        let room = Room {
            id: "abc123".into(),
            name: "Quiet Lynx".into(),
            language: "rust".into(),
            content: String::new(),
            created_at: Utc::now(),
            owner: "u-1".into(),
            room_type: RoomType::Private,
            members: vec![Member::owner("u-1")],
            is_ephemeral: false,
            expires_at: None,
        };

        let value = serde_json::to_value(&room).unwrap();
        assert!(value.get("expiresAt").is_none());
        assert_eq!(value["type"], json!("private"));
    }

    #[test]
    fn patch_drops_unknown_fields() {
        let patch: RoomPatch = serde_json::from_value(json!({
            "content": "let x = 1;",
            "owner": "evil",
            "members": [],
        }))
        .unwrap();

        assert_eq!(patch.content.as_deref(), Some("let x = 1;"));
        assert!(patch.name.is_none());
        assert!(!patch.is_empty());
    }

    #[test]
    fn empty_patch_is_empty() {
        let patch: RoomPatch = serde_json::from_value(json!({ "owner": "evil" })).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn generated_ids_are_short_and_in_alphabet() {
        for _ in 0..100 {
            let id = generate_room_id();
            assert_eq!(id.len(), ROOM_ID_LEN);
            assert!(is_valid_room_id(&id));
        }
    }

    #[test]
    fn path_like_ids_are_rejected() {
        assert!(!is_valid_room_id("../etc"));
        assert!(!is_valid_room_id("a/b"));
        assert!(!is_valid_room_id(""));
    }

    #[test]
    fn share_role_remove_grants_nothing() {
        assert_eq!(ShareRole::Remove.as_role(), None);
        assert_eq!(ShareRole::Editor.as_role(), Some(Role::Editor));
        let parsed: ShareRole = serde_json::from_value(json!("remove")).unwrap();
        assert_eq!(parsed, ShareRole::Remove);
    }
}
