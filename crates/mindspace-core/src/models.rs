//! Domain models and wire representations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type NoteId = i64;
pub type TagId = i64;

// =============================================================================
// USERS
// =============================================================================

/// A registered account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// Public view of a user returned after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    /// Empty string when the account has no email.
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone().unwrap_or_default(),
        }
    }
}

/// Registration payload.
///
/// Missing fields deserialize as empty so validation can report them per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    /// Password confirmation.
    pub password2: String,
}

impl RegisterRequest {
    /// The email to store: `None` when absent or blank.
    pub fn normalized_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

// =============================================================================
// TOKENS
// =============================================================================

/// Access/refresh pair handed out at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Fresh access token handed out on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

/// The user an access token was issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOwner {
    pub user_id: UserId,
    pub username: String,
}

// =============================================================================
// TAGS
// =============================================================================

/// A global label attachable to any note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(skip_serializing, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NOTES
// =============================================================================

/// A note row as stored.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: NoteId,
    pub author_id: UserId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub parent_id: Option<NoteId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List representation of a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: NoteId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub tags: Vec<Tag>,
    pub parent: Option<NoteId>,
    pub updated_at: DateTime<Utc>,
}

impl NoteSummary {
    pub fn from_note(note: &Note, tags: Vec<Tag>) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            slug: note.slug.clone(),
            content: note.content.clone(),
            tags,
            parent: note.parent_id,
            updated_at: note.updated_at,
        }
    }
}

/// A descendant inside a detail view: its summary plus its own children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteTreeNode {
    #[serde(flatten)]
    pub note: NoteSummary,
    pub children: Vec<NoteTreeNode>,
}

/// Detail representation of a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDetail {
    pub id: NoteId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub parent: Option<NoteId>,
    pub tags: Vec<Tag>,
    pub children: Vec<NoteTreeNode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteDetail {
    pub fn new(note: Note, tags: Vec<Tag>, children: Vec<NoteTreeNode>) -> Self {
        Self {
            id: note.id,
            title: note.title,
            slug: note.slug,
            content: note.content,
            parent: note.parent_id,
            tags,
            children,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Request for listing a user's notes.
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// Case-insensitive keyword matched against title, content and tag names.
    pub q: Option<String>,
}

impl ListNotesRequest {
    /// The keyword to filter by. Matched verbatim, surrounding whitespace
    /// included; only an empty keyword disables filtering.
    pub fn keyword(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.is_empty())
    }
}

/// Request for creating a note.
#[derive(Debug, Clone, Default)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub parent: Option<NoteId>,
    pub tags: Vec<TagId>,
}

/// Request for updating a note. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `Some(None)` detaches the note from its parent.
    pub parent: Option<Option<NoteId>>,
    pub tags: Option<Vec<TagId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> Note {
        let now = Utc::now();
        Note {
            id: 3,
            author_id: 1,
            title: "Recipes".to_string(),
            slug: "recipes-1-1700000000".to_string(),
            content: "".to_string(),
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_user_summary_blank_email() {
        let user = User {
            id: 4,
            username: "ada".to_string(),
            email: None,
            password_hash: "$argon2id$...".to_string(),
            is_staff: false,
            date_joined: Utc::now(),
        };
        let summary = UserSummary::from(&user);
        assert_eq!(summary.email, "");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_normalized_email() {
        let mut req = RegisterRequest {
            username: "ada".to_string(),
            email: Some("  ".to_string()),
            password: "secret1".to_string(),
            password2: "secret1".to_string(),
        };
        assert_eq!(req.normalized_email(), None);
        req.email = Some(" ada@example.com ".to_string());
        assert_eq!(req.normalized_email(), Some("ada@example.com"));
    }

    #[test]
    fn test_tag_serializes_id_and_name_only() {
        let tag = Tag {
            id: 9,
            name: "cooking".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 9, "name": "cooking" }));
    }

    #[test]
    fn test_tree_node_flattens_summary() {
        let note = sample_note();
        let node = NoteTreeNode {
            note: NoteSummary::from_note(&note, vec![]),
            children: vec![],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["slug"], "recipes-1-1700000000");
        assert!(json["children"].as_array().unwrap().is_empty());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_detail_has_created_at_and_children() {
        let detail = NoteDetail::new(sample_note(), vec![], vec![]);
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("created_at").is_some());
        assert!(json.get("children").is_some());
        assert_eq!(json["parent"], serde_json::Value::Null);
    }

    #[test]
    fn test_list_keyword_is_verbatim() {
        let req = ListNotesRequest {
            q: Some(String::new()),
        };
        assert_eq!(req.keyword(), None);
        assert_eq!(ListNotesRequest::default().keyword(), None);
        let req = ListNotesRequest {
            q: Some("   ".to_string()),
        };
        assert_eq!(req.keyword(), Some("   "));
        let req = ListNotesRequest {
            q: Some(" Foo ".to_string()),
        };
        assert_eq!(req.keyword(), Some(" Foo "));
    }
}
