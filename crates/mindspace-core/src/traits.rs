//! Repository traits for mindspace storage.
//!
//! Every note operation takes the id of the calling user; implementations
//! must scope reads and writes to notes authored by that user and report
//! foreign notes as not found.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Repository for accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Validate and create a new account.
    async fn register(&self, req: RegisterRequest) -> Result<UserSummary>;

    /// Fetch a user by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Return the user when `username` exists and `password` matches.
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>>;
}

// =============================================================================
// TOKEN REPOSITORY
// =============================================================================

/// Repository for issued bearer tokens.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Issue a new access/refresh pair for a user.
    async fn issue(&self, user_id: UserId) -> Result<TokenPair>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken>;

    /// Resolve an access token to its owner, if valid.
    async fn authenticate(&self, access_token: &str) -> Result<Option<TokenOwner>>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Repository for global tags.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// List all tags ordered by name.
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Fetch one tag.
    async fn get(&self, id: TagId) -> Result<Tag>;

    /// Create a tag.
    async fn create(&self, name: &str) -> Result<Tag>;

    /// Rename a tag.
    async fn rename(&self, id: TagId, name: &str) -> Result<Tag>;

    /// Delete a tag, detaching it from every note.
    async fn delete(&self, id: TagId) -> Result<()>;
}

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Repository for a user's notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// List the author's notes, most recently updated first.
    async fn list(&self, author_id: UserId, req: ListNotesRequest) -> Result<Vec<NoteSummary>>;

    /// Fetch one note with its nested children.
    async fn fetch(&self, author_id: UserId, id: NoteId) -> Result<NoteDetail>;

    /// Create a note owned by `author_id`.
    async fn create(&self, author_id: UserId, req: CreateNoteRequest) -> Result<NoteDetail>;

    /// Update a note. The slug never changes.
    async fn update(&self, author_id: UserId, id: NoteId, req: UpdateNoteRequest)
        -> Result<NoteDetail>;

    /// Delete a note and all of its descendants.
    async fn delete(&self, author_id: UserId, id: NoteId) -> Result<()>;
}
