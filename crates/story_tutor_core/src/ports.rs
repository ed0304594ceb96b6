//! crates/story_tutor_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    DailyWord, GoogleIdentity, Level, NewStory, NewUser, NewWord, Story, StoryFilter, User,
    UserCredentials, WordOwner,
};
use crate::parsing::ParseError;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The language model call failed or returned no text.
    #[error("Text generation failed: {0}")]
    Generation(String),
    /// The language model answered, but not in a shape we can use.
    #[error("Could not parse model output: {reason}")]
    Parse { reason: String, raw: String },
    #[error("Persistence failed: {0}")]
    Persistence(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl From<ParseError> for PortError {
    fn from(e: ParseError) -> Self {
        PortError::Parse {
            reason: e.reason,
            raw: e.raw,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Fails with `Conflict` when the email or Google subject is already taken.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>>;

    async fn find_user_by_google_id(&self, google_id: &str) -> PortResult<Option<UserCredentials>>;

    async fn link_google_account(&self, user_id: Uuid, google_id: &str) -> PortResult<()>;

    async fn record_login(&self, user_id: Uuid) -> PortResult<()>;

    async fn update_english_level(&self, user_id: Uuid, level: Level) -> PortResult<User>;

    // --- Stories ---
    /// Returns the oldest story stored for the pair, if any.
    async fn find_story(&self, topic: &str, level: Level) -> PortResult<Option<Story>>;

    /// Inserts atomically; nothing is written when this fails.
    async fn create_story(&self, story: NewStory) -> PortResult<Story>;

    async fn list_stories(&self, filter: &StoryFilter) -> PortResult<Vec<Story>>;

    // --- Vocabulary ---
    async fn words_for_day(&self, owner: WordOwner, day: NaiveDate) -> PortResult<Vec<DailyWord>>;

    /// Get-or-create for the owner's batch of the day. When another request already
    /// stored a batch, that batch is returned and `words` is discarded.
    async fn store_daily_batch(
        &self,
        owner: WordOwner,
        day: NaiveDate,
        words: Vec<NewWord>,
    ) -> PortResult<Vec<DailyWord>>;

    /// Inserts words that are not part of a daily batch.
    async fn create_words(&self, owner: WordOwner, words: Vec<NewWord>) -> PortResult<Vec<DailyWord>>;
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Sends the prompt to the language model and returns its raw, non-empty text.
    async fn generate(&self, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies a Google ID token. Invalid or foreign tokens are `Unauthorized`.
    async fn verify_google_token(&self, id_token: &str) -> PortResult<GoogleIdentity>;
}
