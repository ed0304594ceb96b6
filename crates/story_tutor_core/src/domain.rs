//! crates/story_tutor_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP framework.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// English Level
//=========================================================================================

/// The English-proficiency level that governs prompt complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    #[serde(alias = "BEGINNER", alias = "Beginner")]
    Beginner,
    #[serde(alias = "INTERMEDIATE", alias = "Intermediate")]
    Intermediate,
    #[serde(alias = "ADVANCED", alias = "Advanced")]
    Advanced,
}

#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a valid English level (expected beginner, intermediate or advanced)")]
pub struct InvalidLevel(pub String);

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    /// How story prose should read at this level.
    pub fn vocabulary_focus(&self) -> &'static str {
        match self {
            Level::Beginner => "simple vocabulary and basic sentence structures",
            Level::Intermediate => "moderate vocabulary and compound sentences",
            Level::Advanced => "rich vocabulary, complex sentences, and idiomatic expressions",
        }
    }

    /// Which grammar topics suit this level.
    pub fn grammar_focus(&self) -> &'static str {
        match self {
            Level::Beginner => "basic grammar concepts, simple tenses, and everyday vocabulary",
            Level::Intermediate => {
                "intermediate grammar structures, compound sentences, and phrasal verbs"
            }
            Level::Advanced => {
                "advanced grammar patterns, complex tenses, idiomatic expressions, and academic writing"
            }
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = InvalidLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            _ => Err(InvalidLevel(s.to_string())),
        }
    }
}

//=========================================================================================
// Stories and Grammar
//=========================================================================================

/// One grammar concept explained with example sentences, attached to a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarNote {
    pub concept: String,
    pub explanation: String,
    pub examples: Vec<String>,
}

/// A generated story. Stories are inserted once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub topic: String,
    pub level: Level,
    pub grammar_notes: Vec<GrammarNote>,
    pub created_at: DateTime<Utc>,
}

/// The fields needed to persist a new story.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub title: String,
    pub content: String,
    pub topic: String,
    pub level: Level,
    pub grammar_notes: Vec<GrammarNote>,
}

/// Optional filters for listing stories. `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct StoryFilter {
    pub topic: Option<String>,
    pub level: Option<Level>,
}

impl StoryFilter {
    pub fn matches(&self, story: &Story) -> bool {
        self.topic.as_deref().map_or(true, |t| story.topic == t)
            && self.level.map_or(true, |l| story.level == l)
    }
}

/// A standalone grammar lesson. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarHint {
    pub title: String,
    pub explanation: String,
    pub examples: Vec<String>,
    pub practice_exercises: Vec<String>,
    pub level: Level,
}

//=========================================================================================
// Vocabulary
//=========================================================================================

/// A vocabulary word with its translated meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyWord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub word: String,
    pub meaning: String,
    pub synonyms: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWord {
    pub word: String,
    pub meaning: String,
    pub synonyms: Vec<String>,
}

/// Who a daily batch belongs to: a single user, or everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordOwner {
    User(Uuid),
    Global,
}

impl WordOwner {
    /// Stable key used for the one-batch-per-day uniqueness constraint.
    pub fn key(&self) -> String {
        match self {
            WordOwner::User(id) => id.to_string(),
            WordOwner::Global => "global".to_string(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            WordOwner::User(id) => Some(*id),
            WordOwner::Global => None,
        }
    }
}

impl From<Option<Uuid>> for WordOwner {
    fn from(user_id: Option<Uuid>) -> Self {
        user_id.map_or(WordOwner::Global, WordOwner::User)
    }
}

/// Identifies the single daily batch of an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub owner: WordOwner,
    pub day: NaiveDate,
}

//=========================================================================================
// Users
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub is_google_account: bool,
    pub english_level: Level,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: Option<String>,
    pub google_id: Option<String>,
    pub is_active: bool,
}

/// How a new account proves its identity. Every user has at least one.
#[derive(Debug, Clone)]
pub enum Credential {
    Password { hashed_password: String },
    Google { subject: String },
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub credential: Credential,
}

/// The verified claims of a Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
}
