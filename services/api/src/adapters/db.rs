//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use story_tutor_core::domain::{
    Credential, DailyWord, GrammarNote, Level, NewStory, NewUser, NewWord, Story, StoryFilter,
    User, UserCredentials, WordOwner,
};
use story_tutor_core::ports::{DatabaseService, PortError, PortResult};
use tracing::{debug, error};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> PortResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(persistence)
    }
}

fn persistence(e: sqlx::Error) -> PortError {
    PortError::Persistence(e.to_string())
}

const EMAIL_CONSTRAINT: &str = "users_email_key";
const GOOGLE_ID_CONSTRAINT: &str = "users_google_id_key";

/// Maps a unique violation on `users` to the conflict the caller should see.
fn user_conflict(e: sqlx::Error) -> PortError {
    let constraint = e
        .as_database_error()
        .filter(|db_err| db_err.is_unique_violation())
        .map(|db_err| db_err.constraint().map(str::to_owned));
    match constraint {
        Some(Some(name)) if name == GOOGLE_ID_CONSTRAINT => {
            PortError::Conflict("Google account already linked to another user".to_string())
        }
        Some(Some(name)) if name == EMAIL_CONSTRAINT => {
            PortError::Conflict("Email already registered".to_string())
        }
        Some(_) => PortError::Conflict("User already exists".to_string()),
        None => persistence(e),
    }
}

fn corrupt_level(value: &str) -> PortError {
    PortError::Persistence(format!("Stored level '{}' is not a valid level", value))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str =
    "id, email, name, is_active, is_google_account, english_level, created_at, last_login";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    name: Option<String>,
    is_active: bool,
    is_google_account: bool,
    english_level: String,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let english_level = self
            .english_level
            .parse::<Level>()
            .map_err(|_| corrupt_level(&self.english_level))?;
        Ok(User {
            user_id: self.id,
            email: self.email,
            name: self.name,
            is_active: self.is_active,
            is_google_account: self.is_google_account,
            english_level,
            created_at: self.created_at,
            last_login: self.last_login,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: Option<String>,
    google_id: Option<String>,
    is_active: bool,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
            google_id: self.google_id,
            is_active: self.is_active,
        }
    }
}

const STORY_COLUMNS: &str = "id, title, content, topic, level, grammar_notes, created_at";

#[derive(FromRow)]
struct StoryRecord {
    id: Uuid,
    title: String,
    content: String,
    topic: String,
    level: String,
    grammar_notes: Json<Vec<GrammarNote>>,
    created_at: DateTime<Utc>,
}
impl StoryRecord {
    fn to_domain(self) -> PortResult<Story> {
        let level = self
            .level
            .parse::<Level>()
            .map_err(|_| corrupt_level(&self.level))?;
        Ok(Story {
            id: self.id,
            title: self.title,
            content: self.content,
            topic: self.topic,
            level,
            grammar_notes: self.grammar_notes.0,
            created_at: self.created_at,
        })
    }
}

const WORD_COLUMNS: &str = "id, user_id, word, meaning, synonyms, created_at";

#[derive(FromRow)]
struct WordRecord {
    id: Uuid,
    user_id: Option<Uuid>,
    word: String,
    meaning: String,
    synonyms: Vec<String>,
    created_at: DateTime<Utc>,
}
impl WordRecord {
    fn to_domain(self) -> DailyWord {
        DailyWord {
            id: self.id,
            user_id: self.user_id,
            word: self.word,
            meaning: self.meaning,
            synonyms: self.synonyms,
            created_at: self.created_at,
        }
    }
}

/// Inserts words inside an open transaction, keeping their order.
async fn insert_words(
    tx: &mut Transaction<'static, Postgres>,
    owner: WordOwner,
    batch_id: Option<Uuid>,
    words: Vec<NewWord>,
) -> PortResult<Vec<DailyWord>> {
    let mut stored = Vec::with_capacity(words.len());
    for (position, word) in words.into_iter().enumerate() {
        let record = sqlx::query_as::<_, WordRecord>(&format!(
            "INSERT INTO daily_words (id, user_id, batch_id, position, word, meaning, synonyms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {WORD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner.user_id())
        .bind(batch_id)
        .bind(position as i32)
        .bind(word.word)
        .bind(word.meaning)
        .bind(word.synonyms)
        .fetch_one(&mut **tx)
        .await
        .map_err(persistence)?;
        stored.push(record.to_domain());
    }
    Ok(stored)
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let (hashed_password, google_id) = match new_user.credential {
            Credential::Password { hashed_password } => (Some(hashed_password), None),
            Credential::Google { subject } => (None, Some(subject)),
        };

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email, hashed_password, name, is_google_account, google_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(hashed_password)
        .bind(new_user.name)
        .bind(google_id.is_some())
        .bind(google_id)
        .fetch_one(&self.pool)
        .await
        .map_err(user_conflict)?;

        record.to_domain()
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => persistence(e),
        })?;
        record.to_domain()
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password, google_id, is_active FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(record.map(CredentialsRecord::to_domain))
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password, google_id, is_active FROM users WHERE google_id = $1",
        )
        .bind(google_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(record.map(CredentialsRecord::to_domain))
    }

    async fn link_google_account(&self, user_id: Uuid, google_id: &str) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET google_id = $1, is_google_account = TRUE, updated_at = NOW() WHERE id = $2",
        )
        .bind(google_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(user_conflict)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn update_english_level(&self, user_id: Uuid, level: Level) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET english_level = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(level.as_str())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => persistence(e),
        })?;
        record.to_domain()
    }

    async fn find_story(&self, topic: &str, level: Level) -> PortResult<Option<Story>> {
        let record = sqlx::query_as::<_, StoryRecord>(&format!(
            "SELECT {STORY_COLUMNS} FROM stories WHERE topic = $1 AND level = $2 \
             ORDER BY created_at ASC, id ASC LIMIT 1"
        ))
        .bind(topic)
        .bind(level.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;
        record.map(StoryRecord::to_domain).transpose()
    }

    async fn create_story(&self, story: NewStory) -> PortResult<Story> {
        let mut tx = self.begin().await?;
        let inserted = sqlx::query_as::<_, StoryRecord>(&format!(
            "INSERT INTO stories (id, title, content, topic, level, grammar_notes) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {STORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&story.title)
        .bind(&story.content)
        .bind(&story.topic)
        .bind(story.level.as_str())
        .bind(Json(&story.grammar_notes))
        .fetch_one(&mut *tx)
        .await;

        let record = match inserted {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, topic = %story.topic, "Story insert failed, rolling back");
                tx.rollback().await.map_err(persistence)?;
                return Err(persistence(e));
            }
        };
        tx.commit().await.map_err(persistence)?;
        record.to_domain()
    }

    async fn list_stories(&self, filter: &StoryFilter) -> PortResult<Vec<Story>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {STORY_COLUMNS} FROM stories WHERE TRUE"));
        if let Some(topic) = &filter.topic {
            query.push(" AND topic = ").push_bind(topic.clone());
        }
        if let Some(level) = filter.level {
            query.push(" AND level = ").push_bind(level.as_str());
        }
        query.push(" ORDER BY created_at ASC, id ASC");

        let records = query
            .build_query_as::<StoryRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

        records.into_iter().map(StoryRecord::to_domain).collect()
    }

    async fn words_for_day(&self, owner: WordOwner, day: NaiveDate) -> PortResult<Vec<DailyWord>> {
        let records = sqlx::query_as::<_, WordRecord>(
            "SELECT w.id, w.user_id, w.word, w.meaning, w.synonyms, w.created_at \
             FROM daily_words w \
             JOIN daily_word_batches b ON w.batch_id = b.id \
             WHERE b.owner_key = $1 AND b.batch_date = $2 \
             ORDER BY w.position ASC",
        )
        .bind(owner.key())
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        let words = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(words)
    }

    async fn store_daily_batch(
        &self,
        owner: WordOwner,
        day: NaiveDate,
        words: Vec<NewWord>,
    ) -> PortResult<Vec<DailyWord>> {
        let mut tx = self.begin().await?;

        // A concurrent claim for the same (owner, day) blocks here until the other
        // transaction finishes, then yields no row.
        let claimed: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO daily_word_batches (id, owner_key, user_id, batch_date) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (owner_key, batch_date) DO NOTHING RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(owner.key())
        .bind(owner.user_id())
        .bind(day)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence)?;

        let Some(batch_id) = claimed else {
            tx.rollback().await.map_err(persistence)?;
            debug!(owner = %owner.key(), %day, "Daily batch already stored by another request");
            return self.words_for_day(owner, day).await;
        };

        let stored = insert_words(&mut tx, owner, Some(batch_id), words).await?;
        tx.commit().await.map_err(persistence)?;
        Ok(stored)
    }

    async fn create_words(&self, owner: WordOwner, words: Vec<NewWord>) -> PortResult<Vec<DailyWord>> {
        let mut tx = self.begin().await?;
        let stored = insert_words(&mut tx, owner, None, words).await?;
        tx.commit().await.map_err(persistence)?;
        Ok(stored)
    }
}
