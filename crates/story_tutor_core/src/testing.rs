//! crates/story_tutor_core/src/testing.rs
//!
//! In-memory implementations of the ports, for tests in this crate and in the
//! api service (enable the `test-util` feature).

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    BatchKey, Credential, DailyWord, GoogleIdentity, Level, NewStory, NewUser, NewWord, Story,
    StoryFilter, User, UserCredentials, WordOwner,
};
use crate::ports::{
    DatabaseService, IdentityVerifier, PortError, PortResult, TextGenerationService,
};

//=========================================================================================
// Scripted Language Model
//=========================================================================================

type Script = Box<dyn Fn(&str) -> PortResult<String> + Send + Sync>;

/// A `TextGenerationService` that answers each prompt with a closure.
pub struct ScriptedGenerator {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(script: impl Fn(&str) -> PortResult<String> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails like an unreachable upstream.
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| Err(PortError::Generation(message.clone())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerationService for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrently joined requests a chance to interleave, like a real network call.
        tokio::task::yield_now().await;
        let text = (self.script)(prompt)?;
        if text.trim().is_empty() {
            return Err(PortError::Generation("model returned empty text".to_string()));
        }
        Ok(text)
    }
}

//=========================================================================================
// Identity Verifier
//=========================================================================================

/// Accepts tokens of the form `google:<subject>:<email>`; anything else is unauthorized.
pub struct StaticIdentityVerifier;

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify_google_token(&self, id_token: &str) -> PortResult<GoogleIdentity> {
        let mut parts = id_token.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("google"), Some(subject), Some(email)) if !subject.is_empty() => {
                Ok(GoogleIdentity {
                    subject: subject.to_string(),
                    email: email.to_string(),
                    email_verified: true,
                    name: email.split('@').next().map(str::to_string),
                })
            }
            _ => Err(PortError::Unauthorized),
        }
    }
}

//=========================================================================================
// In-Memory Database
//=========================================================================================

struct UserRow {
    user: User,
    hashed_password: Option<String>,
    google_id: Option<String>,
}

impl UserRow {
    fn credentials(&self) -> UserCredentials {
        UserCredentials {
            user_id: self.user.user_id,
            email: self.user.email.clone(),
            hashed_password: self.hashed_password.clone(),
            google_id: self.google_id.clone(),
            is_active: self.user.is_active,
        }
    }
}

#[derive(Default)]
struct Inner {
    users: Vec<UserRow>,
    stories: Vec<Story>,
    batches: HashMap<BatchKey, Vec<DailyWord>>,
    loose_words: Vec<DailyWord>,
}

/// A `DatabaseService` backed by a mutex-guarded map, with the same uniqueness
/// rules as the Postgres schema.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail with `Persistence`, as if the database were down.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn story_count(&self) -> usize {
        self.lock().stories.len()
    }

    /// Stores a story directly, bypassing generation.
    pub fn insert_story(&self, story: NewStory) -> Story {
        let story = to_story(story);
        self.lock().stories.push(story.clone());
        story
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(PortError::Persistence("database is unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn to_story(story: NewStory) -> Story {
    Story {
        id: Uuid::new_v4(),
        title: story.title,
        content: story.content,
        topic: story.topic,
        level: story.level,
        grammar_notes: story.grammar_notes,
        created_at: Utc::now(),
    }
}

fn to_daily_word(owner: WordOwner, word: NewWord) -> DailyWord {
    DailyWord {
        id: Uuid::new_v4(),
        user_id: owner.user_id(),
        word: word.word,
        meaning: word.meaning,
        synonyms: word.synonyms,
        created_at: Utc::now(),
    }
}

fn user_not_found(user_id: Uuid) -> PortError {
    PortError::NotFound(format!("User {} not found", user_id))
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        self.check_writable()?;
        let mut inner = self.lock();
        if inner.users.iter().any(|row| row.user.email == new_user.email) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }
        let (hashed_password, google_id) = match new_user.credential {
            Credential::Password { hashed_password } => (Some(hashed_password), None),
            Credential::Google { subject } => (None, Some(subject)),
        };
        if google_id.is_some() && inner.users.iter().any(|row| row.google_id == google_id) {
            return Err(PortError::Conflict("Google account already linked".to_string()));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            is_active: true,
            is_google_account: google_id.is_some(),
            english_level: Level::default(),
            created_at: Utc::now(),
            last_login: None,
        };
        inner.users.push(UserRow {
            user: user.clone(),
            hashed_password,
            google_id,
        });
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.lock()
            .users
            .iter()
            .find(|row| row.user.user_id == user_id)
            .map(|row| row.user.clone())
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|row| row.user.email == email)
            .map(UserRow::credentials))
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> PortResult<Option<UserCredentials>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|row| row.google_id.as_deref() == Some(google_id))
            .map(UserRow::credentials))
    }

    async fn link_google_account(&self, user_id: Uuid, google_id: &str) -> PortResult<()> {
        self.check_writable()?;
        let mut inner = self.lock();
        let row = inner
            .users
            .iter_mut()
            .find(|row| row.user.user_id == user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        row.google_id = Some(google_id.to_string());
        row.user.is_google_account = true;
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid) -> PortResult<()> {
        self.check_writable()?;
        let mut inner = self.lock();
        let row = inner
            .users
            .iter_mut()
            .find(|row| row.user.user_id == user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        row.user.last_login = Some(Utc::now());
        Ok(())
    }

    async fn update_english_level(&self, user_id: Uuid, level: Level) -> PortResult<User> {
        self.check_writable()?;
        let mut inner = self.lock();
        let row = inner
            .users
            .iter_mut()
            .find(|row| row.user.user_id == user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        row.user.english_level = level;
        Ok(row.user.clone())
    }

    async fn find_story(&self, topic: &str, level: Level) -> PortResult<Option<Story>> {
        Ok(self
            .lock()
            .stories
            .iter()
            .find(|s| s.topic == topic && s.level == level)
            .cloned())
    }

    async fn create_story(&self, story: NewStory) -> PortResult<Story> {
        self.check_writable()?;
        Ok(self.insert_story(story))
    }

    async fn list_stories(&self, filter: &StoryFilter) -> PortResult<Vec<Story>> {
        Ok(self
            .lock()
            .stories
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn words_for_day(&self, owner: WordOwner, day: NaiveDate) -> PortResult<Vec<DailyWord>> {
        Ok(self
            .lock()
            .batches
            .get(&BatchKey { owner, day })
            .cloned()
            .unwrap_or_default())
    }

    async fn store_daily_batch(
        &self,
        owner: WordOwner,
        day: NaiveDate,
        words: Vec<NewWord>,
    ) -> PortResult<Vec<DailyWord>> {
        self.check_writable()?;
        let mut inner = self.lock();
        let batch = inner
            .batches
            .entry(BatchKey { owner, day })
            .or_insert_with(|| {
                words
                    .into_iter()
                    .map(|w| to_daily_word(owner, w))
                    .collect()
            });
        Ok(batch.clone())
    }

    async fn create_words(&self, owner: WordOwner, words: Vec<NewWord>) -> PortResult<Vec<DailyWord>> {
        self.check_writable()?;
        let stored: Vec<DailyWord> = words.into_iter().map(|w| to_daily_word(owner, w)).collect();
        self.lock().loose_words.extend(stored.iter().cloned());
        Ok(stored)
    }
}
