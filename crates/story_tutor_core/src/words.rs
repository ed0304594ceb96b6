//! crates/story_tutor_core/src/words.rs
//!
//! Vocabulary generation and the once-per-day word batch.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::domain::{DailyWord, Level, NewWord, WordOwner};
use crate::parsing::parse_words;
use crate::ports::{DatabaseService, PortResult, TextGenerationService};
use crate::prompts::words_prompt;

#[derive(Clone)]
pub struct WordService {
    llm: Arc<dyn TextGenerationService>,
    words_per_batch: usize,
    translation_language: String,
}

impl WordService {
    pub fn new(
        llm: Arc<dyn TextGenerationService>,
        words_per_batch: usize,
        translation_language: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            words_per_batch,
            translation_language: translation_language.into(),
        }
    }

    pub fn words_per_batch(&self) -> usize {
        self.words_per_batch
    }

    /// Returns the owner's batch for `today`, generating and storing one if absent.
    ///
    /// The existence check and the insert are not atomic on their own. Two requests
    /// can both see an empty day and both call the model; `store_daily_batch` then
    /// keeps the first batch and hands it to both.
    pub async fn daily_words(
        &self,
        db: &dyn DatabaseService,
        owner: WordOwner,
        level: Level,
        today: NaiveDate,
    ) -> PortResult<Vec<DailyWord>> {
        let existing = db.words_for_day(owner, today).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let generated = self.generate_words(level, self.words_per_batch).await?;
        let batch = db.store_daily_batch(owner, today, generated).await?;
        info!(owner = %owner.key(), %today, words = batch.len(), "Daily word batch ready");
        Ok(batch)
    }

    /// Asks the model for `count` words. Unusable output is an error, never a placeholder list.
    pub async fn generate_words(&self, level: Level, count: usize) -> PortResult<Vec<NewWord>> {
        let prompt = words_prompt(level, count, &self.translation_language);
        let raw = self.llm.generate(&prompt).await?;
        Ok(parse_words(&raw)?)
    }

    /// Generates words on demand and stores them outside any daily batch.
    pub async fn generate_and_store(
        &self,
        db: &dyn DatabaseService,
        owner: WordOwner,
        level: Level,
        count: usize,
    ) -> PortResult<Vec<DailyWord>> {
        let words = self.generate_words(level, count).await?;
        db.create_words(owner, words).await
    }

    pub async fn add_word(
        &self,
        db: &dyn DatabaseService,
        owner: WordOwner,
        word: NewWord,
    ) -> PortResult<DailyWord> {
        let mut stored = db.create_words(owner, vec![word]).await?;
        stored
            .pop()
            .ok_or_else(|| crate::ports::PortError::Persistence("word was not stored".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortError;
    use crate::testing::{InMemoryStore, ScriptedGenerator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    /// Every call yields a differently named word so batches can be told apart.
    fn numbered_words() -> Arc<ScriptedGenerator> {
        let counter = AtomicUsize::new(0);
        Arc::new(ScriptedGenerator::new(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!(
                r#"[{{"word": "word{n}", "meaning": "m{n}", "synonyms": ["s{n}"]}}]"#
            ))
        }))
    }

    #[tokio::test]
    async fn second_request_on_same_day_reuses_batch() {
        let db = InMemoryStore::new();
        let llm = numbered_words();
        let service = WordService::new(llm.clone(), 1, "Persian");
        let owner = WordOwner::User(Uuid::new_v4());

        let first = service.daily_words(&db, owner, Level::Beginner, day()).await.unwrap();
        let second = service.daily_words(&db, owner, Level::Beginner, day()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_batch() {
        let db = InMemoryStore::new();
        let llm = numbered_words();
        let service = WordService::new(llm.clone(), 1, "Persian");
        let owner = WordOwner::User(Uuid::new_v4());

        let (a, b) = tokio::join!(
            service.daily_words(&db, owner, Level::Beginner, day()),
            service.daily_words(&db, owner, Level::Beginner, day()),
        );

        // Both requests saw an empty day and called the model; one batch was kept.
        assert_eq!(llm.calls(), 2);
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(db.words_for_day(owner, day()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn new_day_gets_new_batch() {
        let db = InMemoryStore::new();
        let service = WordService::new(numbered_words(), 1, "Persian");
        let owner = WordOwner::Global;
        let tomorrow = day().succ_opt().unwrap();

        let today_words = service.daily_words(&db, owner, Level::Beginner, day()).await.unwrap();
        let tomorrow_words = service.daily_words(&db, owner, Level::Beginner, tomorrow).await.unwrap();

        assert_ne!(today_words[0].word, tomorrow_words[0].word);
    }

    #[tokio::test]
    async fn unparseable_words_fail_loud() {
        let db = InMemoryStore::new();
        let llm = Arc::new(ScriptedGenerator::new(|_| Ok("here are some words".to_string())));
        let service = WordService::new(llm, 5, "Persian");

        let err = service
            .daily_words(&db, WordOwner::Global, Level::Beginner, day())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Parse { .. }));
        assert!(db.words_for_day(WordOwner::Global, day()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_words_do_not_count_as_daily_batch() {
        let db = InMemoryStore::new();
        let llm = numbered_words();
        let service = WordService::new(llm.clone(), 1, "Persian");
        let owner = WordOwner::User(Uuid::new_v4());

        let added = service
            .add_word(
                &db,
                owner,
                NewWord {
                    word: "ephemeral".to_string(),
                    meaning: "زودگذر".to_string(),
                    synonyms: vec!["fleeting".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(added.user_id, owner.user_id());

        let batch = service.daily_words(&db, owner, Level::Advanced, day()).await.unwrap();
        assert_eq!(batch[0].word, "word0");
        assert_eq!(llm.calls(), 1);
    }
}
