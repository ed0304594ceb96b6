//! crates/story_tutor_core/src/stories.rs
//!
//! The "get or generate" workflow for stories.
//!
//! A request moves through LOOKUP -> (cached) or GENERATE -> PARSE -> PERSIST.
//! A failure in any of the last three steps is returned to the caller and nothing
//! is stored, so a half-built story is never visible.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{Level, NewStory, Story, StoryFilter};
use crate::grammar::GrammarService;
use crate::parsing::parse_story;
use crate::ports::{DatabaseService, PortResult, TextGenerationService};
use crate::prompts::story_prompt;

/// Whether an existing story for the same topic and level is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoryCachePolicy {
    #[default]
    CacheFirst,
    AlwaysGenerate,
}

#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a story cache policy (expected cache_first or always_generate)")]
pub struct InvalidCachePolicy(pub String);

impl FromStr for StoryCachePolicy {
    type Err = InvalidCachePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cache_first" => Ok(StoryCachePolicy::CacheFirst),
            "always_generate" => Ok(StoryCachePolicy::AlwaysGenerate),
            _ => Err(InvalidCachePolicy(s.to_string())),
        }
    }
}

impl fmt::Display for StoryCachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryCachePolicy::CacheFirst => f.write_str("cache_first"),
            StoryCachePolicy::AlwaysGenerate => f.write_str("always_generate"),
        }
    }
}

/// The story handed back to the caller, tagged with where it came from.
#[derive(Debug, Clone)]
pub enum StoryOutcome {
    Cached(Story),
    Generated(Story),
}

impl StoryOutcome {
    pub fn is_cached(&self) -> bool {
        matches!(self, StoryOutcome::Cached(_))
    }

    pub fn into_story(self) -> Story {
        match self {
            StoryOutcome::Cached(story) | StoryOutcome::Generated(story) => story,
        }
    }
}

#[derive(Clone)]
pub struct StoryService {
    llm: Arc<dyn TextGenerationService>,
    grammar: GrammarService,
    policy: StoryCachePolicy,
}

impl StoryService {
    pub fn new(llm: Arc<dyn TextGenerationService>, policy: StoryCachePolicy) -> Self {
        Self {
            grammar: GrammarService::new(llm.clone()),
            llm,
            policy,
        }
    }

    pub async fn get_or_generate(
        &self,
        db: &dyn DatabaseService,
        topic: &str,
        level: Level,
    ) -> PortResult<StoryOutcome> {
        if self.policy == StoryCachePolicy::CacheFirst {
            if let Some(story) = db.find_story(topic, level).await? {
                debug!(story_id = %story.id, topic, %level, "Serving cached story");
                return Ok(StoryOutcome::Cached(story));
            }
        }
        self.generate(db, topic, level).await.map(StoryOutcome::Generated)
    }

    /// Always asks the model for a new story and stores it.
    pub async fn generate(
        &self,
        db: &dyn DatabaseService,
        topic: &str,
        level: Level,
    ) -> PortResult<Story> {
        let raw = self.llm.generate(&story_prompt(topic, level)).await?;
        let parsed = parse_story(&raw, topic)?;
        let grammar_notes = self.grammar.notes_for(&parsed.content, level).await;

        let story = db
            .create_story(NewStory {
                title: parsed.title,
                content: parsed.content,
                topic: topic.to_string(),
                level,
                grammar_notes,
            })
            .await?;
        info!(
            story_id = %story.id,
            topic,
            %level,
            notes = story.grammar_notes.len(),
            "Generated new story"
        );
        Ok(story)
    }

    pub async fn list(
        &self,
        db: &dyn DatabaseService,
        filter: &StoryFilter,
    ) -> PortResult<Vec<Story>> {
        db.list_stories(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortError;
    use crate::testing::{InMemoryStore, ScriptedGenerator};

    const NOTES: &str = r#"[{"concept": "Past simple", "explanation": "Finished actions.", "examples": ["I flew.", "We landed."]}]"#;

    fn story_llm() -> Arc<ScriptedGenerator> {
        Arc::new(ScriptedGenerator::new(|prompt| {
            if prompt.contains("grammar concepts") {
                Ok(NOTES.to_string())
            } else {
                Ok("Title: Rocket Day\nStory: We flew to the moon.".to_string())
            }
        }))
    }

    #[tokio::test]
    async fn cache_first_returns_the_same_record_twice() {
        let db = InMemoryStore::new();
        let llm = story_llm();
        let service = StoryService::new(llm.clone(), StoryCachePolicy::CacheFirst);

        let first = service.get_or_generate(&db, "space", Level::Beginner).await.unwrap();
        let second = service.get_or_generate(&db, "space", Level::Beginner).await.unwrap();

        assert!(!first.is_cached());
        assert!(second.is_cached());
        assert_eq!(first.into_story(), second.into_story());
        // one story prompt and one grammar notes prompt
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn always_generate_skips_lookup() {
        let db = InMemoryStore::new();
        let service = StoryService::new(story_llm(), StoryCachePolicy::AlwaysGenerate);

        let first = service.get_or_generate(&db, "space", Level::Beginner).await.unwrap();
        let second = service.get_or_generate(&db, "space", Level::Beginner).await.unwrap();

        assert!(!second.is_cached());
        assert_ne!(first.into_story().id, second.into_story().id);
        assert_eq!(db.story_count(), 2);
    }

    #[tokio::test]
    async fn generated_story_carries_parsed_fields_and_notes() {
        let db = InMemoryStore::new();
        let service = StoryService::new(story_llm(), StoryCachePolicy::CacheFirst);

        let story = service
            .get_or_generate(&db, "space", Level::Intermediate)
            .await
            .unwrap()
            .into_story();

        assert_eq!(story.title, "Rocket Day");
        assert_eq!(story.content, "We flew to the moon.");
        assert_eq!(story.topic, "space");
        assert_eq!(story.grammar_notes.len(), 1);
    }

    #[tokio::test]
    async fn upstream_failure_stores_nothing() {
        let db = InMemoryStore::new();
        let service = StoryService::new(
            Arc::new(ScriptedGenerator::failing("model unavailable")),
            StoryCachePolicy::CacheFirst,
        );

        let err = service.get_or_generate(&db, "space", Level::Beginner).await.unwrap_err();
        assert!(matches!(err, PortError::Generation(_)));
        assert_eq!(db.story_count(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_is_reported() {
        let db = InMemoryStore::new();
        db.fail_writes(true);
        let service = StoryService::new(story_llm(), StoryCachePolicy::CacheFirst);

        let err = service.get_or_generate(&db, "space", Level::Beginner).await.unwrap_err();
        assert!(matches!(err, PortError::Persistence(_)));
        assert_eq!(db.story_count(), 0);
    }

    #[tokio::test]
    async fn list_filters_by_topic_and_level() {
        let db = InMemoryStore::new();
        let service = StoryService::new(story_llm(), StoryCachePolicy::CacheFirst);
        service.generate(&db, "space", Level::Beginner).await.unwrap();
        service.generate(&db, "ocean", Level::Beginner).await.unwrap();

        let filter = StoryFilter {
            topic: Some("space".to_string()),
            level: Some(Level::Beginner),
        };
        let stories = service.list(&db, &filter).await.unwrap();

        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].topic, "space");
    }

    #[test]
    fn cache_policy_parses_both_spellings() {
        assert_eq!(
            "always-generate".parse::<StoryCachePolicy>().unwrap(),
            StoryCachePolicy::AlwaysGenerate
        );
        assert_eq!(
            "CACHE_FIRST".parse::<StoryCachePolicy>().unwrap(),
            StoryCachePolicy::CacheFirst
        );
        assert!("sometimes".parse::<StoryCachePolicy>().is_err());
    }
}
