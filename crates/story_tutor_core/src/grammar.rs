//! crates/story_tutor_core/src/grammar.rs
//!
//! Grammar lessons and the grammar notes attached to stories.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{GrammarHint, GrammarNote, Level};
use crate::parsing::{parse_grammar_hint, parse_grammar_notes};
use crate::ports::{PortResult, TextGenerationService};
use crate::prompts::{grammar_hint_prompt, grammar_notes_prompt};

#[derive(Clone)]
pub struct GrammarService {
    llm: Arc<dyn TextGenerationService>,
}

impl GrammarService {
    pub fn new(llm: Arc<dyn TextGenerationService>) -> Self {
        Self { llm }
    }

    /// Generates a standalone grammar lesson. Generation and parse failures are returned.
    pub async fn hint(&self, level: Level) -> PortResult<GrammarHint> {
        let raw = self.llm.generate(&grammar_hint_prompt(level)).await?;
        let hint = parse_grammar_hint(&raw, level)?;
        info!(%level, title = %hint.title, "Generated grammar hint");
        Ok(hint)
    }

    /// Generates grammar notes for a story. Notes are optional, so any failure
    /// yields an empty list instead of an error.
    pub async fn notes_for(&self, story: &str, level: Level) -> Vec<GrammarNote> {
        let raw = match self.llm.generate(&grammar_notes_prompt(story, level)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Grammar note generation failed, continuing without notes");
                return Vec::new();
            }
        };
        match parse_grammar_notes(&raw) {
            Ok(notes) => notes,
            Err(e) => {
                warn!(reason = %e.reason, raw = %e.raw, "Discarding invalid grammar notes batch");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    #[tokio::test]
    async fn invalid_notes_batch_degrades_to_empty() {
        let llm = Arc::new(ScriptedGenerator::new(|_| {
            Ok(r#"[{"concept": "Plurals", "explanation": "add s"}]"#.to_string())
        }));
        let notes = GrammarService::new(llm).notes_for("Cats run.", Level::Beginner).await;
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_empty() {
        let llm = Arc::new(ScriptedGenerator::failing("quota exceeded"));
        let notes = GrammarService::new(llm).notes_for("Cats run.", Level::Beginner).await;
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn hint_parse_failure_is_surfaced() {
        let llm = Arc::new(ScriptedGenerator::new(|_| Ok("Sorry, I can't.".to_string())));
        let err = GrammarService::new(llm).hint(Level::Advanced).await.unwrap_err();
        assert!(matches!(err, crate::ports::PortError::Parse { .. }));
    }
}
