//! crates/story_tutor_core/src/prompts.rs
//!
//! Prompt templates sent to the language model. Placeholders in `{braces}` are
//! filled with `str::replace`.

use crate::domain::Level;

const STORY_TEMPLATE: &str = r#"Write a short story about {topic}.
The story is for {level} English learners, so use {vocabulary}.
It should be engaging and have a clear beginning, middle, and end.
Also give the story an appropriate title.

Respond with ONLY a JSON object, no commentary:
{"title": "<story title>", "content": "<story text>"}

If you cannot produce JSON, use exactly this format instead:
Title: <story title>
Story: <story text>"#;

const GRAMMAR_NOTES_TEMPLATE: &str = r#"You are an English teacher. Read the story below, written for {level} learners, and pick 2 or 3 grammar concepts it uses that suit {focus}.

STORY:
---
{story}
---

Respond with ONLY a JSON array, no commentary. Each element must look like:
{"concept": "<grammar concept>", "explanation": "<short explanation>", "examples": ["<sentence from or like the story>", "<another sentence>"]}
Every element needs at least two examples."#;

const GRAMMAR_HINT_TEMPLATE: &str = r#"Generate a new and unique English grammar lesson for {level} level students.
Focus on {focus}.

Respond with ONLY a JSON object with these fields:
- "title": a specific grammar point or rule
- "explanation": a clear explanation of the rule
- "examples": a list of 3 practical example sentences
- "practice_exercises": a list of 3 fill-in-the-blank or rewrite exercises
- "level": "{level}"

Make it engaging and practical for real-world usage."#;

const WORDS_TEMPLATE: &str = r#"Generate {count} {level} level English vocabulary words with their {language} translations and synonyms.
The words should be appropriate for English language learners at {level} level.

Respond with ONLY a JSON array, no commentary, where each element looks like:
{"word": "example", "meaning": "<{language} translation>", "synonyms": ["instance", "sample"]}

Make sure each translation is accurate and the synonyms are at a similar difficulty level."#;

pub fn story_prompt(topic: &str, level: Level) -> String {
    STORY_TEMPLATE
        .replace("{topic}", topic)
        .replace("{level}", level.as_str())
        .replace("{vocabulary}", level.vocabulary_focus())
}

pub fn grammar_notes_prompt(story: &str, level: Level) -> String {
    GRAMMAR_NOTES_TEMPLATE
        .replace("{level}", level.as_str())
        .replace("{focus}", level.grammar_focus())
        .replace("{story}", story)
}

pub fn grammar_hint_prompt(level: Level) -> String {
    GRAMMAR_HINT_TEMPLATE
        .replace("{level}", level.as_str())
        .replace("{focus}", level.grammar_focus())
}

pub fn words_prompt(level: Level, count: usize, language: &str) -> String {
    WORDS_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{level}", level.as_str())
        .replace("{language}", language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_prompt_fills_every_placeholder() {
        let prompt = story_prompt("space travel", Level::Advanced);
        assert!(prompt.contains("about space travel"));
        assert!(prompt.contains(Level::Advanced.vocabulary_focus()));
        assert!(!prompt.contains("{topic}"));
    }

    #[test]
    fn words_prompt_names_language_and_count() {
        let prompt = words_prompt(Level::Beginner, 5, "Persian");
        assert!(prompt.starts_with("Generate 5 beginner level"));
        assert!(prompt.contains("Persian translation"));
    }
}
