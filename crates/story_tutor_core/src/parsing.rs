//! crates/story_tutor_core/src/parsing.rs
//!
//! Turns free-form language model output into domain values.
//!
//! Every JSON decode follows the same order: the body of the first markdown code
//! fence, then the raw text, then the outermost `{...}` or `[...]` span of the fence
//! body (models like to wrap JSON in prose), then a `ParseError` carrying the
//! offending text.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::domain::{GrammarHint, GrammarNote, Level, NewWord};

/// Grammar notes and hints need at least this many example sentences.
pub const MIN_EXAMPLES: usize = 2;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

static TITLE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t#>]*\*{0,2}[ \t]*title[ \t]*\*{0,2}[ \t]*:[ \t]*\*{0,2}")
        .expect("title marker pattern is valid")
});

static STORY_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t#>]*\*{0,2}[ \t]*story[ \t]*\*{0,2}[ \t]*:[ \t]*\*{0,2}")
        .expect("story marker pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ParseError {
    pub reason: String,
    /// The model output that could not be parsed.
    pub raw: String,
}

impl ParseError {
    fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

//=========================================================================================
// Generic Helpers
//=========================================================================================

/// Returns the body of the first fenced code block, or the trimmed text when there is none.
/// An opening fence without a closing one is dropped as well.
pub fn strip_code_fences(text: &str) -> &str {
    if let Some(body) = FENCE.captures(text).and_then(|caps| caps.get(1)) {
        return body.as_str().trim();
    }
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => rest
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .trim(),
        None => trimmed,
    }
}

pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let body = strip_code_fences(raw);
    let fenced_err = match serde_json::from_str::<T>(body) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    if let Ok(value) = serde_json::from_str::<T>(raw.trim()) {
        return Ok(value);
    }
    if let Some(span) = outermost_json_span(body).filter(|span| *span != body) {
        if let Ok(value) = serde_json::from_str::<T>(span) {
            return Ok(value);
        }
    }
    Err(ParseError::new(format!("invalid JSON: {fenced_err}"), raw))
}

/// The text from the first `{` or `[` up to the last matching closer.
fn outermost_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn looks_like_json_object(raw: &str) -> bool {
    strip_code_fences(raw).starts_with('{')
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

//=========================================================================================
// Stories
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStory {
    pub title: String,
    pub content: String,
}

#[derive(Deserialize)]
struct StoryPayload {
    title: Option<String>,
    content: Option<String>,
    story: Option<String>,
    text: Option<String>,
}

impl StoryPayload {
    fn has_content(&self) -> bool {
        [&self.content, &self.story, &self.text]
            .into_iter()
            .flatten()
            .any(|c| !c.trim().is_empty())
    }

    fn into_parts(self) -> (String, String) {
        let content = [self.content, self.story, self.text]
            .into_iter()
            .flatten()
            .find(|c| !c.trim().is_empty())
            .unwrap_or_default();
        (self.title.unwrap_or_default(), content)
    }
}

/// Parses a story from either the JSON contract `{"title", "content"}` or the
/// `Title:` / `Story:` marker format.
///
/// Marker handling, in order:
/// - both markers: each value runs up to the other marker or the end of the text;
/// - only `Title:`: the rest of that line is the title, everything after it the content;
/// - only `Story:`: the content follows the marker;
/// - no marker: the whole text is the content.
///
/// A missing or blank title becomes `fallback_title`. Blank content is an error, and so
/// is a JSON object that does not decode: it is never stored as prose.
pub fn parse_story(raw: &str, fallback_title: &str) -> Result<ParsedStory, ParseError> {
    let (title, content) = match decode_json::<StoryPayload>(raw) {
        Ok(payload) if payload.has_content() || looks_like_json_object(raw) => {
            payload.into_parts()
        }
        Err(e) if looks_like_json_object(raw) => return Err(e),
        _ => split_story_markers(raw),
    };

    let content = content.trim();
    if content.is_empty() {
        return Err(ParseError::new("story content is empty", raw));
    }

    let title = clean_title(&title);
    let title = if title.is_empty() {
        fallback_title.trim().to_string()
    } else {
        title
    };

    Ok(ParsedStory {
        title,
        content: content.to_string(),
    })
}

fn split_story_markers(raw: &str) -> (String, String) {
    let text = raw.trim();
    match (TITLE_MARKER.find(text), STORY_MARKER.find(text)) {
        (Some(t), Some(s)) => {
            let title_end = if s.start() >= t.end() { s.start() } else { text.len() };
            let story_end = if t.start() >= s.end() { t.start() } else { text.len() };
            (
                text[t.end()..title_end].to_string(),
                text[s.end()..story_end].to_string(),
            )
        }
        (Some(t), None) => match text[t.end()..].split_once('\n') {
            Some((line, body)) => (line.to_string(), body.to_string()),
            None => (text[t.end()..].to_string(), String::new()),
        },
        (None, Some(s)) => (String::new(), text[s.end()..].to_string()),
        (None, None) => (String::new(), text.to_string()),
    }
}

fn clean_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '*' || c == '"' || c == '#' || c.is_whitespace())
        .to_string()
}

//=========================================================================================
// Grammar
//=========================================================================================

#[derive(Deserialize)]
struct RawNote {
    concept: Option<String>,
    explanation: Option<String>,
    examples: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NotesPayload {
    List(Vec<RawNote>),
    Wrapped {
        #[serde(alias = "notes")]
        grammar_notes: Vec<RawNote>,
    },
}

/// Parses a batch of grammar notes. One invalid note rejects the whole batch.
pub fn parse_grammar_notes(raw: &str) -> Result<Vec<GrammarNote>, ParseError> {
    let notes = match decode_json::<NotesPayload>(raw)? {
        NotesPayload::List(notes) => notes,
        NotesPayload::Wrapped { grammar_notes } => grammar_notes,
    };

    notes
        .into_iter()
        .enumerate()
        .map(|(i, note)| {
            validate_note(note).map_err(|reason| ParseError::new(format!("note {i}: {reason}"), raw))
        })
        .collect()
}

fn validate_note(note: RawNote) -> Result<GrammarNote, String> {
    let concept = non_blank(note.concept).ok_or("missing concept")?;
    let explanation = non_blank(note.explanation).ok_or("missing explanation")?;
    let examples = clean_list(note.examples.ok_or("missing examples")?);
    if examples.len() < MIN_EXAMPLES {
        return Err(format!(
            "expected at least {MIN_EXAMPLES} examples, got {}",
            examples.len()
        ));
    }
    Ok(GrammarNote {
        concept,
        explanation,
        examples,
    })
}

#[derive(Deserialize)]
struct RawHint {
    title: Option<String>,
    explanation: Option<String>,
    examples: Option<Vec<String>>,
    #[serde(default)]
    practice_exercises: Vec<String>,
}

/// Parses a grammar lesson. The level is taken from the request, not from the model.
pub fn parse_grammar_hint(raw: &str, level: Level) -> Result<GrammarHint, ParseError> {
    let hint: RawHint = decode_json(raw)?;

    let title = non_blank(hint.title).ok_or_else(|| ParseError::new("missing title", raw))?;
    let explanation =
        non_blank(hint.explanation).ok_or_else(|| ParseError::new("missing explanation", raw))?;
    let examples = clean_list(
        hint.examples
            .ok_or_else(|| ParseError::new("missing examples", raw))?,
    );
    if examples.len() < MIN_EXAMPLES {
        return Err(ParseError::new(
            format!("expected at least {MIN_EXAMPLES} examples, got {}", examples.len()),
            raw,
        ));
    }

    Ok(GrammarHint {
        title,
        explanation,
        examples,
        practice_exercises: clean_list(hint.practice_exercises),
        level,
    })
}

//=========================================================================================
// Vocabulary
//=========================================================================================

#[derive(Deserialize)]
struct RawWord {
    word: Option<String>,
    #[serde(alias = "persian", alias = "persian_meaning", alias = "translation")]
    meaning: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WordsPayload {
    List(Vec<RawWord>),
    Wrapped { words: Vec<RawWord> },
}

pub fn parse_words(raw: &str) -> Result<Vec<NewWord>, ParseError> {
    let words = match decode_json::<WordsPayload>(raw)? {
        WordsPayload::List(words) => words,
        WordsPayload::Wrapped { words } => words,
    };
    if words.is_empty() {
        return Err(ParseError::new("no words in response", raw));
    }

    words
        .into_iter()
        .enumerate()
        .map(|(i, w)| {
            let word = non_blank(w.word)
                .ok_or_else(|| ParseError::new(format!("word {i}: missing word"), raw))?;
            let meaning = non_blank(w.meaning)
                .ok_or_else(|| ParseError::new(format!("word {i}: missing meaning"), raw))?;
            Ok(NewWord {
                word,
                meaning,
                synonyms: clean_list(w.synonyms),
            })
        })
        .collect()
}
