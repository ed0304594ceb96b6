//! services/api/src/web/words.rs
//!
//! Vocabulary endpoints: the daily batch, manual additions and on-demand generation.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use story_tutor_core::domain::{DailyWord, Level, NewWord, User, WordOwner};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const MAX_GENERATED_WORDS: usize = 20;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct NewWordRequest {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateWordsQuery {
    /// Defaults to the caller's English level.
    #[param(value_type = Option<String>)]
    pub level: Option<Level>,
    /// Between 1 and 20; defaults to the daily batch size.
    pub count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WordResponse {
    pub id: Uuid,
    pub word: String,
    pub meaning: String,
    pub synonyms: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DailyWord> for WordResponse {
    fn from(word: DailyWord) -> Self {
        Self {
            id: word.id,
            word: word.word,
            meaning: word.meaning,
            synonyms: word.synonyms,
            created_at: word.created_at,
        }
    }
}

fn to_responses(words: Vec<DailyWord>) -> Vec<WordResponse> {
    words.into_iter().map(Into::into).collect()
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /daily-words/ - Today's words for the caller, generated on the first request of the day
#[utoipa::path(
    get,
    path = "/daily-words/",
    responses(
        (status = 200, description = "Today's batch", body = [WordResponse]),
        (status = 502, description = "The generator failed or returned unusable words")
    ),
    security(("bearer_auth" = []))
)]
pub async fn daily_words_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<WordResponse>>, ApiError> {
    let today = Utc::now().date_naive();
    let words = state
        .words
        .daily_words(
            state.db.as_ref(),
            WordOwner::User(user.user_id),
            user.english_level,
            today,
        )
        .await?;
    Ok(Json(to_responses(words)))
}

/// POST /words/ - Add a word by hand
#[utoipa::path(
    post,
    path = "/words/",
    request_body = NewWordRequest,
    responses(
        (status = 201, description = "The stored word", body = WordResponse),
        (status = 422, description = "Blank word or meaning")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_word_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<NewWordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let word = req.word.trim();
    let meaning = req.meaning.trim();
    if word.is_empty() || meaning.is_empty() {
        return Err(ApiError::Validation(
            "word and meaning must not be empty".to_string(),
        ));
    }
    let synonyms = req
        .synonyms
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let stored = state
        .words
        .add_word(
            state.db.as_ref(),
            WordOwner::User(user.user_id),
            NewWord {
                word: word.to_string(),
                meaning: meaning.to_string(),
                synonyms,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(WordResponse::from(stored))))
}

/// POST /words/generate - Generate and store extra words outside the daily batch
#[utoipa::path(
    post,
    path = "/words/generate",
    params(GenerateWordsQuery),
    responses(
        (status = 201, description = "The generated words", body = [WordResponse]),
        (status = 422, description = "Count out of range"),
        (status = 502, description = "The generator failed or returned unusable words")
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate_words_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<GenerateWordsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let count = query.count.unwrap_or(state.words.words_per_batch());
    if !(1..=MAX_GENERATED_WORDS).contains(&count) {
        return Err(ApiError::Validation(format!(
            "count must be between 1 and {}",
            MAX_GENERATED_WORDS
        )));
    }
    let level = query.level.unwrap_or(user.english_level);

    let words = state
        .words
        .generate_and_store(state.db.as_ref(), WordOwner::User(user.user_id), level, count)
        .await?;
    info!(user_id = %user.user_id, %level, count = words.len(), "Generated extra words");
    Ok((StatusCode::CREATED, Json(to_responses(words))))
}
