//! services/api/src/web/grammar.rs

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use story_tutor_core::domain::{GrammarHint, Level, User};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct GrammarHintRequest {
    /// Defaults to the caller's English level.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "intermediate")]
    pub level: Option<Level>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GrammarHintResponse {
    pub title: String,
    pub explanation: String,
    pub examples: Vec<String>,
    pub practice_exercises: Vec<String>,
    #[schema(value_type = String, example = "intermediate")]
    pub level: Level,
}

impl From<GrammarHint> for GrammarHintResponse {
    fn from(hint: GrammarHint) -> Self {
        Self {
            title: hint.title,
            explanation: hint.explanation,
            examples: hint.examples,
            practice_exercises: hint.practice_exercises,
            level: hint.level,
        }
    }
}

/// POST /grammar/hint/ - Generate a short grammar lesson
#[utoipa::path(
    post,
    path = "/grammar/hint/",
    request_body = GrammarHintRequest,
    responses(
        (status = 200, description = "A generated grammar lesson", body = GrammarHintResponse),
        (status = 502, description = "The generator failed or returned an unusable lesson")
    ),
    security(("bearer_auth" = []))
)]
pub async fn grammar_hint_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<GrammarHintRequest>,
) -> Result<Json<GrammarHintResponse>, ApiError> {
    let level = req.level.unwrap_or(user.english_level);
    let hint = state.grammar.hint(level).await?;
    Ok(Json(hint.into()))
}
