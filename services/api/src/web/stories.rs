//! services/api/src/web/stories.rs
//!
//! Story endpoints: get-or-generate a story for a topic and level, and list stored stories.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use story_tutor_core::domain::{GrammarNote, Level, Story, StoryFilter, User};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

const MAX_TOPIC_LEN: usize = 200;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct StoryRequest {
    pub topic: String,
    /// Defaults to the caller's English level.
    #[schema(value_type = Option<String>, example = "beginner")]
    pub level: Option<Level>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StoryListQuery {
    pub topic: Option<String>,
    #[param(value_type = Option<String>)]
    pub level: Option<Level>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GrammarNoteResponse {
    pub concept: String,
    pub explanation: String,
    pub examples: Vec<String>,
}

impl From<GrammarNote> for GrammarNoteResponse {
    fn from(note: GrammarNote) -> Self {
        Self {
            concept: note.concept,
            explanation: note.explanation,
            examples: note.examples,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoryResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub topic: String,
    #[schema(value_type = String, example = "beginner")]
    pub level: Level,
    pub grammar_notes: Vec<GrammarNoteResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<Story> for StoryResponse {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            title: story.title,
            content: story.content,
            topic: story.topic,
            level: story.level,
            grammar_notes: story.grammar_notes.into_iter().map(Into::into).collect(),
            created_at: story.created_at,
        }
    }
}

fn clean_topic(raw: &str) -> Result<String, ApiError> {
    let topic = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if topic.is_empty() {
        return Err(ApiError::Validation("topic must not be empty".to_string()));
    }
    if topic.chars().count() > MAX_TOPIC_LEN {
        return Err(ApiError::Validation(format!(
            "topic must be at most {} characters",
            MAX_TOPIC_LEN
        )));
    }
    Ok(topic)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /stories/ - Return the stored story for the topic and level, or generate one
#[utoipa::path(
    post,
    path = "/stories/",
    request_body = StoryRequest,
    responses(
        (status = 200, description = "A stored story was returned", body = StoryResponse),
        (status = 201, description = "A new story was generated and stored", body = StoryResponse),
        (status = 422, description = "Empty topic or unknown level"),
        (status = 502, description = "The generator failed or returned an unusable story")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<StoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = clean_topic(&req.topic)?;
    let level = req.level.unwrap_or(user.english_level);

    let outcome = state
        .stories
        .get_or_generate(state.db.as_ref(), &topic, level)
        .await?;
    let status = if outcome.is_cached() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(StoryResponse::from(outcome.into_story()))))
}

/// GET /stories/ - List stored stories, optionally filtered by topic and level
#[utoipa::path(
    get,
    path = "/stories/",
    params(StoryListQuery),
    responses(
        (status = 200, description = "Matching stories in creation order", body = [StoryResponse]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_stories_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoryListQuery>,
) -> Result<Json<Vec<StoryResponse>>, ApiError> {
    let filter = StoryFilter {
        topic: query
            .topic
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty()),
        level: query.level,
    };
    let stories = state.stories.list(state.db.as_ref(), &filter).await?;
    Ok(Json(stories.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_collapsed_and_bounded() {
        assert_eq!(clean_topic("  outer \n space ").unwrap(), "outer space");
        assert!(matches!(clean_topic("   "), Err(ApiError::Validation(_))));
        assert!(clean_topic(&"x".repeat(MAX_TOPIC_LEN + 1)).is_err());
    }
}
