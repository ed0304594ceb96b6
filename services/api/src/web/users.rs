//! services/api/src/web/users.rs
//!
//! The user profile payload and the endpoint for changing a user's English level.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use story_tutor_core::domain::{Level, User};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub is_google_account: bool,
    #[schema(value_type = String, example = "beginner")]
    pub english_level: Level,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
            is_google_account: user.is_google_account,
            english_level: user.english_level,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLevelRequest {
    #[schema(value_type = String, example = "intermediate")]
    pub level: Level,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// PATCH /users/english-level - Change the level used for the caller's content
#[utoipa::path(
    patch,
    path = "/users/english-level",
    request_body = UpdateLevelRequest,
    responses(
        (status = 200, description = "Level updated", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 422, description = "Unknown level")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_level_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<UpdateLevelRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state
        .db
        .update_english_level(user.user_id, req.level)
        .await?;
    info!(user_id = %updated.user_id, level = %updated.english_level, "English level updated");
    Ok(Json(updated.into()))
}
