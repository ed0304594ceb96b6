//! services/api/src/web/rest.rs
//!
//! Contains the health check endpoint and the master definition for the OpenAPI
//! specification.

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::web::{auth, grammar, stories, users, words};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::google_login_handler,
        auth::me_handler,
        users::update_level_handler,
        stories::create_story_handler,
        stories::list_stories_handler,
        grammar::grammar_hint_handler,
        words::daily_words_handler,
        words::add_word_handler,
        words::generate_words_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::GoogleLoginRequest,
            auth::AuthResponse,
            users::UserResponse,
            users::UpdateLevelRequest,
            stories::StoryRequest,
            stories::StoryResponse,
            stories::GrammarNoteResponse,
            grammar::GrammarHintRequest,
            grammar::GrammarHintResponse,
            words::NewWordRequest,
            words::WordResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Story Tutor API", description = "Generated stories, grammar lessons and vocabulary for English learners.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
