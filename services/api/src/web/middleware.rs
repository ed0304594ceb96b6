//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use story_tutor_core::ports::PortError;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::web::state::AppState;

const CREDENTIALS_ERROR: &str = "Could not validate credentials";

/// Middleware that validates the bearer access token and loads the user it names.
///
/// If valid, inserts the `User` into request extensions for handlers to use.
/// A missing, malformed or expired token, or a token for a deleted user, is a 401.
/// Deactivated accounts are rejected with a 400.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(CREDENTIALS_ERROR.to_string()))?;

    // 2. Validate signature and expiry
    let claims = state.tokens.validate_access_token(token).map_err(|e| {
        debug!(error = %e, "Rejected access token");
        ApiError::Unauthorized(CREDENTIALS_ERROR.to_string())
    })?;
    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized(CREDENTIALS_ERROR.to_string()))?;

    // 3. Load the user
    let user = match state.db.get_user(user_id).await {
        Ok(user) => user,
        Err(PortError::NotFound(_)) => {
            warn!(%user_id, "Access token names an unknown user");
            return Err(ApiError::Unauthorized(CREDENTIALS_ERROR.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    // 4. Insert the user into request extensions
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
