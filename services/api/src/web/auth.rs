//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: email/password registration and login, Google sign-in,
//! and the current-user lookup.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use story_tutor_core::domain::{Credential, NewUser, User};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::users::UserResponse;

const MIN_PASSWORD_LEN: usize = 8;
const BAD_CREDENTIALS: &str = "Incorrect email or password";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Accepted as `username` too, for OAuth2-style clients.
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct GoogleLoginRequest {
    /// The Google ID token obtained by the frontend.
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Trims and lowercases an email, rejecting values that cannot be an address.
pub(crate) fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(ApiError::Validation(format!("'{}' is not a valid email address", raw.trim())))
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

pub(crate) fn verify_password(password: &str, hashed: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Records the login and issues an access token for the user.
async fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    state.db.record_login(user.user_id).await?;
    let user = state.db.get_user(user.user_id).await?;
    let access_token = state
        .tokens
        .generate_access_token(user.user_id, &user.email)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(AuthResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.tokens.access_token_expiry_seconds(),
        user: user.into(),
    })
}

fn ensure_active(user: &User) -> Result<(), ApiError> {
    if user.is_active {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Inactive user".to_string()))
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Email already registered"),
        (status = 422, description = "Invalid email or password")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate the input
    let email = normalize_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    // 2. Hash the password and create the user
    let hashed_password = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(NewUser {
            email,
            name,
            credential: Credential::Password { hashed_password },
        })
        .await?;
    info!(user_id = %user.user_id, "User registered");

    // 3. Log the new user in
    let response = issue_tokens(&state, user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Login with an existing email/password account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Inactive user"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    // 1. Get the stored credentials
    let creds = state
        .db
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    // 2. Verify the password; Google-only accounts have none
    let hashed = creds
        .hashed_password
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;
    if !verify_password(&req.password, hashed)? {
        warn!(user_id = %creds.user_id, "Failed password login");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    // 3. Issue the token
    let user = state.db.get_user(creds.user_id).await?;
    ensure_active(&user)?;
    let response = issue_tokens(&state, user).await?;
    info!(user_id = %response.user.id, "User logged in");
    Ok(Json(response))
}

/// POST /auth/google - Sign in with a Google ID token
///
/// Finds the account by Google subject, then by email (linking the Google identity),
/// and creates a new Google account when neither exists.
#[utoipa::path(
    post,
    path = "/auth/google",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email not verified, linked to another Google account, or inactive user"),
        (status = 401, description = "Invalid Google token")
    )
)]
pub async fn google_login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // 1. Verify the token with Google
    let identity = state.identity.verify_google_token(req.token.trim()).await?;
    if !identity.email_verified {
        return Err(ApiError::BadRequest(
            "Google account email not verified".to_string(),
        ));
    }
    let email = identity.email.trim().to_lowercase();

    // 2. Find or create the user
    let user = if let Some(creds) = state.db.find_user_by_google_id(&identity.subject).await? {
        state.db.get_user(creds.user_id).await?
    } else if let Some(creds) = state.db.find_user_by_email(&email).await? {
        if let Some(linked) = creds.google_id.as_deref() {
            if linked != identity.subject {
                warn!(user_id = %creds.user_id, "Email already linked to a different Google account");
                return Err(ApiError::BadRequest(
                    "Email is linked to a different Google account".to_string(),
                ));
            }
        }
        state
            .db
            .link_google_account(creds.user_id, &identity.subject)
            .await?;
        info!(user_id = %creds.user_id, "Linked Google account to existing user");
        state.db.get_user(creds.user_id).await?
    } else {
        let user = state
            .db
            .create_user(NewUser {
                email,
                name: identity.name,
                credential: Credential::Google {
                    subject: identity.subject,
                },
            })
            .await?;
        info!(user_id = %user.user_id, "User registered through Google");
        user
    };

    // 3. Issue the token
    ensure_active(&user)?;
    Ok(Json(issue_tokens(&state, user).await?))
}

/// GET /auth/me - The authenticated user's profile
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(user.into())
}
