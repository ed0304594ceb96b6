//! Shared setup for the HTTP integration tests: the real router over in-memory ports.

#![allow(dead_code)]

use api_lib::config::{Config, LogFormat};
use api_lib::web::{build_router, state::AppState};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use std::sync::Arc;
use story_tutor_core::testing::{InMemoryStore, ScriptedGenerator, StaticIdentityVerifier};
use story_tutor_core::StoryCachePolicy;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery";

pub const STORY_JSON: &str =
    r#"{"title": "The Red Planet", "content": "Mia looked at Mars. She wanted to visit it."}"#;
pub const NOTES_JSON: &str = r#"```json
[{"concept": "Past simple", "explanation": "Finished actions.", "examples": ["Mia looked.", "She wanted."]}]
```"#;
pub const HINT_JSON: &str = r#"{"title": "Present perfect", "explanation": "Links past and present.", "examples": ["I have eaten.", "She has gone."], "practice_exercises": ["I ___ (see) it."], "level": "advanced"}"#;
pub const WORDS_JSON: &str = r#"[{"word": "brave", "persian": "شجاع", "synonyms": ["bold"]}, {"word": "calm", "meaning": "آرام", "synonyms": []}]"#;

/// Answers every prompt kind with a well-formed response.
pub fn happy_generator() -> ScriptedGenerator {
    ScriptedGenerator::new(|prompt| {
        let text = if prompt.starts_with("Write a short story") {
            STORY_JSON
        } else if prompt.contains("grammar concepts") {
            NOTES_JSON
        } else if prompt.contains("grammar lesson") {
            HINT_JSON
        } else if prompt.contains("vocabulary words") {
            WORDS_JSON
        } else {
            ""
        };
        Ok(text.to_string())
    })
}

pub fn test_config(policy: StoryCachePolicy) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        log_format: LogFormat::Pretty,
        gemini_api_key: "test-key".to_string(),
        gemini_api_base: "http://localhost/unused".to_string(),
        gemini_model: "gemini-test".to_string(),
        jwt_secret: "integration-secret".to_string(),
        jwt_algorithm: Algorithm::HS256,
        access_token_expire_minutes: 30,
        google_client_id: "client-1".to_string(),
        story_cache_policy: policy,
        words_per_batch: 2,
        translation_language: "Persian".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryStore>,
    pub llm: Arc<ScriptedGenerator>,
}

impl TestApp {
    pub fn new(llm: ScriptedGenerator) -> Self {
        Self::with_policy(llm, StoryCachePolicy::CacheFirst)
    }

    pub fn with_policy(llm: ScriptedGenerator, policy: StoryCachePolicy) -> Self {
        let db = Arc::new(InMemoryStore::new());
        let llm = Arc::new(llm);
        let state = AppState::new(
            Arc::new(test_config(policy)),
            db.clone(),
            llm.clone(),
            Arc::new(StaticIdentityVerifier),
        );
        Self {
            router: build_router(Arc::new(state)),
            db,
            llm,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(json_request(Method::GET, uri, token, None)).await
    }

    /// Registers a password account and returns its access token.
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({ "email": email, "password": PASSWORD, "name": "Test User" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
