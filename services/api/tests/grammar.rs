mod common;

use axum::http::StatusCode;
use common::{happy_generator, TestApp};
use serde_json::json;
use story_tutor_core::testing::ScriptedGenerator;

#[tokio::test]
async fn hint_uses_the_requested_level() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;

    let (status, body) = app
        .post("/grammar/hint/", Some(&token), json!({ "level": "intermediate" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Present perfect");
    // The model echoed "advanced"; the request wins.
    assert_eq!(body["level"], "intermediate");
    assert_eq!(body["examples"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn hint_defaults_to_the_users_level() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;

    let (status, body) = app.post("/grammar/hint/", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], "beginner");
}

#[tokio::test]
async fn malformed_hint_is_a_bad_gateway() {
    let app = TestApp::new(ScriptedGenerator::new(|_| {
        Ok(r#"{"title": "Articles", "explanation": "a/an/the", "examples": ["one"]}"#.to_string())
    }));
    let token = app.register("ana@example.com").await;

    let (status, body) = app.post("/grammar/hint/", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["detail"],
        "The content generator returned an unusable response"
    );
}
