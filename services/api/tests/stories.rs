mod common;

use axum::http::StatusCode;
use common::{happy_generator, TestApp, STORY_JSON};
use serde_json::json;
use story_tutor_core::testing::ScriptedGenerator;
use story_tutor_core::StoryCachePolicy;

#[tokio::test]
async fn first_request_generates_and_second_is_served_from_cache() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;
    let request = json!({ "topic": "space", "level": "beginner" });

    let (status, first) = app.post("/stories/", Some(&token), request.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["title"], "The Red Planet");
    assert_eq!(first["grammar_notes"][0]["concept"], "Past simple");
    let calls_after_first = app.llm.calls();

    let (status, second) = app.post("/stories/", Some(&token), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["id"], second["id"]);
    assert_eq!(app.llm.calls(), calls_after_first);
    assert_eq!(app.db.story_count(), 1);
}

#[tokio::test]
async fn always_generate_policy_skips_the_cache() {
    let app = TestApp::with_policy(happy_generator(), StoryCachePolicy::AlwaysGenerate);
    let token = app.register("ana@example.com").await;
    let request = json!({ "topic": "space", "level": "beginner" });

    let (_, first) = app.post("/stories/", Some(&token), request.clone()).await;
    let (status, second) = app.post("/stories/", Some(&token), request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(first["id"], second["id"]);
    assert_eq!(app.db.story_count(), 2);
}

#[tokio::test]
async fn level_defaults_to_the_users_level() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;

    let (status, body) = app
        .post("/stories/", Some(&token), json!({ "topic": "the sea" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["level"], "beginner");
}

#[tokio::test]
async fn invalid_grammar_notes_still_store_the_story() {
    let app = TestApp::new(ScriptedGenerator::new(|prompt| {
        if prompt.starts_with("Write a short story") {
            Ok(STORY_JSON.to_string())
        } else {
            // One note lacks examples, so the whole batch is dropped.
            Ok(r#"[{"concept": "Plurals", "explanation": "Add s."}]"#.to_string())
        }
    }));
    let token = app.register("ana@example.com").await;

    let (status, body) = app
        .post("/stories/", Some(&token), json!({ "topic": "space", "level": "beginner" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["grammar_notes"], json!([]));
}

#[tokio::test]
async fn marker_format_is_understood() {
    let app = TestApp::new(ScriptedGenerator::new(|prompt| {
        if prompt.starts_with("Write a short story") {
            Ok("**Title:** Lost Kitten\n**Story:** A kitten got lost. Then it found home.".to_string())
        } else {
            Ok("[]".to_string())
        }
    }));
    let token = app.register("ana@example.com").await;

    let (_, body) = app
        .post("/stories/", Some(&token), json!({ "topic": "cats", "level": "beginner" }))
        .await;
    assert_eq!(body["title"], "Lost Kitten");
    assert_eq!(body["content"], "A kitten got lost. Then it found home.");
}

#[tokio::test]
async fn generator_outage_is_a_bad_gateway_and_nothing_is_stored() {
    let app = TestApp::new(ScriptedGenerator::failing("connection refused"));
    let token = app.register("ana@example.com").await;

    let (status, body) = app
        .post("/stories/", Some(&token), json!({ "topic": "space", "level": "beginner" }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"].is_string());
    assert_eq!(app.db.story_count(), 0);
}

#[tokio::test]
async fn persistence_failure_is_an_internal_error() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;
    app.db.fail_writes(true);

    let (status, _) = app
        .post("/stories/", Some(&token), json!({ "topic": "space", "level": "beginner" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    app.db.fail_writes(false);
    assert_eq!(app.db.story_count(), 0);
}

#[tokio::test]
async fn blank_topic_and_unknown_level_are_rejected() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;

    let (status, _) = app
        .post("/stories/", Some(&token), json!({ "topic": "   ", "level": "beginner" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post("/stories/", Some(&token), json!({ "topic": "space", "level": "expert" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.llm.calls(), 0);
}

#[tokio::test]
async fn listing_filters_by_topic_and_level() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;
    for (topic, level) in [("space", "beginner"), ("space", "advanced"), ("ocean", "beginner")] {
        app.post("/stories/", Some(&token), json!({ "topic": topic, "level": level }))
            .await;
    }

    let (status, body) = app
        .get("/stories/?topic=space&level=beginner", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let stories = body.as_array().unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0]["topic"], "space");
    assert_eq!(stories[0]["level"], "beginner");

    let (_, all) = app.get("/stories/", Some(&token)).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}
