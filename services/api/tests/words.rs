mod common;

use axum::http::StatusCode;
use common::{happy_generator, TestApp};
use serde_json::json;
use story_tutor_core::testing::ScriptedGenerator;

#[tokio::test]
async fn daily_words_are_generated_once_per_day() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;

    let (status, first) = app.get("/daily-words/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let words = first.as_array().unwrap();
    assert_eq!(words.len(), 2);
    assert_eq!(words[0]["word"], "brave");
    assert_eq!(words[0]["meaning"], "شجاع");

    let (_, second) = app.get("/daily-words/", Some(&token)).await;
    assert_eq!(first, second);
    assert_eq!(app.llm.calls(), 1);
}

#[tokio::test]
async fn concurrent_daily_requests_share_one_batch() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;

    let (a, b) = tokio::join!(
        app.get("/daily-words/", Some(&token)),
        app.get("/daily-words/", Some(&token)),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(a.1, b.1);
}

#[tokio::test]
async fn each_user_gets_their_own_batch() {
    let app = TestApp::new(happy_generator());
    let ana = app.register("ana@example.com").await;
    let ben = app.register("ben@example.com").await;

    let (_, ana_words) = app.get("/daily-words/", Some(&ana)).await;
    let (_, ben_words) = app.get("/daily-words/", Some(&ben)).await;
    assert_ne!(ana_words[0]["id"], ben_words[0]["id"]);
    assert_eq!(app.llm.calls(), 2);
}

#[tokio::test]
async fn unusable_words_fail_loudly() {
    let app = TestApp::new(ScriptedGenerator::new(|_| Ok("Here are some words!".to_string())));
    let token = app.register("ana@example.com").await;

    let (status, _) = app.get("/daily-words/", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn words_can_be_added_by_hand() {
    let app = TestApp::new(ScriptedGenerator::failing("unused"));
    let token = app.register("ana@example.com").await;

    let (status, body) = app
        .post(
            "/words/",
            Some(&token),
            json!({ "word": " serene ", "meaning": "آرام", "synonyms": ["calm", " "] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["word"], "serene");
    assert_eq!(body["synonyms"], json!(["calm"]));

    let (status, _) = app
        .post("/words/", Some(&token), json!({ "word": "", "meaning": "x" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn manual_words_do_not_block_the_daily_batch() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;
    app.post("/words/", Some(&token), json!({ "word": "serene", "meaning": "آرام" }))
        .await;

    let (_, daily) = app.get("/daily-words/", Some(&token)).await;
    assert_eq!(daily.as_array().unwrap().len(), 2);
    assert_eq!(app.llm.calls(), 1);
}

#[tokio::test]
async fn extra_words_can_be_generated_within_bounds() {
    let app = TestApp::new(happy_generator());
    let token = app.register("ana@example.com").await;

    let (status, body) = app
        .post("/words/generate?level=advanced&count=2", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.as_array().unwrap().len(), 2);

    for count in [0, 21] {
        let (status, _) = app
            .post(&format!("/words/generate?count={count}"), Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
