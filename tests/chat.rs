use std::time::Duration;

use pretty_assertions::assert_eq;
use ragchat::endpoint::{EndpointSource, LaunchContext, ResolvedEndpoint};
use ragchat::storage::API_BASE_KEY;
use ragchat::{Author, Config, ConversationManager, EntryKind, StorageManager};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_in(dir: &TempDir) -> Config {
    Config {
        ragchat_home: dir.path().to_path_buf(),
        ..Config::default()
    }
}

fn manager_for(dir: &TempDir, endpoint: &str) -> ConversationManager {
    let config = config_in(dir);
    let resolved = ResolvedEndpoint {
        url: endpoint.to_string(),
        source: EndpointSource::QueryParam,
    };
    ConversationManager::with_endpoint(&config, resolved, StorageManager::new(config.storage_path()))
}

/// (author, kind, text) triples for easy comparison
fn transcript(manager: &ConversationManager) -> Vec<(Author, EntryKind, String)> {
    manager
        .entries()
        .iter()
        .map(|e| (e.author, e.kind, e.text.clone()))
        .collect()
}

#[tokio::test]
async fn answer_and_sources_follow_the_question() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "42",
            "sources": [{ "rank": 1, "score": 0.9, "id": "doc1" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_for(&dir, &server.uri());
    manager.set_query_text("  meaning of life?  ");

    assert!(manager.submit().await);

    assert_eq!(
        transcript(&manager),
        vec![
            (Author::User, EntryKind::Message, "meaning of life?".to_string()),
            (Author::Assistant, EntryKind::Message, "42".to_string()),
            (Author::Assistant, EntryKind::Sources, "Sources: #1 (0.9) - doc1".to_string()),
        ]
    );
    assert!(!manager.is_busy());
    assert!(!manager.last_request_failed());
}

#[tokio::test]
async fn no_sources_field_means_no_sources_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "only text" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_for(&dir, &server.uri());
    manager.set_query_text("q");
    manager.submit().await;

    assert_eq!(manager.entries().len(), 2);
    assert_eq!(manager.entries()[1].text, "only text");
    assert!(manager.entries().iter().all(|e| e.kind == EntryKind::Message));
}

#[tokio::test]
async fn missing_answer_shows_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "", "sources": [] })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_for(&dir, &server.uri());
    manager.set_query_text("q");
    manager.submit().await;

    assert_eq!(manager.entries().len(), 2);
    assert_eq!(manager.entries()[1].text, "(no answer)");
}

#[tokio::test]
async fn empty_input_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_for(&dir, &server.uri());

    for blank in ["", "   ", "\t\n"] {
        manager.set_query_text(blank);
        assert!(!manager.submit().await);
        assert!(!manager.spawn_submit());
    }

    assert!(manager.entries().is_empty());
    assert!(!manager.is_busy());
}

#[tokio::test]
async fn detail_of_failed_response_is_shown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "detail": "bad request" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_for(&dir, &server.uri());
    manager.set_query_text("q");
    manager.submit().await;

    let last = manager.entries().last().unwrap();
    assert_eq!(last.author, Author::Assistant);
    assert!(last.text.starts_with("Error: "));
    assert!(last.text.contains("bad request"));
    assert!(manager.last_request_failed());
    assert!(!manager.is_busy());
}

#[tokio::test]
async fn network_failure_is_shown_and_busy_state_clears() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_for(&dir, "http://127.0.0.1:1");
    manager.set_query_text("anyone there?");

    assert!(manager.spawn_submit());
    assert!(manager.is_busy());
    assert!(!manager.submit_enabled());
    // the question is already in the transcript while the request is out
    assert_eq!(manager.entries().len(), 1);

    manager.wait_for_response().await;

    assert!(!manager.is_busy());
    assert!(manager.submit_enabled());
    assert_eq!(manager.entries().len(), 2);
    let last = &manager.entries()[1];
    assert_eq!(last.author, Author::Assistant);
    assert!(last.text.starts_with("Error: "));
    assert!(last.text.len() > "Error: ".len());
}

#[tokio::test]
async fn busy_for_exactly_the_lifetime_of_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "slow" }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_for(&dir, &server.uri());
    assert!(manager.submit_enabled());

    manager.set_query_text("q");
    assert!(manager.spawn_submit());

    // still in flight: polling applies nothing
    manager.process_responses();
    assert!(manager.is_busy());
    assert!(!manager.submit_enabled());
    assert_eq!(manager.entries().len(), 1);

    // typing during the request is allowed, submitting is not
    manager.set_query_text("next");
    assert!(!manager.spawn_submit());
    assert_eq!(manager.query_text(), "next");

    manager.wait_for_response().await;

    assert!(!manager.is_busy());
    assert!(manager.submit_enabled());
    assert_eq!(manager.entries()[1].text, "slow");
}

#[tokio::test]
async fn construction_resolves_from_launch_context() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let launch = LaunchContext::new(None, Some("http://rag.local:8000/app/?api=http://override:1")).unwrap();

    let manager = ConversationManager::new(&config, &launch);

    assert_eq!(manager.resolved_endpoint().url, "http://override:1");
    assert_eq!(manager.endpoint_text(), "http://override:1");
    let storage = StorageManager::new(config.storage_path());
    assert_eq!(
        storage.get_item(API_BASE_KEY).unwrap().as_deref(),
        Some("http://override:1")
    );

    // a later launch without the parameter picks up the saved value
    let plain = LaunchContext::new(None, Some("http://rag.local:8000/app/")).unwrap();
    let manager = ConversationManager::new(&config, &plain);
    assert_eq!(manager.resolved_endpoint().source, EndpointSource::Stored);
}

#[tokio::test]
async fn array_body_shows_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_for(&dir, &server.uri());
    manager.set_query_text("q");
    manager.submit().await;

    assert_eq!(manager.entries().len(), 2);
    assert_eq!(manager.entries()[1].text, "(no answer)");
    assert!(!manager.last_request_failed());
}
