//! Analyzer client integration tests using wiremock

use promptveil_core::config::PiiDetectionConfig;
use promptveil_detect::DetectError;
use promptveil_detect::analyzer::{AnalyzerClient, AnalyzerConfig, PiiAnalyzer, RetryPolicy};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, retry: RetryPolicy) -> AnalyzerClient {
    let detection = PiiDetectionConfig {
        presidio_url: server.uri(),
        entities: vec!["PERSON".to_string(), "EMAIL_ADDRESS".to_string()],
        score_threshold: 0.5,
        ..Default::default()
    };
    let mut config = AnalyzerConfig::from_detection_config(&detection);
    config.client_config.retry = retry;
    AnalyzerClient::new(config).expect("client")
}

#[tokio::test]
async fn test_analyze_normalizes_findings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(body_partial_json(json!({
            "text": "Email Dr. Sarah Chen at sarah@hospital.org",
            "language": "en",
            "score_threshold": 0.5,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "entity_type": "PERSON", "start": 6, "end": 20, "score": 0.85 },
            { "entity_type": "EMAIL_ADDRESS", "start": 24, "end": 42, "score": 0.95 },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, RetryPolicy::none());
    let text = "Email Dr. Sarah Chen at sarah@hospital.org";
    let entities = client.analyze(text).await.expect("analyze");

    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].category, "PERSON");
    assert_eq!(&text[entities[0].start..entities[0].end], "Dr. Sarah Chen");
    assert_eq!(entities[1].category, "EMAIL_ADDRESS");
    assert_eq!(&text[entities[1].start..entities[1].end], "sarah@hospital.org");
}

#[tokio::test]
async fn test_analyze_sends_requested_entities() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(body_partial_json(json!({
            "entities": ["PERSON", "EMAIL_ADDRESS"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, RetryPolicy::none());
    let entities = client.analyze("nothing here").await.expect("analyze");
    assert!(entities.is_empty());
}

#[tokio::test]
async fn test_non_2xx_is_unavailable_not_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(503).set_body_string("analyzer down"))
        .mount(&server)
        .await;

    let client = client_for(&server, RetryPolicy::none());
    let err = client.analyze("some text").await.expect_err("should fail");

    match err {
        DetectError::Status { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "analyzer down");
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let client = client_for(&server, RetryPolicy::none());
    let err = client.analyze("some text").await.expect_err("should fail");
    assert!(matches!(err, DetectError::Malformed(_)));
}

#[tokio::test]
async fn test_schema_invalid_body_is_malformed() {
    let server = MockServer::start().await;

    // An object where an array of findings is expected
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server, RetryPolicy::none());
    let err = client.analyze("some text").await.expect_err("should fail");
    assert!(matches!(err, DetectError::Malformed(_)));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "entity_type": "PERSON", "start": 0, "end": 4, "score": 0.9 },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        RetryPolicy { budget: 2, base_delay: Duration::from_millis(10) },
    );
    let entities = client.analyze("John").await.expect("retried call");
    assert_eq!(entities.len(), 1);
}

#[tokio::test]
async fn test_malformed_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_string("garbage"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        RetryPolicy { budget: 3, base_delay: Duration::from_millis(10) },
    );
    let err = client.analyze("some text").await.expect_err("should fail");
    assert!(matches!(err, DetectError::Malformed(_)));
}
