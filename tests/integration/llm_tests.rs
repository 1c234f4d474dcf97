//! OpenAI-compatible client against a mock endpoint

use finsight_crawl::llm::{infer_css_schema, LlmError, OpenAiClient, TextGenerator};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(
        &format!("{}/v1", server.uri()),
        "gpt-4o-mini",
        "test-key",
        Duration::from_secs(5),
    )
    .expect("client builds")
    .with_retry(3, Duration::from_millis(10), Duration::from_millis(50))
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("test-key"))
        .respond_with(completion("2025-04-18"))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server)
        .generate_response("Return a date", "last Friday")
        .await
        .unwrap();
    assert_eq!(reply, "2025-04-18");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_response("system", "user")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_attempts_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_response("system", "user")
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_schema_inference_over_the_wire() {
    let server = MockServer::start().await;
    let schema = r#"```json
{"name": "Story", "baseSelector": "article", "fields": [
  {"name": "title", "selector": "h1", "type": "text"},
  {"name": "date", "selector": "time", "type": "attribute", "attribute": "datetime"}
]}
```"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(schema))
        .mount(&server)
        .await;

    let inferred = infer_css_schema(
        &client(&server),
        "<article><h1>Stocks</h1><time datetime=\"2025-04-19T13:30:00Z\"></time></article>",
        "headline and publication date",
    )
    .await
    .unwrap();

    assert_eq!(inferred.base_selector, "article");
    assert_eq!(inferred.fields.len(), 2);
    assert_eq!(inferred.fields[1].attribute.as_deref(), Some("datetime"));
}
