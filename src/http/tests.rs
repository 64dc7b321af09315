//! Tests for the HTTP module

use super::*;
use crate::config::QueryOptions;
use crate::engine::{FetchHint, RemoteQueryClient};
use crate::error::Error;
use crate::page::{Page, PageAdapter};
use crate::types::{Cursor, TransactionContext};
use serde_json::json;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(server: &MockServer) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
        .no_rate_limit()
        .build()
}

fn client(server: &MockServer) -> HttpClient {
    HttpClient::with_config(fast_config(server)).unwrap()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("pagestream/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://query.example.com/v1")
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .bearer_token("secret")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url.as_deref(), Some("https://query.example.com/v1"));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(
        config.default_headers.get("Authorization"),
        Some(&"Bearer secret".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .header("X-Request-Id", "abc123")
        .json(json!({"key": "value"}))
        .timeout(Duration::from_secs(10))
        .retries(2);

    assert_eq!(
        config.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert!(config.body.is_some());
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
    assert_eq!(config.max_retries, Some(2));
}

#[test]
fn test_backoff_type_deserialize() {
    let backoff: BackoffType = serde_yaml::from_str("linear").unwrap();
    assert_eq!(backoff, BackoffType::Linear);
    assert_eq!(BackoffType::default(), BackoffType::Exponential);
}

#[test_case(BackoffType::Constant, 3 => Duration::from_millis(100); "constant")]
#[test_case(BackoffType::Linear, 2 => Duration::from_millis(300); "linear")]
#[test_case(BackoffType::Exponential, 3 => Duration::from_millis(800); "exponential")]
#[test_case(BackoffType::Exponential, 20 => Duration::from_secs(1); "capped")]
fn test_calculate_backoff(backoff: BackoffType, attempt: u32) -> Duration {
    let config = HttpClientConfig::builder()
        .backoff(backoff, Duration::from_millis(100), Duration::from_secs(1))
        .build();
    HttpClient::with_config(config)
        .unwrap()
        .calculate_backoff(attempt)
}

// ============================================================================
// Client Tests
// ============================================================================

#[tokio::test]
async fn test_post_json_sends_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("Authorization", "Bearer t0k"))
        .and(body_partial_json(json!({"ping": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pong": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(format!("{}/", server.uri()))
        .bearer_token("t0k")
        .no_rate_limit()
        .build();
    let http = HttpClient::with_config(config).unwrap();

    let reply: serde_json::Value = http.post_json("/echo", &json!({"ping": 1})).await.unwrap();
    assert_eq!(reply, json!({"pong": 1}));
}

#[tokio::test]
async fn test_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let reply: serde_json::Value = client(&server).post_json("flaky", &json!({})).await.unwrap();
    assert_eq!(reply, json!({"ok": true}));
}

#[tokio::test]
async fn test_retries_rate_limited_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let reply: Vec<u8> = client(&server).post_json("busy", &json!({})).await.unwrap();
    assert!(reply.is_empty());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .post_json::<_, serde_json::Value>("bad", &json!({}))
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad query");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .post_json::<_, serde_json::Value>("down", &json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MaxRetriesExceeded { max_retries: 2 }));
}

#[tokio::test]
async fn test_invalid_json_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client(&server)
        .post_json::<_, serde_json::Value>("garbled", &json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::JsonParse(_)));
}

#[tokio::test]
async fn test_invalid_base_url() {
    let config = HttpClientConfig::builder()
        .base_url("not a url")
        .no_rate_limit()
        .build();
    let http = HttpClient::with_config(config).unwrap();

    let err = http
        .post_json::<_, serde_json::Value>("query:run", &json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidUrl(_)));
}

// ============================================================================
// Wire Tests
// ============================================================================

#[test]
fn test_run_query_request_from_options() {
    let options = QueryOptions::new()
        .with_offset(4)
        .with_chunk_size(10)
        .with_prefetch_size(25)
        .with_start_cursor(Cursor::from("s"))
        .with_projection(["name"])
        .with_compiled_query(true);

    let request = RunQueryRequest::new(
        json!({"kind": "Task"}),
        &options,
        &TransactionContext::with_id("tx-9"),
    );

    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({
            "query": {"kind": "Task"},
            "offset": 4,
            "count": 25,
            "start_cursor": Cursor::from("s").to_websafe_string(),
            "projection": ["name"],
            "compile": true,
            "transaction": "tx-9",
        })
    );
}

#[test]
fn test_run_query_count_falls_back_to_chunk_size() {
    let options = QueryOptions::new().with_chunk_size(10);
    let request = RunQueryRequest::new(json!({}), &options, &TransactionContext::none());
    assert_eq!(request.count, Some(10));
    assert_eq!(request.transaction, None);
}

#[test]
fn test_query_batch_to_page_keeps_cursor_mismatch() {
    let batch: QueryBatch = serde_json::from_value(json!({
        "results": [{"id": 1}, {"id": 2}],
        "result_cursors": [Cursor::from("a").to_websafe_string()],
        "more_results": true,
    }))
    .unwrap();

    let page: JsonPage = batch.into();
    assert_eq!(page.entity_count(), 2);
    assert_eq!(page.result_cursors.len(), 1);
    assert!(page.has_more_results());
    assert_eq!(page.end_cursor(), None);
}

// ============================================================================
// Query Client Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_next_without_handle_fails() {
    let server = MockServer::start().await;
    let remote = HttpQueryClient::new(client(&server));
    let template = remote.build_continuation_prototype(&QueryBatch::default(), &QueryOptions::new());
    assert_eq!(template.handle, None);

    let last: JsonPage = Page::new().with_more(true);
    let err = remote
        .fetch_next(&template, &last, FetchHint::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Backend { .. }));
}

#[tokio::test]
async fn test_fetch_next_sends_hints_and_cursor() {
    let server = MockServer::start().await;
    let end = Cursor::from("end-1");
    Mock::given(method("POST"))
        .and(path("/query:next"))
        .and(body_partial_json(json!({
            "handle": "h1",
            "cursor": end.to_websafe_string(),
            "count": 5,
            "offset": 2,
            "compile": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": ["x"],
            "result_cursors": [Cursor::from("x").to_websafe_string()],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = HttpQueryClient::new(client(&server));
    let seed = QueryBatch {
        handle: Some("h1".to_string()),
        ..QueryBatch::default()
    };
    let template =
        remote.build_continuation_prototype(&seed, &QueryOptions::new().with_compiled_query(true));
    let last: JsonPage = Page::new().with_end_cursor(end).with_more(true);

    let batch = remote
        .fetch_next(&template, &last, FetchHint::new(Some(5), Some(2)))
        .await
        .unwrap();

    assert_eq!(batch.results, vec![json!("x")]);
    assert!(!batch.more_results);
}

#[test]
fn test_query_rejects_invalid_options() {
    let http = HttpClient::with_config(HttpClientConfig::builder().no_rate_limit().build()).unwrap();
    let err = HttpQueryClient::new(http)
        .query(json!({}), QueryOptions::new().with_chunk_size(0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}
