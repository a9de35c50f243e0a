//! Integration tests against a mock HTTP server, covering the seed scenarios
//! from §8: static success and 429-throttling-then-success.

use loadbench_client::{ClientConfig, StreamingClient};
use loadbench_core::{Content, Message, TokenCounter, TokenCounts};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoopTokenCounter;

impl TokenCounter for NoopTokenCounter {
    fn count(&self, _messages: &[Message]) -> TokenCounts {
        (0, 0)
    }
}

fn user_messages() -> Vec<Message> {
    vec![Message {
        role: "user".to_string(),
        content: Content::Text("hello".to_string()),
    }]
}

fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(chunk);
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn config_for(server: &MockServer, backoff_enabled: bool) -> ClientConfig {
    ClientConfig {
        endpoint: format!("{}/chat/completions", server.uri()),
        api_key: "test-key".to_string(),
        openai_compatible: false,
        user_agent: "loadbench-test/0.1".to_string(),
        prevent_server_caching: false,
        backoff_enabled,
        max_tokens: None,
        completions: None,
        frequency_penalty: None,
        presence_penalty: None,
        temperature: None,
        top_p: None,
        model: None,
    }
}

#[tokio::test]
async fn static_success_collects_three_content_events() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
        r#"{"choices":[{"delta":{"content":"lo"}}]}"#,
        r#"{"choices":[{"delta":{"content":"!"}}]}"#,
    ]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, "text/event-stream")
                .insert_header("azure-openai-deployment-utilization", "12.5%"),
        )
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let client = StreamingClient::new(http, config_for(&server, false));
    let stats = client.call(user_messages(), &NoopTokenCounter).await;

    assert_eq!(stats.response_status_code, 200);
    assert_eq!(stats.calls, 1);
    assert_eq!(stats.generated_tokens, Some(3));
    assert_eq!(stats.deployment_utilization, Some(12.5));
    assert!(stats.first_token_time.unwrap() >= stats.request_start_time.unwrap());
    assert!(stats.response_end_time.unwrap() >= stats.first_token_time.unwrap());
    assert_eq!(stats.output_content.len(), 1);
    assert_eq!(stats.output_content[0]["content"], "Hello!");
}

#[tokio::test]
async fn throttling_retries_with_retry_after_ms_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("retry-after-ms", "200"),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;

    let body = sse_body(&[r#"{"choices":[{"delta":{"role":"assistant","content":"ok"}}]}"#]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let client = StreamingClient::new(http, config_for(&server, true));

    let start = std::time::Instant::now();
    let stats = client.call(user_messages(), &NoopTokenCounter).await;
    let elapsed = start.elapsed();

    assert_eq!(stats.response_status_code, 200);
    assert_eq!(stats.calls, 3);
    assert!(elapsed.as_millis() >= 400);
}

#[tokio::test]
async fn non_200_non_429_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let client = StreamingClient::new(http, config_for(&server, true));
    let stats = client.call(user_messages(), &NoopTokenCounter).await;

    assert_eq!(stats.response_status_code, 500);
    assert!(stats.last_exception.is_some());
    assert!(stats.response_end_time.is_some());
    assert_eq!(stats.calls, 1);
}

#[tokio::test]
async fn dns_failure_is_terminal_with_last_exception() {
    let config = ClientConfig {
        endpoint: "http://loadbench-nonexistent-host.invalid/chat/completions".to_string(),
        api_key: "test-key".to_string(),
        openai_compatible: false,
        user_agent: "loadbench-test/0.1".to_string(),
        prevent_server_caching: false,
        backoff_enabled: true,
        max_tokens: None,
        completions: None,
        frequency_penalty: None,
        presence_penalty: None,
        temperature: None,
        top_p: None,
        model: None,
    };
    let http = reqwest::Client::new();
    let client = StreamingClient::new(http, config);
    let stats = client.call(user_messages(), &NoopTokenCounter).await;

    assert!(stats.last_exception.is_some());
    assert!(stats.response_end_time.is_some());
}
