//! `StreamingClient`: issues one chat-completion call in SSE mode, decomposes
//! its timing into first-token/inter-token/end-to-end latency, and folds a
//! hybrid retry policy (server-directed `retry-after-ms` plus capped
//! exponential backoff) into a single `RequestStats` record.
//!
//! `call()` never returns an `Err` — every outcome, including transport and
//! HTTP failures, is captured into the returned record (§7's propagation
//! policy), so the aggregator sees every attempt.

use crate::backoff::{ExponentialBackoff, MAX_RETRY_SECONDS};
use crate::error::is_connection_class;
use crate::request::ClientConfig;
use crate::retry_after::{parse_retry_after_ms, parse_utilization, RETRY_AFTER_MS_HEADER, UTILIZATION_HEADER};
use futures::StreamExt;
use loadbench_core::{now, Message, RequestStats, TokenCounter};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct StreamingClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl StreamingClient {
    pub fn new(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        if let Ok(ua) = reqwest::header::HeaderValue::from_str(&self.config.user_agent) {
            headers.insert(reqwest::header::USER_AGENT, ua);
        }
        if let Ok(key) = reqwest::header::HeaderValue::from_str(&self.config.api_key) {
            headers.insert("api-key", key.clone());
            if self.config.openai_compatible {
                if let Ok(bearer) =
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                {
                    headers.insert(reqwest::header::AUTHORIZATION, bearer);
                }
            }
        }
        headers
    }

    /// Issue one call. `messages` is the caller-supplied conversation before
    /// any anti-cache mutation; `token_counter` is used to account the
    /// post-prefix input.
    pub async fn call(&self, mut messages: Vec<Message>, token_counter: &dyn TokenCounter) -> RequestStats {
        let mut stats = RequestStats::new();

        if self.config.prevent_server_caching {
            apply_anti_cache_prefix(&mut messages);
        }

        let (text_tokens, image_tokens) = token_counter.count(&messages);
        stats.context_text_tokens = text_tokens;
        stats.context_image_tokens = image_tokens;
        stats.input_messages = serde_json::to_value(&messages).ok();

        let body = self.config.build_request(messages);
        let headers = self.build_headers();

        let mut backoff = ExponentialBackoff::new();

        'outer: loop {
            'inner: loop {
                if stats.request_start_time.is_none() {
                    stats.request_start_time = Some(now());
                }
                stats.calls += 1;

                let response = match self
                    .http
                    .post(&self.config.endpoint)
                    .headers(headers.clone())
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(error = %e, "transport error on streaming call");
                        stats.last_exception = Some(e.to_string());
                        if is_connection_class(&e) || !self.config.backoff_enabled {
                            stats.response_end_time = Some(now());
                            return stats;
                        }
                        break 'inner;
                    }
                };

                stats.response_status_code = response.status().as_u16();
                if let Some(util) = response
                    .headers()
                    .get(UTILIZATION_HEADER)
                    .and_then(|v| v.to_str().ok())
                {
                    stats.deployment_utilization = parse_utilization(util);
                }

                if stats.response_status_code == 429 {
                    let retry_after_ms = response
                        .headers()
                        .get(RETRY_AFTER_MS_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after_ms);

                    if self.config.backoff_enabled {
                        if let Some(ms) = retry_after_ms {
                            if backoff.elapsed_secs() >= MAX_RETRY_SECONDS {
                                stats.last_exception = Some("throttled (429): retry budget exhausted".to_string());
                                stats.response_end_time = Some(now());
                                return stats;
                            }
                            debug!(retry_after_ms = ms, "throttled, sleeping before retry");
                            tokio::time::sleep(Duration::from_millis(ms)).await;
                            continue 'inner;
                        }
                    }
                    stats.last_exception = Some("throttled (429)".to_string());
                    if !self.config.backoff_enabled {
                        stats.response_end_time = Some(now());
                        return stats;
                    }
                    break 'inner;
                }

                if stats.response_status_code != 200 {
                    let body_text = response.text().await.unwrap_or_default();
                    warn!(
                        status = stats.response_status_code,
                        body = %body_text,
                        "call failed"
                    );
                    stats.last_exception = Some(format!(
                        "http {}: {}",
                        stats.response_status_code, body_text
                    ));
                    stats.response_end_time = Some(now());
                    return stats;
                }

                stats.response_time = Some(now());
                read_stream(response, &mut stats).await;
                return stats;
            }

            // Reached only via `break 'inner`: a transient transport error,
            // or a 429 with no usable retry-after-ms, both eligible for the
            // outer exponential-backoff wrapper when enabled.
            if !self.config.backoff_enabled || backoff.budget_exhausted() {
                stats.response_end_time.get_or_insert_with(now);
                return stats;
            }
            let delay = backoff.next_delay();
            tokio::time::sleep(delay).await;
            if backoff.budget_exhausted() {
                stats.response_end_time.get_or_insert_with(now);
                return stats;
            }
            continue 'outer;
        }
    }
}

/// Prepend `ts=<timestamp> rand=<random>\n` to the content of every user
/// message, per §4.3's anti-cache mutation.
fn apply_anti_cache_prefix(messages: &mut [Message]) {
    use rand::Rng;
    let mut rng = rand::rng();
    for message in messages.iter_mut() {
        if message.role != "user" {
            continue;
        }
        let prefix = format!("ts={} rand={}\n", now(), rng.random::<f64>());
        message.content.prepend(&prefix);
    }
}

/// Parse the SSE body line-by-line (via `eventsource-stream`), accumulating
/// streamed content into `stats.output_content` and stamping first-token and
/// end-of-stream timestamps.
async fn read_stream(response: reqwest::Response, stats: &mut RequestStats) {
    let byte_stream = response.bytes_stream();
    let mut event_stream = eventsource_stream::EventStream::new(byte_stream);

    while let Some(event) = event_stream.next().await {
        let event = match event {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "malformed SSE line, skipping");
                continue;
            }
        };

        if stats.first_token_time.is_none() {
            stats.first_token_time = Some(now());
            stats.generated_tokens = Some(0);
        }

        if event.data == "[DONE]" {
            break;
        }

        let parsed: Value = match serde_json::from_str(&event.data) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, data = %event.data, "failed to parse stream chunk, skipping");
                continue;
            }
        };

        let Some(delta) = parsed
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
        else {
            debug!(chunk = %parsed, "stream chunk missing choices[0].delta, skipping");
            continue;
        };

        if let Some(role) = delta.get("role").and_then(|r| r.as_str()) {
            stats.output_content.push(serde_json::json!({
                "role": role,
                "content": "",
            }));
        }

        if let Some(content) = delta.get("content").and_then(|c| c.as_str()) {
            if !content.is_empty() {
                if stats.output_content.is_empty() {
                    stats.output_content.push(serde_json::json!({
                        "role": "assistant",
                        "content": "",
                    }));
                }
                let last = stats.output_content.last_mut().expect("just ensured non-empty");
                if let Some(existing) = last.get("content").and_then(|c| c.as_str()) {
                    let appended = format!("{existing}{content}");
                    last["content"] = Value::String(appended);
                }
                stats.generated_tokens = Some(stats.generated_tokens.unwrap_or(0) + 1);
            }
        }
    }

    stats.response_end_time = Some(now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadbench_core::Content;

    #[test]
    fn anti_cache_prefix_applies_only_to_user_messages() {
        let mut messages = vec![
            Message {
                role: "system".to_string(),
                content: Content::Text("be nice".to_string()),
            },
            Message {
                role: "user".to_string(),
                content: Content::Text("hello".to_string()),
            },
        ];
        apply_anti_cache_prefix(&mut messages);
        assert_eq!(messages[0].content, Content::Text("be nice".to_string()));
        match &messages[1].content {
            Content::Text(s) => assert!(s.starts_with("ts=") && s.ends_with("hello")),
            _ => panic!("expected text content"),
        }
    }

    #[test]
    fn anti_cache_prefixes_differ_between_calls() {
        let mut a = vec![Message {
            role: "user".to_string(),
            content: Content::Text("hi".to_string()),
        }];
        let mut b = a.clone();
        apply_anti_cache_prefix(&mut a);
        // Ensure a tiny bit of wall-clock separation so `now()` differs even
        // on very fast hardware.
        std::thread::sleep(Duration::from_millis(2));
        apply_anti_cache_prefix(&mut b);
        assert_ne!(a[0].content, b[0].content);
    }
}
