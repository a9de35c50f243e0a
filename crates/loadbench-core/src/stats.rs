//! Per-request statistics collected by the `StreamingClient` and consumed by
//! the `StatsAggregator`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock instant expressed as fractional seconds since the Unix epoch,
/// matching the granularity of the upstream `time.time()` timestamps so the
/// aggregator's windowing arithmetic (seconds-based durations) carries over
/// unchanged.
pub type Timestamp = f64;

pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}

/// Statistics collected for a single chat-completion call, including all
/// retry attempts folded into one record (per `StreamingClient::call`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestStats {
    pub request_start_time: Option<Timestamp>,
    pub response_status_code: u16,
    pub response_time: Option<Timestamp>,
    pub first_token_time: Option<Timestamp>,
    pub response_end_time: Option<Timestamp>,
    pub context_text_tokens: u64,
    pub context_image_tokens: u64,
    pub generated_tokens: Option<u64>,
    pub deployment_utilization: Option<f64>,
    pub calls: u32,
    pub last_exception: Option<String>,
    pub input_messages: Option<Value>,
    pub output_content: Vec<Value>,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize this record for the final raw-records dump. When
    /// `include_request_content` is false, the request/response payloads are
    /// omitted to keep the dump small.
    pub fn as_value(&self, include_request_content: bool) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "request_start_time".to_string(),
            serde_json::json!(self.request_start_time),
        );
        map.insert(
            "response_status_code".to_string(),
            serde_json::json!(self.response_status_code),
        );
        map.insert(
            "response_time".to_string(),
            serde_json::json!(self.response_time),
        );
        map.insert(
            "first_token_time".to_string(),
            serde_json::json!(self.first_token_time),
        );
        map.insert(
            "response_end_time".to_string(),
            serde_json::json!(self.response_end_time),
        );
        map.insert(
            "context_text_tokens".to_string(),
            serde_json::json!(self.context_text_tokens),
        );
        map.insert(
            "context_image_tokens".to_string(),
            serde_json::json!(self.context_image_tokens),
        );
        map.insert(
            "generated_tokens".to_string(),
            serde_json::json!(self.generated_tokens),
        );
        map.insert(
            "deployment_utilization".to_string(),
            serde_json::json!(self.deployment_utilization),
        );
        map.insert("calls".to_string(), serde_json::json!(self.calls));
        if include_request_content {
            map.insert(
                "input_messages".to_string(),
                self.input_messages.clone().unwrap_or(Value::Null),
            );
            map.insert(
                "output_content".to_string(),
                if self.output_content.is_empty() {
                    Value::Null
                } else {
                    serde_json::json!(self.output_content)
                },
            );
        }
        // last_exception is inserted last to keep the dump readable, mirroring
        // the upstream ordering.
        map.insert(
            "last_exception".to_string(),
            serde_json::json!(self.last_exception),
        );
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_has_no_terminal_timestamps() {
        let stats = RequestStats::new();
        assert_eq!(stats.calls, 0);
        assert!(stats.generated_tokens.is_none());
    }

    #[test]
    fn as_value_omits_content_unless_requested() {
        let mut stats = RequestStats::new();
        stats.input_messages = Some(serde_json::json!([{"role": "user", "content": "hi"}]));
        let v = stats.as_value(false);
        assert!(v.get("input_messages").is_none());
        let v = stats.as_value(true);
        assert!(v.get("input_messages").is_some());
    }
}
