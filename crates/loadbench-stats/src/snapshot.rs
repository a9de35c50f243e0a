//! A single periodic (or final) aggregator snapshot, and its two emission
//! formats: one JSON object per line, or a fixed-width human-readable line.

use serde_json::{json, Value};

/// One aggregator snapshot. Every latency/throughput field that can be
/// unavailable (too few samples, empty window) is `None`; both emission
/// formats render that as the literal `"n/a"`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub run_seconds: u64,
    pub timestamp: String,
    pub rpm: Option<f64>,
    pub processing: u64,
    pub completed: u64,
    pub failures: u64,
    pub throttled: u64,
    pub requests: u64,
    pub context_text_tpm: Option<f64>,
    pub context_image_tpm: Option<f64>,
    pub gen_tpm: Option<f64>,
    pub total_tpm: Option<f64>,
    pub e2e_avg: Option<f64>,
    pub e2e_95th: Option<f64>,
    pub ttft_avg: Option<f64>,
    pub ttft_95th: Option<f64>,
    pub tbt_avg: Option<f64>,
    pub tbt_95th: Option<f64>,
    pub context_tpr_avg: Option<i64>,
    pub gen_tpr_10th: Option<i64>,
    pub gen_tpr_avg: Option<i64>,
    pub gen_tpr_90th: Option<i64>,
    pub util_avg: Option<f64>,
    pub util_95th: Option<f64>,
}

fn num_or_na(v: Option<f64>) -> Value {
    match v {
        Some(v) => json!(v),
        None => json!("n/a"),
    }
}

fn int_or_na(v: Option<i64>) -> Value {
    match v {
        Some(v) => json!(v),
        None => json!("n/a"),
    }
}

fn percent_or_na(v: Option<f64>) -> Value {
    match v {
        Some(v) => json!(format!("{:.1}%", v)),
        None => json!("n/a"),
    }
}

fn fmt_na(v: Option<f64>) -> String {
    v.map(|v| format!("{v}")).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_int_na(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_percent_na(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.1}%")).unwrap_or_else(|| "n/a".to_string())
}

impl Snapshot {
    /// Render as the JSON object described in the aggregator's emission
    /// contract, one object per line.
    pub fn to_json(&self) -> Value {
        json!({
            "run_seconds": self.run_seconds,
            "timestamp": self.timestamp,
            "rpm": num_or_na(self.rpm),
            "processing": self.processing,
            "completed": self.completed,
            "failures": self.failures,
            "throttled": self.throttled,
            "requests": self.requests,
            "tpm": {
                "context_text": num_or_na(self.context_text_tpm),
                "context_image": num_or_na(self.context_image_tpm),
                "gen": num_or_na(self.gen_tpm),
                "total": num_or_na(self.total_tpm),
            },
            "e2e": {
                "avg": num_or_na(self.e2e_avg),
                "95th": num_or_na(self.e2e_95th),
            },
            "ttft": {
                "avg": num_or_na(self.ttft_avg),
                "95th": num_or_na(self.ttft_95th),
            },
            "tbt": {
                "avg": num_or_na(self.tbt_avg),
                "95th": num_or_na(self.tbt_95th),
            },
            "context_tpr_avg": int_or_na(self.context_tpr_avg),
            "gen_tpr": {
                "10th": int_or_na(self.gen_tpr_10th),
                "avg": int_or_na(self.gen_tpr_avg),
                "90th": int_or_na(self.gen_tpr_90th),
            },
            "util": {
                "avg": percent_or_na(self.util_avg),
                "95th": percent_or_na(self.util_95th),
            },
        })
    }

    /// Render as a single fixed-field human-readable line.
    pub fn to_human_line(&self) -> String {
        format!(
            "rpm: {:<6} processing: {:<4} completed: {:<5} failures: {:<4} throttled: {:<4} \
             requests: {:<5} tpm: context_text: {:<6} gen: {:<6} total: {:<6} \
             ttft_avg: {:<6} ttft_95th: {:<6} tbt_avg: {:<6} tbt_95th: {:<6} \
             e2e_avg: {:<6} e2e_95th: {:<6} context_tpr_avg: {:<4} \
             gen_tpr_10th: {:<4} gen_tpr_avg: {:<4} gen_tpr_90th: {:<4} \
             util_avg: {:<6} util_95th: {:<6}",
            fmt_na(self.rpm),
            self.processing,
            self.completed,
            self.failures,
            self.throttled,
            self.requests,
            fmt_na(self.context_text_tpm),
            fmt_na(self.gen_tpm),
            fmt_na(self.total_tpm),
            fmt_na(self.ttft_avg),
            fmt_na(self.ttft_95th),
            fmt_na(self.tbt_avg),
            fmt_na(self.tbt_95th),
            fmt_na(self.e2e_avg),
            fmt_na(self.e2e_95th),
            fmt_int_na(self.context_tpr_avg),
            fmt_int_na(self.gen_tpr_10th),
            fmt_int_na(self.gen_tpr_avg),
            fmt_int_na(self.gen_tpr_90th),
            fmt_percent_na(self.util_avg),
            fmt_percent_na(self.util_95th),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            run_seconds: 5,
            timestamp: "2026-07-28 00:00:00".to_string(),
            rpm: None,
            processing: 0,
            completed: 0,
            failures: 0,
            throttled: 0,
            requests: 0,
            context_text_tpm: None,
            context_image_tpm: None,
            gen_tpm: None,
            total_tpm: None,
            e2e_avg: None,
            e2e_95th: None,
            ttft_avg: None,
            ttft_95th: None,
            tbt_avg: None,
            tbt_95th: None,
            context_tpr_avg: None,
            gen_tpr_10th: None,
            gen_tpr_avg: None,
            gen_tpr_90th: None,
            util_avg: None,
            util_95th: None,
        }
    }

    #[test]
    fn missing_samples_render_as_n_a_in_json() {
        let snap = empty_snapshot();
        let v = snap.to_json();
        assert_eq!(v["rpm"], json!("n/a"));
        assert_eq!(v["e2e"]["95th"], json!("n/a"));
        assert_eq!(v["util"]["avg"], json!("n/a"));
    }

    #[test]
    fn missing_samples_render_as_n_a_in_human_line() {
        let snap = empty_snapshot();
        let line = snap.to_human_line();
        assert!(line.contains("rpm: n/a"));
        assert!(line.contains("util_avg: n/a"));
    }

    #[test]
    fn present_utilization_renders_with_percent_suffix() {
        let mut snap = empty_snapshot();
        snap.util_avg = Some(12.5);
        assert_eq!(snap.to_json()["util"]["avg"], json!("12.5%"));
        assert!(snap.to_human_line().contains("util_avg: 12.5%"));
    }
}
