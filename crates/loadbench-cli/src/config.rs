//! The `load` command's flag surface and validation rules.
//!
//! Mirrors the upstream tool's argument parser and `_validate()` function
//! flag for flag, including the validated ranges for the pass-through
//! sampling parameters; `--api-key-env` is resolved via `std::env::var` at
//! wiring time rather than clap's own `env` attribute, since the flag names
//! the *variable*, not the value.

use crate::error::{Error, Result};
use clap::{Parser, ValueEnum};
use loadbench_core::RunEndMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum RunEndConditionModeArg {
    And,
    Or,
}

impl From<RunEndConditionModeArg> for RunEndMode {
    fn from(value: RunEndConditionModeArg) -> Self {
        match value {
            RunEndConditionModeArg::And => RunEndMode::And,
            RunEndConditionModeArg::Or => RunEndMode::Or,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum ContextGenerationMethod {
    Generate,
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum ShapeProfile {
    Balanced,
    Context,
    Generation,
    Custom,
}

impl ShapeProfile {
    /// `(context_tokens, max_tokens)` preset for this profile, or `None` for
    /// `custom`, which uses the explicit `--context-tokens`/`--max-tokens`
    /// flags instead.
    pub fn preset(self) -> Option<(u64, u64)> {
        match self {
            ShapeProfile::Balanced => Some((500, 500)),
            ShapeProfile::Context => Some((2000, 200)),
            ShapeProfile::Generation => Some((500, 1000)),
            ShapeProfile::Custom => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum Retry {
    None,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum OutputFormat {
    Jsonl,
    Human,
}

/// Generate load against a chat-completion endpoint and report streaming
/// latency/throughput statistics.
#[derive(Debug, Parser)]
#[command(name = "loadbench", version, about)]
pub struct Cli {
    /// Base URL of the deployment or OpenAI-compatible endpoint.
    pub api_base_endpoint: String,

    /// Deployment or model name.
    #[arg(long)]
    pub deployment: String,

    /// Query-string API version (Azure-style endpoints).
    #[arg(long, default_value = "2023-05-15")]
    pub api_version: String,

    /// Name of the environment variable holding the API key.
    #[arg(long, default_value = "OPENAI_API_KEY")]
    pub api_key_env: String,

    /// Max concurrency.
    #[arg(long, default_value_t = 20)]
    pub clients: u32,

    /// Stop after this many completed requests.
    #[arg(long)]
    pub requests: Option<u64>,

    /// Stop after this many seconds (must be 0, or >= 30).
    #[arg(long)]
    pub duration: Option<u64>,

    /// Composite stop policy when both `--requests` and `--duration` are set.
    #[arg(long, value_enum, default_value_t = RunEndConditionModeArg::Or)]
    pub run_end_condition_mode: RunEndConditionModeArg,

    /// Requests-per-minute cap; enables the token-bucket rate limiter when
    /// set and greater than zero.
    #[arg(long)]
    pub rate: Option<f64>,

    /// Sliding aggregation-window size, in seconds.
    #[arg(long, default_value_t = 60.0)]
    pub aggregation_window: f64,

    /// Which `MessageSource` to construct.
    #[arg(long, value_enum, default_value_t = ContextGenerationMethod::Generate)]
    pub context_generation_method: ContextGenerationMethod,

    /// Path to a JSON array of message-lists; required with `--context-generation-method=replay`.
    #[arg(long)]
    pub replay_path: Option<String>,

    /// Preset `(context_tokens, max_tokens)` shape; `custom` uses the explicit flags below.
    #[arg(long, value_enum, default_value_t = ShapeProfile::Balanced)]
    pub shape_profile: ShapeProfile,

    /// Context token target; only used with `--shape-profile=custom`.
    #[arg(long)]
    pub context_tokens: Option<u64>,

    /// `max_tokens` forwarded on the request body.
    #[arg(long)]
    pub max_tokens: Option<u64>,

    /// Prepend an anti-cache prefix to every user message.
    #[arg(long, default_value_t = true)]
    pub prevent_server_caching: bool,

    /// Response `n` (number of completions).
    #[arg(long, default_value_t = 1)]
    pub completions: u32,

    /// Retry policy for the streaming client.
    #[arg(long, value_enum, default_value_t = Retry::None)]
    pub retry: Retry,

    #[arg(long)]
    pub frequency_penalty: Option<f64>,

    #[arg(long)]
    pub presence_penalty: Option<f64>,

    #[arg(long)]
    pub temperature: Option<f64>,

    /// Forwarded unchecked, matching the upstream tool, which validates the
    /// other three sampling parameters but not this one.
    #[arg(long)]
    pub top_p: Option<f64>,

    /// Auth mode: Azure-style `api-key` header (default) or OpenAI-style
    /// bearer token.
    #[arg(long, default_value_t = false)]
    pub openai_compatible: bool,

    /// Measure round-trip latency to the endpoint once and subtract it from
    /// every reported latency metric.
    #[arg(long, default_value_t = false)]
    pub adjust_for_network_latency: bool,

    /// Aggregator emission format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Include request/response payloads in the final raw-records dump.
    #[arg(long, default_value_t = false)]
    pub log_request_content: bool,
}

impl Cli {
    /// Validate flag combinations that clap's own type system can't express,
    /// matching the upstream tool's `_validate()` checks.
    pub fn validate(&self) -> Result<()> {
        if self.clients < 1 {
            return Err(Error::Validation("clients must be > 0".to_string()));
        }
        if let Some(d) = self.duration {
            if d != 0 && d < 30 {
                return Err(Error::Validation("duration must be > 30".to_string()));
            }
        }
        if let Some(r) = self.rate {
            if r < 0.0 {
                return Err(Error::Validation("rate must be > 0".to_string()));
            }
        }
        if self.context_generation_method == ContextGenerationMethod::Replay
            && self.replay_path.is_none()
        {
            return Err(Error::Validation(
                "replay-path is required when context-generation-method=replay".to_string(),
            ));
        }
        if self.context_generation_method == ContextGenerationMethod::Generate
            && self.shape_profile == ShapeProfile::Custom
        {
            match self.context_tokens {
                Some(t) if t >= 1 => {}
                _ => {
                    return Err(Error::Validation(
                        "context-tokens must be specified with shape=custom".to_string(),
                    ))
                }
            }
        }
        if self.completions < 1 {
            return Err(Error::Validation("completions must be > 0".to_string()));
        }
        if let Some(fp) = self.frequency_penalty {
            if !(-2.0..=2.0).contains(&fp) {
                return Err(Error::Validation(
                    "frequency-penalty must be between -2.0 and 2.0".to_string(),
                ));
            }
        }
        if let Some(pp) = self.presence_penalty {
            if !(-2.0..=2.0).contains(&pp) {
                return Err(Error::Validation(
                    "presence-penalty must be between -2.0 and 2.0".to_string(),
                ));
            }
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::Validation(
                    "temperature must be between 0 and 2.0".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve the `(context_tokens, max_tokens)` shape to actually build,
    /// applying the shape-profile preset unless `custom`.
    pub fn resolved_shape(&self) -> (u64, Option<u64>) {
        match self.shape_profile.preset() {
            Some((context_tokens, max_tokens)) => (context_tokens, Some(max_tokens)),
            None => (self.context_tokens.unwrap_or(0), self.max_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            api_base_endpoint: "https://example.openai.azure.com".to_string(),
            deployment: "gpt-4o".to_string(),
            api_version: "2023-05-15".to_string(),
            api_key_env: "TEST_KEY".to_string(),
            clients: 20,
            requests: Some(10),
            duration: None,
            run_end_condition_mode: RunEndConditionModeArg::Or,
            rate: None,
            aggregation_window: 60.0,
            context_generation_method: ContextGenerationMethod::Generate,
            replay_path: None,
            shape_profile: ShapeProfile::Balanced,
            context_tokens: None,
            max_tokens: None,
            prevent_server_caching: true,
            completions: 1,
            retry: Retry::None,
            frequency_penalty: None,
            presence_penalty: None,
            temperature: None,
            top_p: None,
            openai_compatible: false,
            adjust_for_network_latency: false,
            output_format: OutputFormat::Human,
            log_request_content: false,
        }
    }

    #[test]
    fn rejects_short_duration() {
        let mut cli = base_cli();
        cli.duration = Some(10);
        assert!(cli.validate().is_err());
        cli.duration = Some(0);
        assert!(cli.validate().is_ok());
        cli.duration = Some(30);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn replay_requires_path() {
        let mut cli = base_cli();
        cli.context_generation_method = ContextGenerationMethod::Replay;
        assert!(cli.validate().is_err());
        cli.replay_path = Some("messages.json".to_string());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn custom_shape_requires_context_tokens() {
        let mut cli = base_cli();
        cli.shape_profile = ShapeProfile::Custom;
        assert!(cli.validate().is_err());
        cli.context_tokens = Some(1000);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_penalties() {
        let mut cli = base_cli();
        cli.frequency_penalty = Some(3.0);
        assert!(cli.validate().is_err());
        cli.frequency_penalty = Some(-2.0);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn top_p_is_never_validated() {
        let mut cli = base_cli();
        cli.top_p = Some(99.0);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn shape_presets_override_custom_flags() {
        let cli = base_cli();
        assert_eq!(cli.resolved_shape(), (500, Some(500)));
    }
}
