//! `loadbench`: a load-generation and performance-measurement harness for
//! chat-completion HTTP endpoints (Azure OpenAI and OpenAI-compatible).
//!
//! ```bash
//! OPENAI_API_KEY=sk-... loadbench https://my-resource.openai.azure.com \
//!   --deployment gpt-4o --clients 20 --requests 200
//! ```

mod config;
mod error;
mod executor;
mod message_source;
mod network_latency;
mod token_counter;

use anyhow::Context;
use clap::Parser;
use config::{Cli, ContextGenerationMethod, OutputFormat, Retry};
use executor::Executor;
use loadbench_client::{ClientConfig, HttpClientConfig, StreamingClient};
use loadbench_core::{NoRateLimiter, RateLimiter, RunEndCondition, TokenCounter};
use loadbench_stats::{Aggregator, AggregatorConfig};
use message_source::{RandomMessageSource, ReplayMessageSource};
use std::sync::Arc;
use token_counter::WordTokenCounter;
use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    cli.validate().map_err(|e| anyhow::anyhow!("{e}"))?;

    let api_key = std::env::var(&cli.api_key_env).with_context(|| {
        format!(
            "API key is not set - make sure to set the environment variable '{}'",
            cli.api_key_env
        )
    })?;

    let is_openai_compatible = cli.openai_compatible
        || cli.api_base_endpoint.contains("openai.com")
        || cli.api_base_endpoint.contains("googleapis.com");

    let endpoint = if is_openai_compatible {
        cli.api_base_endpoint.clone()
    } else {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            cli.api_base_endpoint.trim_end_matches('/'),
            cli.deployment,
            cli.api_version
        )
    };

    // Model detection: the upstream tool fires a one-token preflight request
    // and reads the model name back out of the response. This implementation
    // uses the configured deployment name directly instead (see DESIGN.md);
    // wrong for endpoints that silently redirect to a different underlying
    // model, but avoids spending a real request before the run even starts.
    let model = cli.deployment.clone();
    info!(model, "using deployment as model label");

    let network_latency_adjustment_secs = if cli.adjust_for_network_latency {
        info!("measuring network latency to endpoint...");
        let parsed = Url::parse(&endpoint).context("endpoint is not a valid URL")?;
        let host = parsed
            .host_str()
            .context("endpoint URL has no host")?
            .to_string();
        let port = parsed
            .port_or_known_default()
            .context("endpoint URL has no resolvable port")?;
        let latency = network_latency::measure_avg_latency_secs(&host, port)
            .await
            .unwrap_or(0.0);
        info!(
            latency_ms = (latency * 1000.0) as u64,
            "average network latency measured; subtracting from all aggregate latency metrics"
        );
        latency
    } else {
        0.0
    };

    let token_counter = WordTokenCounter;
    let (context_tokens, max_tokens) = cli.resolved_shape();

    let message_source: Arc<dyn loadbench_core::MessageSource> = match cli.context_generation_method
    {
        ContextGenerationMethod::Generate => {
            info!(
                context_tokens,
                max_tokens = max_tokens.unwrap_or(0),
                "generating random filler messages"
            );
            Arc::new(RandomMessageSource::new(context_tokens, max_tokens, &token_counter))
        }
        ContextGenerationMethod::Replay => {
            let path = cli
                .replay_path
                .as_deref()
                .context("replay-path is required when context-generation-method=replay")?;
            info!(path, "replaying messages from file");
            Arc::new(
                ReplayMessageSource::load(path, &token_counter)
                    .map_err(|e| anyhow::anyhow!("{e}"))?,
            )
        }
    };

    match cli.run_end_condition_mode {
        config::RunEndConditionModeArg::And => info!(
            "run-end-condition-mode='and': run will not end until BOTH the requests and duration limits are reached"
        ),
        config::RunEndConditionModeArg::Or => info!(
            "run-end-condition-mode='or': run will end when EITHER the requests or duration limit is reached"
        ),
    }

    let rate_limiter: Arc<dyn RateLimiter> = match cli.rate {
        Some(rate) if rate > 0.0 => Arc::new(loadbench_core::TokenBucket::with_rpm(rate)),
        _ => Arc::new(NoRateLimiter),
    };

    let client_config = ClientConfig {
        endpoint,
        api_key,
        openai_compatible: is_openai_compatible,
        user_agent: format!("loadbench/{}", env!("CARGO_PKG_VERSION")),
        prevent_server_caching: cli.prevent_server_caching,
        backoff_enabled: cli.retry == Retry::Exponential,
        max_tokens,
        completions: Some(cli.completions),
        frequency_penalty: cli.frequency_penalty,
        presence_penalty: cli.presence_penalty,
        temperature: cli.temperature,
        top_p: cli.top_p,
        model: is_openai_compatible.then(|| model.clone()),
    };

    let http = loadbench_client::build_client(&HttpClientConfig {
        user_agent: client_config.user_agent.clone(),
        ..HttpClientConfig::default()
    })?;
    let streaming_client = Arc::new(StreamingClient::new(http, client_config));

    let aggregator = Aggregator::new(AggregatorConfig {
        clients: cli.clients as u64,
        dump_duration_secs: 1.0,
        window_duration_secs: cli.aggregation_window,
        expected_gen_tokens: max_tokens,
        json_output: cli.output_format == OutputFormat::Jsonl,
        log_request_content: cli.log_request_content,
        network_latency_adjustment_secs,
    });
    aggregator.start().await;

    let run_end = RunEndCondition::new(
        cli.run_end_condition_mode.into(),
        cli.requests,
        cli.duration.filter(|d| *d > 0).map(|d| d as f64),
    );
    let executor = Executor::new(rate_limiter.clone(), cli.clients as usize, run_end);

    let cancel = Arc::new(Notify::new());
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_for_signal.notify_waiters();
    });

    info!("starting load...");
    let aggregator_for_worker = aggregator.clone();
    let completed = executor
        .run(
            move || {
                let aggregator = aggregator_for_worker.clone();
                let message_source = message_source.clone();
                let streaming_client = streaming_client.clone();
                async move {
                    aggregator.record_new_request().await;
                    // The message source's counts are pre-anti-cache-prefix; the
                    // client recomputes context tokens itself over the post-prefix
                    // messages (§4.3 step 3), so its count is the one kept.
                    let (messages, _) = match message_source.next() {
                        Ok(body) => body,
                        Err(e) => {
                            tracing::error!(error = %e, "message source failed to produce a request body");
                            return;
                        }
                    };
                    let stats = streaming_client.call(messages, &WordTokenCounter).await;
                    aggregator.aggregate_request(&stats).await;
                }
            },
            cancel,
        )
        .await;

    aggregator.stop().await;
    aggregator.dump_raw_call_stats().await;

    info!(completed, "finished load test");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wait for SIGINT (Ctrl-C), and on unix also SIGTERM, so an operator can
/// stop a long-running load test early and still receive a final aggregator
/// snapshot and raw-record dump.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
