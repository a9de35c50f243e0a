//! Network latency measurement for `--adjust-for-network-latency`.
//!
//! The upstream tool shells out to ICMP ping (`ping3`), which needs
//! raw-socket privileges most sandboxed or containerized runs don't have.
//! This substitutes repeated TCP-connect timing against the endpoint's
//! `host:port` — a privilege-free measurement of one component of the same
//! round-trip budget — keeping the same "up to 5 samples within a 5-second
//! budget, at least 0.5s apart, averaged" shape as the original
//! `measure_avg_ping` (see DESIGN.md).

use std::time::{Duration, Instant};
use tokio::net::TcpStream;

const MAX_SAMPLES: u32 = 5;
const BUDGET: Duration = Duration::from_secs(5);
const MIN_SAMPLE_SPACING: Duration = Duration::from_millis(500);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Average TCP-connect latency to `host:port`, in seconds, over up to
/// `MAX_SAMPLES` attempts within `BUDGET`. Returns `None` if not a single
/// connection attempt succeeded.
pub async fn measure_avg_latency_secs(host: &str, port: u16) -> Option<f64> {
    let mut samples = Vec::new();
    let deadline = Instant::now() + BUDGET;

    while samples.len() < MAX_SAMPLES as usize && Instant::now() < deadline {
        let attempt_start = Instant::now();
        let connect = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)));
        if let Ok(Ok(_stream)) = connect.await {
            samples.push(attempt_start.elapsed());
        }
        let elapsed = attempt_start.elapsed();
        if elapsed < MIN_SAMPLE_SPACING {
            tokio::time::sleep(MIN_SAMPLE_SPACING - elapsed).await;
        }
    }

    if samples.is_empty() {
        return None;
    }
    let total: Duration = samples.iter().sum();
    Some(total.as_secs_f64() / samples.len() as f64)
}
