//! Header parsing helpers for the throttling and utilization signals a
//! provider surfaces on each response.

use tracing::warn;

/// Header carrying the server-directed throttling delay, in milliseconds.
pub const RETRY_AFTER_MS_HEADER: &str = "retry-after-ms";

/// Header carrying deployment-side utilization as a percentage string
/// (e.g. `"42.3%"`).
pub const UTILIZATION_HEADER: &str = "azure-openai-deployment-utilization";

/// Parse the `retry-after-ms` header value. Unlike the generic HTTP
/// `retry-after` header (seconds or an HTTP-date), this one is always a bare
/// number of milliseconds; per §4.3, a value that fails to parse falls back
/// to the outer exponential-backoff policy rather than blocking the retry
/// loop on a malformed header.
pub fn parse_retry_after_ms(header_value: &str) -> Option<u64> {
    match header_value.trim().parse::<f64>() {
        Ok(ms) if ms.is_finite() && ms >= 0.0 => Some(ms.round() as u64),
        _ => {
            warn!(header_value, "unable to parse {RETRY_AFTER_MS_HEADER} header value");
            None
        }
    }
}

/// Parse a `"NN.N%"` utilization header value into a bare percentage float.
/// Malformed values are logged and dropped per §4.3.
pub fn parse_utilization(header_value: &str) -> Option<f64> {
    let trimmed = header_value.trim();
    if trimmed.is_empty() {
        warn!("got empty {UTILIZATION_HEADER} header");
        return None;
    }
    let Some(percent) = trimmed.strip_suffix('%') else {
        warn!(header_value = trimmed, "invalid {UTILIZATION_HEADER} header value");
        return None;
    };
    match percent.parse::<f64>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(
                header_value = trimmed,
                error = %e,
                "unable to parse {UTILIZATION_HEADER} header value"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer_milliseconds() {
        assert_eq!(parse_retry_after_ms("200"), Some(200));
        assert_eq!(parse_retry_after_ms("  1500  "), Some(1500));
    }

    #[test]
    fn parses_fractional_milliseconds() {
        assert_eq!(parse_retry_after_ms("123.6"), Some(124));
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(parse_retry_after_ms(""), None);
        assert_eq!(parse_retry_after_ms("soon"), None);
        assert_eq!(parse_retry_after_ms("-50"), None);
    }

    #[test]
    fn parses_utilization_percent() {
        assert_eq!(parse_utilization("42.3%"), Some(42.3));
        assert_eq!(parse_utilization("0%"), Some(0.0));
        assert_eq!(parse_utilization("100.0%"), Some(100.0));
    }

    #[test]
    fn rejects_malformed_utilization() {
        assert_eq!(parse_utilization(""), None);
        assert_eq!(parse_utilization("abc"), None);
        assert_eq!(parse_utilization("42.3"), None);
    }
}
