//! Best-effort connectivity probe of the remote query function.
//!
//! Advisory only: the service retries this connection at its own runtime,
//! so setup never blocks on it. The probe runs only when both the function
//! URL and its access key are configured; an absent integration is not an
//! error at setup time.

use std::time::Duration;

use tracing::{info, warn};

use crate::env::EnvSnapshot;

/// Endpoint and key read from the snapshot.
pub const FUNCTION_URL_VAR: &str = "AZURE_FUNCTION_URL";
pub const FUNCTION_KEY_VAR: &str = "AZURE_FUNCTION_KEY";

/// Header carrying the function access key.
const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Bounded timeout for the single probe request.
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// The status that counts as reachable.
pub const PROBE_EXPECTED_STATUS: u16 = 200;

/// Outcome of the probe. Only [`ProbeOutcome::Unreachable`] produces a
/// warning; nothing here is ever fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Endpoint or key not configured; probe not attempted.
    Skipped,

    /// The endpoint answered with the expected status.
    Reachable { status: u16 },

    /// Error, timeout, or unexpected status.
    Unreachable { reason: String },
}

impl ProbeOutcome {
    /// Whether this outcome should be surfaced as a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, ProbeOutcome::Unreachable { .. })
    }
}

/// Derive the function's health endpoint from its query URL.
///
/// The deployed function exposes `/health` alongside `/query`; any other
/// URL shape is probed as-is.
pub fn health_url(function_url: &str) -> String {
    match function_url.strip_suffix("/query") {
        Some(base) => format!("{}/health", base),
        None => function_url.to_string(),
    }
}

/// Issue one bounded-timeout GET against the function's health endpoint.
pub async fn probe_function(snapshot: &EnvSnapshot) -> ProbeOutcome {
    let (url, key) = match (snapshot.get(FUNCTION_URL_VAR), snapshot.get(FUNCTION_KEY_VAR)) {
        (Some(url), Some(key)) => (url, key),
        _ => return ProbeOutcome::Skipped,
    };

    let target = health_url(url);
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return ProbeOutcome::Unreachable {
                reason: format!("probe client unavailable: {}", e),
            }
        }
    };

    match client
        .get(&target)
        .header(FUNCTION_KEY_HEADER, key)
        .send()
        .await
    {
        Ok(response) => {
            let status = response.status().as_u16();
            if status == PROBE_EXPECTED_STATUS {
                info!(url = %target, status, "function endpoint reachable");
                ProbeOutcome::Reachable { status }
            } else {
                warn!(url = %target, status, "function endpoint returned unexpected status");
                ProbeOutcome::Unreachable {
                    reason: format!("unexpected status {} from {}", status, target),
                }
            }
        }
        Err(e) => {
            warn!(url = %target, error = %e, "function endpoint unreachable");
            ProbeOutcome::Unreachable {
                reason: format!("request to {} failed: {}", target, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_skipped_when_nothing_configured() {
        let outcome = probe_function(&snapshot(&[])).await;
        assert_eq!(outcome, ProbeOutcome::Skipped);
        assert!(!outcome.is_warning());
    }

    #[tokio::test]
    async fn test_skipped_when_key_missing() {
        let snap = snapshot(&[(FUNCTION_URL_VAR, "https://fn.example.net/api/query")]);
        assert_eq!(probe_function(&snap).await, ProbeOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_skipped_when_url_missing() {
        let snap = snapshot(&[(FUNCTION_KEY_VAR, "secret")]);
        assert_eq!(probe_function(&snap).await, ProbeOutcome::Skipped);
    }

    #[test]
    fn test_health_url_rewrites_query_suffix() {
        assert_eq!(
            health_url("https://fn.example.net/api/query"),
            "https://fn.example.net/api/health"
        );
    }

    #[test]
    fn test_health_url_leaves_other_shapes_alone() {
        assert_eq!(
            health_url("https://fn.example.net/api/run"),
            "https://fn.example.net/api/run"
        );
    }

    #[test]
    fn test_only_unreachable_warns() {
        assert!(ProbeOutcome::Unreachable {
            reason: "timeout".into()
        }
        .is_warning());
        assert!(!ProbeOutcome::Reachable { status: 200 }.is_warning());
        assert!(!ProbeOutcome::Skipped.is_warning());
    }
}
