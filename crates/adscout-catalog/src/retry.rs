//! Transport retry policy for catalog page requests.
//!
//! Only transient failures are retried: dropped connections, timeouts, 5xx
//! answers and the archive's 429 throttle. A 4xx answer or an unreadable
//! payload means the request itself is wrong and fails at once.

use std::future::Future;
use std::time::Duration;

use crate::error::CatalogError;

const MAX_DELAY: Duration = Duration::from_secs(30);

/// How many extra attempts a request gets, and how long to wait between them.
///
/// The wait before retry `n` is `base × n`, jittered by ±25 % and capped at
/// thirty seconds. The default policy never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_ms: u64) -> Self {
        Self {
            max_retries,
            base: Duration::from_millis(base_ms),
        }
    }

    /// Un-jittered wait before retry number `retry` (1-based).
    fn nominal_delay(&self, retry: u32) -> Duration {
        self.base.saturating_mul(retry).min(MAX_DELAY)
    }

    fn jittered_delay(&self, retry: u32) -> Duration {
        let factor = rand::random_range(0.75..=1.25);
        self.nominal_delay(retry).mul_f64(factor).min(MAX_DELAY)
    }

    /// Runs `request` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, mut request: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let mut retry = 0u32;
        loop {
            let err = match request().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry >= self.max_retries || !is_transient(&err) {
                return Err(err);
            }
            retry += 1;
            let delay = self.jittered_delay(retry);
            tracing::warn!(
                retry,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "catalog request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// `true` if the same request may succeed when sent again later.
pub(crate) fn is_transient(err: &CatalogError) -> bool {
    match err {
        CatalogError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.is_request()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        CatalogError::Api { status, .. } => *status == 429 || *status >= 500,
        CatalogError::Config(_)
        | CatalogError::Deserialize { .. }
        | CatalogError::InvalidBaseUrl { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn status(code: u16) -> CatalogError {
        CatalogError::Api {
            status: code,
            body: String::new(),
        }
    }

    /// Fails with `codes` in order, then succeeds with the attempt count.
    async fn scripted(policy: RetryPolicy, codes: &[u16]) -> (Result<u32, CatalogError>, u32) {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result = policy
            .run(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                match codes.get(n as usize) {
                    Some(&code) => Err(status(code)),
                    None => Ok(n + 1),
                }
            })
            .await;
        (result, attempts.load(Ordering::SeqCst))
    }

    #[test]
    fn throttle_and_server_errors_are_transient() {
        assert!(is_transient(&status(429)));
        assert!(is_transient(&status(500)));
        assert!(is_transient(&status(503)));
        assert!(!is_transient(&status(400)));
        assert!(!is_transient(&status(403)));
    }

    #[test]
    fn bad_payload_and_missing_token_are_permanent() {
        let source = serde_json::from_str::<()>("{").unwrap_err();
        assert!(!is_transient(&CatalogError::Deserialize {
            context: "ads_archive".to_owned(),
            source,
        }));
        assert!(!is_transient(&CatalogError::Config(
            adscout_core::ConfigError::MissingCredential
        )));
    }

    #[test]
    fn delay_grows_linearly_and_is_capped() {
        let policy = RetryPolicy::new(10, 500);
        assert_eq!(policy.nominal_delay(1), Duration::from_millis(500));
        assert_eq!(policy.nominal_delay(3), Duration::from_millis(1500));
        assert_eq!(RetryPolicy::new(10, 20_000).nominal_delay(4), MAX_DELAY);
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let policy = RetryPolicy::new(3, 1000);
        for _ in 0..50 {
            let delay = policy.jittered_delay(2);
            assert!(delay >= Duration::from_millis(1500));
            assert!(delay <= Duration::from_millis(2500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn default_policy_sends_once() {
        let (result, attempts) = scripted(RetryPolicy::default(), &[503]).await;
        assert!(matches!(result, Err(CatalogError::Api { status: 503, .. })));
        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let (result, attempts) = scripted(RetryPolicy::new(3, 200), &[502, 429]).await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_retries_run_out() {
        let (result, attempts) = scripted(RetryPolicy::new(2, 200), &[500, 500, 500, 500]).await;
        assert!(matches!(result, Err(CatalogError::Api { status: 500, .. })));
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_is_not_resent() {
        let (result, attempts) = scripted(RetryPolicy::new(3, 200), &[400]).await;
        assert!(matches!(result, Err(CatalogError::Api { status: 400, .. })));
        assert_eq!(attempts, 1);
    }
}
