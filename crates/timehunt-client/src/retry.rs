//! Bounded re-authorization.
//!
//! A command runs as a series of attempts. When an attempt fails because the
//! calendar rejected our credentials, [`ReauthPolicy::recover`] asks the
//! credential provider for fresh ones and lets the caller start over, up to a
//! fixed number of attempts. Any other failure ends the command at once.

use thiserror::Error;
use tracing::{debug, warn};

use timehunt_providers::{CredentialProvider, ProviderError};

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 3;

/// Why an attempt may not be retried.
#[derive(Debug, Error)]
pub enum ReauthError {
    /// The failure was not about credentials, or fresh credentials could
    /// not be obtained.
    #[error(transparent)]
    Fatal(ProviderError),

    /// Credentials were still rejected on the last allowed attempt.
    #[error("credentials still rejected after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// The error from the last attempt.
        #[source]
        last: ProviderError,
    },
}

/// How many times a command may run before giving up on credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReauthPolicy {
    max_attempts: u32,
}

impl ReauthPolicy {
    /// Creates a policy allowing `max_attempts` attempts in total.
    ///
    /// Zero is treated as one: the first attempt always runs.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Attempts allowed in total.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Handles the failure of attempt number `attempt` (1-based).
    ///
    /// Returns `Ok(())` once fresh credentials are in place and the caller
    /// should run the next attempt.
    pub async fn recover(
        &self,
        credentials: &dyn CredentialProvider,
        attempt: u32,
        err: ProviderError,
    ) -> Result<(), ReauthError> {
        if !err.is_authorization() {
            debug!("attempt {} failed with {}, not retrying", attempt, err.code());
            return Err(ReauthError::Fatal(err));
        }

        if attempt >= self.max_attempts {
            return Err(ReauthError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        warn!(
            "credentials rejected on attempt {}/{} ({}), re-authorizing",
            attempt, self.max_attempts, err
        );
        credentials.authorize().await.map_err(ReauthError::Fatal)
    }
}

impl Default for ReauthPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AUTH_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use timehunt_providers::{BoxFuture, ProviderResult};

    #[derive(Default)]
    struct CountingCredentials {
        calls: AtomicU32,
        fail: bool,
    }

    impl CredentialProvider for CountingCredentials {
        fn authorize(&self) -> BoxFuture<'_, ProviderResult<()>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(ProviderError::authentication("user denied consent"))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test]
    async fn authorization_failure_reauthorizes() {
        let credentials = CountingCredentials::default();
        let policy = ReauthPolicy::default();

        let result = policy
            .recover(&credentials, 1, ProviderError::authentication("expired"))
            .await;
        assert!(result.is_ok());
        assert_eq!(credentials.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn last_attempt_is_exhausted_without_reauthorizing() {
        let credentials = CountingCredentials::default();
        let policy = ReauthPolicy::new(3);

        let result = policy
            .recover(&credentials, 3, ProviderError::authorization("forbidden"))
            .await;
        assert!(matches!(result, Err(ReauthError::Exhausted { attempts: 3, .. })));
        assert_eq!(credentials.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn other_failures_are_fatal() {
        let credentials = CountingCredentials::default();
        let policy = ReauthPolicy::default();

        for err in [
            ProviderError::network("offline"),
            ProviderError::server("boom"),
            ProviderError::rate_limited("slow down"),
            ProviderError::invalid_response("garbage"),
        ] {
            let result = policy.recover(&credentials, 1, err).await;
            assert!(matches!(result, Err(ReauthError::Fatal(_))));
        }
        assert_eq!(credentials.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_authorization_is_fatal() {
        let credentials = CountingCredentials {
            fail: true,
            ..Default::default()
        };
        let result = ReauthPolicy::default()
            .recover(&credentials, 1, ProviderError::authentication("expired"))
            .await;
        assert!(matches!(result, Err(ReauthError::Fatal(ref e)) if e.message() == "user denied consent"));
    }

    #[test]
    fn zero_attempts_still_allows_one() {
        assert_eq!(ReauthPolicy::new(0).max_attempts(), 1);
        assert_eq!(ReauthPolicy::default().max_attempts(), 3);
    }
}
