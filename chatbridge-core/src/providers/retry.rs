//! Retry policy for structured output extraction
//!
//! Schema serialization, parse and validation failures are re-attempted
//! sequentially up to a fixed budget. Every attempt starts again from the
//! caller's original options, so nothing accumulates between attempts.
//! Transport errors are never retried here.

use crate::providers::error::{CompletionError, CompletionResult};
use std::future::Future;
use tracing::{error, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::protocol::DEFAULT_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with the given budget
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self { max_retries: 0 }
    }

    /// Check if we should retry based on the error and retries already used
    pub fn should_retry(&self, error: &CompletionError, retries_used: u32) -> bool {
        retries_used < self.max_retries && error.is_retryable()
    }
}

/// Result of a retry operation
#[derive(Debug, Clone)]
pub struct RetryResult<T> {
    /// The successful result (if any)
    pub result: Option<T>,

    /// Number of attempts made, including the first one
    pub attempts: u32,

    /// The final error (if failed), already in its terminal form
    pub final_error: Option<CompletionError>,

    /// All errors encountered, in attempt order
    pub error_history: Vec<CompletionError>,
}

impl<T> RetryResult<T> {
    /// Collapse into the call's result
    pub fn into_result(self) -> CompletionResult<T> {
        match (self.result, self.final_error) {
            (Some(value), _) => Ok(value),
            (None, Some(err)) => Err(err),
            (None, None) => Err(CompletionError::InvalidRequest(
                "retry loop finished without running an attempt".to_string(),
            )),
        }
    }
}

/// Executor for retry operations
pub struct RetryExecutor<'a> {
    policy: RetryPolicy,
    request_id: &'a str,
}

impl<'a> RetryExecutor<'a> {
    /// Create a new retry executor; the request id is used for logging
    pub fn new(policy: RetryPolicy, request_id: &'a str) -> Self {
        Self { policy, request_id }
    }

    /// Execute an operation with retry logic
    ///
    /// The operation receives the 1-based attempt number.
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> RetryResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CompletionResult<T>>,
    {
        let mut attempts = 0;
        let mut error_history = Vec::new();

        loop {
            attempts += 1;

            match operation(attempts).await {
                Ok(result) => {
                    return RetryResult {
                        result: Some(result),
                        attempts,
                        final_error: None,
                        error_history,
                    };
                }
                Err(err) => {
                    error_history.push(err.clone());
                    let retries_used = attempts - 1;

                    if !self.policy.should_retry(&err, retries_used) {
                        let final_error = if err.is_retryable() {
                            error!(
                                category = "failure",
                                request_id = self.request_id,
                                attempts,
                                "Retry budget exhausted: {}",
                                err
                            );
                            err.into_terminal(attempts)
                        } else {
                            err
                        };

                        return RetryResult {
                            result: None,
                            attempts,
                            final_error: Some(final_error),
                            error_history,
                        };
                    }

                    warn!(
                        category = "retry",
                        request_id = self.request_id,
                        attempt = attempts,
                        remaining = self.policy.max_retries - retries_used,
                        "Retrying after structured output failure: {}",
                        err
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::error::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn parse_error() -> CompletionError {
        CompletionError::SchemaParse {
            message: "expected value at line 1 column 1".to_string(),
            raw: "Sure! Here you go".to_string(),
        }
    }

    #[test]
    fn test_should_retry_logic() {
        let policy = RetryPolicy::new(2);
        assert!(policy.should_retry(&parse_error(), 0));
        assert!(policy.should_retry(&parse_error(), 1));
        assert!(!policy.should_retry(&parse_error(), 2));

        let upstream = CompletionError::Upstream(ProviderError::Timeout);
        assert!(!policy.should_retry(&upstream, 0));
    }

    #[tokio::test]
    async fn test_attempts_bounded_by_budget() {
        for budget in 0..4u32 {
            let calls = AtomicU32::new(0);
            let executor = RetryExecutor::new(RetryPolicy::new(budget), "test");

            let result: RetryResult<()> = executor
                .execute(|_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(parse_error()) }
                })
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), budget + 1);
            assert_eq!(result.attempts, budget + 1);
            assert_eq!(result.error_history.len(), (budget + 1) as usize);
            assert_eq!(result.into_result().unwrap_err(), parse_error());
        }
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let executor = RetryExecutor::new(RetryPolicy::default(), "test");

        let result = executor
            .execute(|attempt| async move {
                if attempt < 3 {
                    Err(parse_error())
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.attempts, 3);
        assert_eq!(result.error_history.len(), 2);
        assert_eq!(result.into_result().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_upstream_error_not_retried() {
        let executor = RetryExecutor::new(RetryPolicy::new(5), "test");

        let result: RetryResult<()> = executor
            .execute(|_| async { Err(CompletionError::Upstream(ProviderError::AuthenticationError)) })
            .await;

        assert_eq!(result.attempts, 1);
        assert!(matches!(
            result.into_result(),
            Err(CompletionError::Upstream(ProviderError::AuthenticationError))
        ));
    }

    #[tokio::test]
    async fn test_validation_exhaustion_is_distinct() {
        let executor = RetryExecutor::new(RetryPolicy::new(1), "test");

        let result: RetryResult<()> = executor
            .execute(|_| async {
                Err(CompletionError::SchemaValidation {
                    message: "\"value\" is a required property".to_string(),
                    raw: "{}".to_string(),
                })
            })
            .await;

        assert!(matches!(
            result.into_result(),
            Err(CompletionError::InvalidResponseSchema { attempts: 2, .. })
        ));
    }
}
