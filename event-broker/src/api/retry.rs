/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Retry parameters handed to a [`crate::DeliveryClient`], plus the retry loop
//! clients use to honour them.
//!
//! The dispatcher only chooses the parameters. Delivery clients own the loop
//! mechanics, which is why [`run_with_retries`] is public: any transport can wrap a
//! single attempt in it and get the same cancellation and backoff behaviour.
//!
//! ```
//! use std::time::Duration;
//! use event_broker::{BackoffPolicy, RetryPolicy};
//!
//! let linear = RetryPolicy::new(3, BackoffPolicy::Linear, Duration::from_millis(10));
//! assert_eq!(linear.max_attempts(), 4);
//! assert_eq!(linear.delay_before_retry(3), Duration::from_millis(30));
//!
//! let exponential = RetryPolicy::new(3, BackoffPolicy::Exponential, Duration::from_millis(10));
//! assert_eq!(exponential.delay_before_retry(3), Duration::from_millis(80));
//! ```

use crate::error::DeliveryError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How the delay between attempts grows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum BackoffPolicy {
    /// `delay * n` before retry `n`.
    Linear,
    /// `delay * 2^n` before retry `n`.
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    pub backoff: BackoffPolicy,
    /// Backoff unit.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(retries: u32, backoff: BackoffPolicy, delay: Duration) -> Self {
        Self {
            retries,
            backoff,
            delay,
        }
    }

    /// The baseline used when the broker has no delivery policy: one attempt.
    pub const fn single_attempt() -> Self {
        Self::new(0, BackoffPolicy::Linear, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay to wait before retry number `retry` (1-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        match self.backoff {
            BackoffPolicy::Linear => self.delay.saturating_mul(retry),
            BackoffPolicy::Exponential => {
                let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
                self.delay.saturating_mul(factor)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Worth another attempt if the policy allows one.
    Retryable(String),
    /// The receiver rejected the event; retrying will not help.
    Terminal(String),
}

/// Drives `attempt` until it succeeds, fails terminally, exhausts `policy`, or
/// `cancel` fires.
///
/// An attempt that is already running is allowed to finish; cancellation is
/// observed before each attempt and while waiting out the backoff.
pub async fn run_with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T, DeliveryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(DeliveryError::Canceled { attempts });
        }
        attempts += 1;

        let reason = match attempt(attempts).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Terminal(reason)) => {
                return Err(DeliveryError::Undelivered { attempts, reason });
            }
            Err(AttemptError::Retryable(reason)) => reason,
        };

        if attempts >= max_attempts {
            return Err(DeliveryError::Undelivered { attempts, reason });
        }

        let delay = policy.delay_before_retry(attempts);
        debug!(attempt = attempts, ?delay, %reason, "attempt failed, backing off");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DeliveryError::Canceled { attempts }),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn backoff_policy_parses_case_insensitively() {
        assert_eq!("Linear".parse::<BackoffPolicy>(), Ok(BackoffPolicy::Linear));
        assert_eq!(
            "exponential".parse::<BackoffPolicy>(),
            Ok(BackoffPolicy::Exponential)
        );
        assert!("fibonacci".parse::<BackoffPolicy>().is_err());
        assert_eq!(BackoffPolicy::Exponential.to_string(), "exponential");
    }

    #[test]
    fn exponential_delay_saturates() {
        let policy = RetryPolicy::new(100, BackoffPolicy::Exponential, Duration::from_secs(1));
        assert_eq!(policy.delay_before_retry(1), Duration::from_secs(2));
        assert_eq!(
            policy.delay_before_retry(64),
            Duration::from_secs(1).saturating_mul(u32::MAX)
        );
    }

    #[tokio::test]
    async fn succeeds_on_fourth_attempt_with_three_retries() {
        let policy = RetryPolicy::new(3, BackoffPolicy::Linear, Duration::from_millis(10));
        let calls = Arc::new(AtomicU32::new(0));

        let result = run_with_retries(&policy, &CancellationToken::new(), |attempt| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 4 {
                    Err(AttemptError::Retryable(format!("attempt {attempt} failed")))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn exhausts_retries_then_reports_undelivered() {
        let policy = RetryPolicy::new(2, BackoffPolicy::Exponential, Duration::from_millis(1));

        let result: Result<(), _> = run_with_retries(&policy, &CancellationToken::new(), |_| async {
            Err(AttemptError::Retryable("503".to_string()))
        })
        .await;

        assert_eq!(
            result,
            Err(DeliveryError::Undelivered {
                attempts: 3,
                reason: "503".to_string()
            })
        );
    }

    #[tokio::test]
    async fn terminal_failure_stops_immediately() {
        let policy = RetryPolicy::new(5, BackoffPolicy::Linear, Duration::from_millis(1));

        let result: Result<(), _> = run_with_retries(&policy, &CancellationToken::new(), |_| async {
            Err(AttemptError::Terminal("400".to_string()))
        })
        .await;

        assert_eq!(result.unwrap_err().attempts(), 1);
    }

    #[tokio::test]
    async fn cancellation_abandons_backoff() {
        let policy = RetryPolicy::new(5, BackoffPolicy::Linear, Duration::from_secs(3600));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        let result: Result<(), _> = run_with_retries(&policy, &cancel, move |_| {
            canceller.cancel();
            async { Err(AttemptError::Retryable("boom".to_string())) }
        })
        .await;

        assert_eq!(result, Err(DeliveryError::Canceled { attempts: 1 }));
    }
}
