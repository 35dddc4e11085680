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

//! Test doubles for exercising the broker without a network.

use async_trait::async_trait;
use event_broker::{
    run_with_retries, AttemptError, DeliveryAddress, DeliveryClient, DeliveryError,
    EventEnvelope, RetryPolicy,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, Once, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

static TRACING: Once = Once::new();

/// Installs a test-friendly `tracing` subscriber once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Scripted answer to one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Accepted without a reply.
    Accept,
    /// Accepted with a reply event.
    Reply(EventEnvelope),
    /// Failure worth retrying.
    Fail(String),
    /// Failure that ends the retry loop.
    Reject(String),
    /// Accepted after the given delay; the attempt ignores cancellation.
    Slow(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAttempt {
    pub target: String,
    pub event: EventEnvelope,
    pub attempt: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    pub target: String,
    pub event: EventEnvelope,
}

/// [`DeliveryClient`] answering from per-target scripts and recording every call.
///
/// Targets without a script, or whose script ran out, accept without a reply.
/// `request` runs the scripted attempts through [`run_with_retries`], so retry and
/// cancellation behave as in a real client.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Response>>>,
    failing_sinks: Mutex<HashSet<String>>,
    attempts: Mutex<Vec<RecordedAttempt>>,
    sends: Mutex<Vec<RecordedSend>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `responses` to the script for `target`.
    pub fn script(&self, target: &str, responses: impl IntoIterator<Item = Response>) {
        lock(&self.scripts)
            .entry(target.to_string())
            .or_default()
            .extend(responses);
    }

    /// Makes every `send` to `target` fail.
    pub fn fail_sends_to(&self, target: &str) {
        lock(&self.failing_sinks).insert(target.to_string());
    }

    pub fn attempts(&self) -> Vec<RecordedAttempt> {
        lock(&self.attempts).clone()
    }

    pub fn attempts_to(&self, target: &str) -> usize {
        lock(&self.attempts)
            .iter()
            .filter(|attempt| attempt.target == target)
            .count()
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        lock(&self.sends).clone()
    }

    pub fn sends_to(&self, target: &str) -> Vec<EventEnvelope> {
        lock(&self.sends)
            .iter()
            .filter(|send| send.target == target)
            .map(|send| send.event.clone())
            .collect()
    }

    /// Waits until `condition` holds for this client or `timeout` elapses.
    pub async fn wait_until(&self, timeout: Duration, condition: impl Fn(&Self) -> bool) -> bool {
        eventually(timeout, || async { condition(self) }).await
    }

    fn next_response(&self, target: &str) -> Response {
        lock(&self.scripts)
            .get_mut(target)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Response::Accept)
    }

    fn record_attempt(&self, target: &str, event: &EventEnvelope, attempt: u32) {
        lock(&self.attempts).push(RecordedAttempt {
            target: target.to_string(),
            event: event.clone(),
            attempt,
        });
    }
}

#[async_trait]
impl DeliveryClient for ScriptedClient {
    async fn request(
        &self,
        cancel: &CancellationToken,
        target: &DeliveryAddress,
        event: &EventEnvelope,
        retry: &RetryPolicy,
    ) -> Result<Option<EventEnvelope>, DeliveryError> {
        run_with_retries(retry, cancel, |attempt| async move {
            self.record_attempt(target.as_str(), event, attempt);
            let response = self.next_response(target.as_str());
            debug!(subscriber = target.as_str(), attempt, ?response, "scripted attempt");
            match response {
                Response::Accept => Ok(None),
                Response::Reply(reply) => Ok(Some(reply)),
                Response::Fail(reason) => Err(AttemptError::Retryable(reason)),
                Response::Reject(reason) => Err(AttemptError::Terminal(reason)),
                Response::Slow(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn send(
        &self,
        _cancel: &CancellationToken,
        target: &DeliveryAddress,
        event: &EventEnvelope,
    ) -> Result<(), DeliveryError> {
        lock(&self.sends).push(RecordedSend {
            target: target.to_string(),
            event: event.clone(),
        });

        if lock(&self.failing_sinks).contains(target.as_str()) {
            return Err(DeliveryError::Undelivered {
                attempts: 1,
                reason: "scripted sink failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Polls `check` every few milliseconds until it yields `true` or `timeout`
/// elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
