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

//! HTTP [`DeliveryClient`] for the event broker.
//!
//! Events go out in CloudEvents binary mode. A subscriber reply is read back in
//! either binding mode; a 2xx response that carries no event means "no reply".
//! Transport failures, 5xx, 408 and 429 are retried under the broker's
//! [`RetryPolicy`], every other non-2xx status is final.

use async_trait::async_trait;
use bytes::Bytes;
use event_broker::observability::events;
use event_broker::{
    http_binding, run_with_retries, AttemptError, DeliveryAddress, DeliveryClient, DeliveryError,
    EventEnvelope, RetryPolicy,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMPONENT: &str = "http_delivery_client";
const CE_ID: &str = "ce-id";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("unable to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Upper bound for a single attempt, response body included.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpDeliveryClient {
    http: reqwest::Client,
}

impl HttpDeliveryClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http })
    }

    async fn attempt(
        &self,
        target: &DeliveryAddress,
        headers: &HeaderMap,
        body: &Bytes,
        attempt: u32,
    ) -> Result<Option<EventEnvelope>, AttemptError> {
        let response = self
            .http
            .post(target.as_str())
            .headers(headers.clone())
            .body(body.clone())
            .send()
            .await
            .map_err(|err| attempt_failed(target, attempt, AttemptError::Retryable(err.to_string())))?;

        let status = response.status();
        if let Some(err) = classify(status) {
            return Err(attempt_failed(target, attempt, err));
        }

        let reply_headers = response.headers().clone();
        let reply_body = response
            .bytes()
            .await
            .map_err(|err| attempt_failed(target, attempt, AttemptError::Retryable(err.to_string())))?;

        debug!(
            component = COMPONENT,
            subscriber = target.as_str(),
            attempt,
            status = status.as_u16(),
            "delivery attempt succeeded"
        );
        Ok(decode_reply(target, &reply_headers, reply_body))
    }
}

fn attempt_failed(target: &DeliveryAddress, attempt: u32, err: AttemptError) -> AttemptError {
    let (retryable, reason) = match &err {
        AttemptError::Retryable(reason) => (true, reason.as_str()),
        AttemptError::Terminal(reason) => (false, reason.as_str()),
    };
    debug!(
        event = events::DELIVERY_ATTEMPT_FAILED,
        component = COMPONENT,
        subscriber = target.as_str(),
        attempt,
        retryable,
        reason,
        "delivery attempt failed"
    );
    err
}

/// `None` for 2xx; otherwise whether another attempt may help.
fn classify(status: StatusCode) -> Option<AttemptError> {
    if status.is_success() {
        return None;
    }
    let reason = format!("subscriber responded with {status}");
    let retryable = status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;
    Some(if retryable {
        AttemptError::Retryable(reason)
    } else {
        AttemptError::Terminal(reason)
    })
}

fn is_structured(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(http_binding::STRUCTURED_CONTENT_TYPE))
}

/// Fills in a fresh UUID when the reply carries no (or an empty) id.
fn with_reply_id(mut headers: HeaderMap, body: Bytes) -> (HeaderMap, Bytes) {
    if is_structured(&headers) {
        let Ok(Value::Object(mut document)) = serde_json::from_slice::<Value>(&body) else {
            return (headers, body);
        };
        let has_id = document
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty());
        if has_id {
            return (headers, body);
        }
        document.insert("id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        return match serde_json::to_vec(&Value::Object(document)) {
            Ok(rewritten) => (headers, Bytes::from(rewritten)),
            Err(_) => (headers, body),
        };
    }

    let has_id = headers
        .get(CE_ID)
        .is_some_and(|value| !value.as_bytes().is_empty());
    if !has_id {
        if let Ok(id) = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()) {
            headers.insert(HeaderName::from_static(CE_ID), id);
        }
    }
    (headers, body)
}

fn decode_reply(target: &DeliveryAddress, headers: &HeaderMap, body: Bytes) -> Option<EventEnvelope> {
    if !http_binding::carries_event(headers) {
        return None;
    }
    let (headers, body) = with_reply_id(headers.clone(), body);
    match http_binding::decode(&headers, body) {
        Ok(reply) => Some(reply),
        Err(err) => {
            warn!(
                event = events::DELIVERY_REPLY_MALFORMED,
                component = COMPONENT,
                subscriber = target.as_str(),
                err = %err,
                "subscriber reply is not a valid event, ignoring it"
            );
            None
        }
    }
}

fn encode(event: &EventEnvelope) -> Result<(HeaderMap, Bytes), DeliveryError> {
    http_binding::encode_binary(event).map_err(|err| DeliveryError::Undelivered {
        attempts: 0,
        reason: err.to_string(),
    })
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn request(
        &self,
        cancel: &CancellationToken,
        target: &DeliveryAddress,
        event: &EventEnvelope,
        retry: &RetryPolicy,
    ) -> Result<Option<EventEnvelope>, DeliveryError> {
        let (headers, body) = encode(event)?;
        run_with_retries(retry, cancel, |attempt| {
            self.attempt(target, &headers, &body, attempt)
        })
        .await
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        target: &DeliveryAddress,
        event: &EventEnvelope,
    ) -> Result<(), DeliveryError> {
        let (headers, body) = encode(event)?;
        run_with_retries(&RetryPolicy::single_attempt(), cancel, |attempt| {
            self.attempt(target, &headers, &body, attempt)
        })
        .await
        .map(|_| ())
    }
}
