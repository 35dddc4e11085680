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

//! Outbound delivery seam.

use crate::api::event::EventEnvelope;
use crate::api::retry::RetryPolicy;
use crate::error::{ConfigError, DeliveryError};
use async_trait::async_trait;
use axum::http::Uri;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// A resolved, absolute `http`/`https` address of a subscriber or sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeliveryAddress(String);

impl DeliveryAddress {
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidUri {
            field,
            uri: raw.to_string(),
            reason: reason.to_string(),
        };

        let uri = Uri::from_str(raw).map_err(|err| invalid(&err.to_string()))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            Some(_) => return Err(invalid("scheme must be http or https")),
            None => return Err(invalid("uri must be absolute")),
        }
        if uri.host().map_or(true, str::is_empty) {
            return Err(invalid("uri has no host"));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeliveryAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeliveryAddress {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse("address", &value)
    }
}

impl From<DeliveryAddress> for String {
    fn from(value: DeliveryAddress) -> Self {
        value.0
    }
}

/// Outbound request/response and fire-and-forget sends to subscribers and sinks.
///
/// Implementations own the retry loop for [`DeliveryClient::request`]; the broker only
/// supplies the [`RetryPolicy`]. `Err(DeliveryError::Undelivered)` is the terminal
/// classification once the policy is exhausted.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Delivers `event` and returns the subscriber's reply event, if any.
    async fn request(
        &self,
        cancel: &CancellationToken,
        target: &DeliveryAddress,
        event: &EventEnvelope,
        retry: &RetryPolicy,
    ) -> Result<Option<EventEnvelope>, DeliveryError>;

    /// Delivers `event` once, ignoring any reply.
    async fn send(
        &self,
        cancel: &CancellationToken,
        target: &DeliveryAddress,
        event: &EventEnvelope,
    ) -> Result<(), DeliveryError>;
}
