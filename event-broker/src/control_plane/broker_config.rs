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

//! Broker-wide delivery configuration.

use crate::api::delivery::DeliveryAddress;
use crate::api::retry::{BackoffPolicy, RetryPolicy};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_RETRY: u32 = 5;
pub const DEFAULT_BACKOFF_DELAY: Duration = Duration::from_millis(10);

const COMPONENT: &str = "broker_config";

/// Delivery section of a broker object as pushed by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_policy: Option<String>,
    /// ISO-8601 duration, e.g. `PT0.5S`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_delay: Option<String>,
}

/// Broker object as pushed by the control plane, with its dead-letter sink already
/// resolved to an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_sink_uri: Option<String>,
}

/// Validated delivery configuration. Replaced wholesale on every update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerConfig {
    pub retry_count: Option<u32>,
    pub backoff_policy: Option<BackoffPolicy>,
    pub backoff_delay: Option<Duration>,
    pub dead_letter_sink: Option<DeliveryAddress>,
}

impl BrokerConfig {
    /// Validates a control-plane broker object.
    ///
    /// An unparseable backoff delay is not an error: the default unit applies and a
    /// warning is logged.
    pub fn from_spec(spec: &BrokerSpec) -> Result<Self, ConfigError> {
        let mut config = BrokerConfig::default();

        if let Some(delivery) = &spec.delivery {
            if let Some(retry) = delivery.retry {
                config.retry_count =
                    Some(u32::try_from(retry).map_err(|_| ConfigError::NegativeRetry(retry))?);
            }
            if let Some(policy) = &delivery.backoff_policy {
                config.backoff_policy = Some(
                    policy
                        .parse::<BackoffPolicy>()
                        .map_err(|_| ConfigError::UnknownBackoffPolicy(policy.clone()))?,
                );
            }
            if let Some(raw) = &delivery.backoff_delay {
                config.backoff_delay = parse_iso8601_duration(raw);
                if config.backoff_delay.is_none() {
                    warn!(
                        component = COMPONENT,
                        backoff_delay = raw.as_str(),
                        default = ?DEFAULT_BACKOFF_DELAY,
                        "unparseable backoff delay, using default"
                    );
                }
            }
        }

        if let Some(uri) = &spec.dead_letter_sink_uri {
            config.dead_letter_sink = Some(DeliveryAddress::parse("deadLetterSinkUri", uri)?);
        }

        Ok(config)
    }

    /// Retry parameters for one delivery.
    ///
    /// Retries only apply when a backoff policy is configured; otherwise a single
    /// attempt is made.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.backoff_policy {
            None => RetryPolicy::single_attempt(),
            Some(backoff) => RetryPolicy::new(
                self.retry_count.unwrap_or(DEFAULT_RETRY),
                backoff,
                self.backoff_delay.unwrap_or(DEFAULT_BACKOFF_DELAY),
            ),
        }
    }
}

/// Parses an ISO-8601 duration (`PnYnMnWnDTnHnMnS`, fractions allowed).
///
/// Calendar units are approximated: a year is 365 days and a month 30 days.
pub fn parse_iso8601_duration(raw: &str) -> Option<Duration> {
    let rest = raw.trim().strip_prefix(['P', 'p'])?;
    if rest.is_empty() {
        return None;
    }

    let mut seconds = 0f64;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            'T' if !in_time && number.is_empty() => in_time = true,
            digit @ ('0'..='9' | '.' | ',') => number.push(if digit == ',' { '.' } else { digit }),
            unit => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                let scale = match (in_time, unit) {
                    (false, 'Y') => 365.0 * 86_400.0,
                    (false, 'M') => 30.0 * 86_400.0,
                    (false, 'W') => 7.0 * 86_400.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return None,
                };
                seconds += value * scale;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component || !seconds.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}
