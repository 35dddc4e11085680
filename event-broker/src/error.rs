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

//! Error taxonomy shared by the broker layers.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced to the caller of a dispatch or to the hosting process.
///
/// Per-trigger delivery failures never appear here: they are recovered inside the
/// data plane (logged and optionally dead-lettered).
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The trigger table could not produce a consistent snapshot.
    #[error("trigger table snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    /// A configuration update was rejected at the feed boundary.
    #[error("configuration rejected: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The inbound envelope could not be decoded or validated.
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] EventFormatError),

    /// A receiver loop exited before shutdown was requested.
    #[error("receiver `{receiver}` stopped unexpectedly: {reason}")]
    ReceiverFailed {
        receiver: &'static str,
        reason: String,
    },

    /// Graceful drain did not finish within the configured bound.
    #[error("timeout shutting down receivers after {timeout:?}")]
    ShutdownTimeout { timeout: Duration },

    /// The lifecycle controller was asked to start more than once.
    #[error("lifecycle already started (state: {0})")]
    AlreadyStarted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Rejections raised at the configuration feed boundary.
///
/// A rejected update never reaches the trigger table; the previous snapshot keeps
/// serving traffic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("retry must be non-negative, got {0}")]
    NegativeRetry(i64),

    #[error("invalid {field} uri `{uri}`: {reason}")]
    InvalidUri {
        field: &'static str,
        uri: String,
        reason: String,
    },

    #[error("trigger name must not be empty")]
    EmptyTriggerName,

    #[error("trigger `{trigger}` has an empty filter attribute name")]
    EmptyFilterAttribute { trigger: String },

    #[error("trigger `{trigger}` filters on `{attribute}` more than once with different values")]
    ConflictingFilterAttribute { trigger: String, attribute: String },

    #[error("unknown backoff policy `{0}`")]
    UnknownBackoffPolicy(String),
}

/// Decoding/validation failures for event envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventFormatError {
    #[error("missing required attribute `{0}`")]
    MissingAttribute(&'static str),

    #[error("unsupported specversion `{0}`")]
    UnsupportedSpecVersion(String),

    #[error("invalid value for attribute `{attribute}`: {reason}")]
    InvalidAttribute {
        attribute: String,
        reason: String,
    },

    #[error("request carries no event (content-type: {0:?})")]
    NotAnEvent(Option<String>),

    #[error("invalid structured event body: {0}")]
    InvalidStructuredBody(String),
}

/// Terminal classification returned by a [`crate::DeliveryClient`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Every attempt allowed by the retry policy failed, or a non-retryable
    /// failure was observed.
    #[error("undelivered after {attempts} attempt(s): {reason}")]
    Undelivered { attempts: u32, reason: String },

    /// Delivery was abandoned because shutdown was requested.
    #[error("delivery canceled after {attempts} attempt(s)")]
    Canceled { attempts: u32 },
}

impl DeliveryError {
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryError::Undelivered { attempts, .. } | DeliveryError::Canceled { attempts } => {
                *attempts
            }
        }
    }
}
