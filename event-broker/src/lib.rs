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

//! # event-broker
//!
//! `event-broker` is the dataplane of a single-tenant event broker: it accepts
//! events over HTTP, matches them against a dynamically updated trigger set and
//! delivers them to subscribers with retry, dead-letter fallback and reply
//! re-ingestion.
//!
//! Typical usage is centered on [`EventBroker`]: build it with a [`DeliveryClient`],
//! push configuration through its [`ConfigFeed`], then [`EventBroker::run`] it on a
//! bound listener.
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use event_broker::{
//!     BrokerSettings, ConfigFeed, DeliveryAddress, DeliveryClient, DeliveryError,
//!     EventBroker, EventEnvelope, FilterSpec, RetryPolicy, TriggerSpec,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct Accepting;
//!
//! #[async_trait]
//! impl DeliveryClient for Accepting {
//!     async fn request(
//!         &self,
//!         _cancel: &CancellationToken,
//!         _target: &DeliveryAddress,
//!         _event: &EventEnvelope,
//!         _retry: &RetryPolicy,
//!     ) -> Result<Option<EventEnvelope>, DeliveryError> {
//!         Ok(None)
//!     }
//!
//!     async fn send(
//!         &self,
//!         _cancel: &CancellationToken,
//!         _target: &DeliveryAddress,
//!         _event: &EventEnvelope,
//!     ) -> Result<(), DeliveryError> {
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let broker = EventBroker::new("default", Arc::new(Accepting), BrokerSettings::default());
//!
//! let trigger = TriggerSpec {
//!     broker: Some("default".to_string()),
//!     filter: Some(FilterSpec {
//!         attributes: [("type".to_string(), "foo".to_string())].into(),
//!     }),
//!     subscriber_uri: Some("http://subscriber.example".to_string()),
//! };
//! broker.feed().on_trigger_upsert("foo-only", &trigger).unwrap();
//!
//! let event = EventEnvelope::builder("1", "bar", "foo").build().unwrap();
//! let report = broker.dispatch(&CancellationToken::new(), event).await.unwrap();
//! assert_eq!(report.delivered(), 1);
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API: event envelope, HTTP binding, delivery client seam and retry parameters
//! - Control plane: broker config, triggers, the copy-on-write trigger table and
//!   the feed boundary validating updates
//! - Routing: the attribute filter matcher and per-snapshot trigger selection
//! - Data plane: dispatcher, per-trigger delivery, ingress router, reply loopback
//!   and the bounded background pool
//! - Runtime: readiness flag and lifecycle controller
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod api;
pub use api::delivery::{DeliveryAddress, DeliveryClient};
pub use api::event::{EventBuilder, EventEnvelope, SPEC_VERSION_V03, SPEC_VERSION_V1};
pub use api::http_binding;
pub use api::retry::{run_with_retries, AttemptError, BackoffPolicy, RetryPolicy};

mod control_plane;
pub use control_plane::broker_config::{
    parse_iso8601_duration, BrokerConfig, BrokerSpec, DeliverySpec, DEFAULT_BACKOFF_DELAY,
    DEFAULT_RETRY,
};
pub use control_plane::config_feed::{ConfigFeed, TableFeed};
pub use control_plane::trigger::{FilterSpec, Trigger, TriggerSpec};
pub use control_plane::trigger_table::{TableSnapshot, TriggerTable};

mod data_plane;
pub use data_plane::delivery::TriggerOutcome;
pub use data_plane::dispatcher::{
    DispatchReport, Dispatcher, DispatcherConfig, DEFAULT_BACKGROUND_TASK_LIMIT,
    DEFAULT_REPLY_QUEUE_CAPACITY,
};
pub use data_plane::ingress::{ingress_router, HEALTH_PATH, READY_PATH};
pub use data_plane::reply_channel::ReplyReceiver;

mod error;
pub use error::{BrokerError, ConfigError, DeliveryError, EventFormatError};

#[doc(hidden)]
pub mod observability;

mod routing;
pub use routing::filter::{matches, AttributeFilter};

mod runtime;
pub use runtime::lifecycle::{
    LifecycleConfig, LifecycleController, LifecycleState, DEFAULT_DRAIN_TIMEOUT,
};
pub use runtime::readiness::Readiness;

mod broker;
pub use broker::{BrokerSettings, EventBroker};
