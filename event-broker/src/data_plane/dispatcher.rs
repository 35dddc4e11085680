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

//! Per-event fan-out over one trigger-table snapshot.

use crate::api::delivery::DeliveryClient;
use crate::api::event::EventEnvelope;
use crate::control_plane::trigger_table::TriggerTable;
use crate::data_plane::background::BackgroundTasks;
use crate::data_plane::delivery::{deliver_to_trigger, DeliveryContext, TriggerOutcome};
use crate::data_plane::reply_channel::{reply_channel, ReplyReceiver, ReplySender};
use crate::error::BrokerError;
use crate::observability::events;
use crate::routing::selection::select_triggers;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, Instrument};

const COMPONENT: &str = "dispatcher";

pub const DEFAULT_REPLY_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_BACKGROUND_TASK_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Replies buffered between a delivery and their re-ingestion.
    pub reply_queue_capacity: usize,
    /// Concurrent dead-letter sends and reply enqueues; extra work is dropped.
    pub background_task_limit: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            reply_queue_capacity: DEFAULT_REPLY_QUEUE_CAPACITY,
            background_task_limit: DEFAULT_BACKGROUND_TASK_LIMIT,
        }
    }
}

/// Per-trigger results of one dispatch, in trigger-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<(String, TriggerOutcome)>,
}

impl DispatchReport {
    pub fn matched(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.count(|outcome| matches!(outcome, TriggerOutcome::Delivered { .. }))
    }

    pub fn undelivered(&self) -> usize {
        self.count(|outcome| matches!(outcome, TriggerOutcome::Undelivered { .. }))
    }

    pub fn outcome(&self, trigger: &str) -> Option<TriggerOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == trigger)
            .map(|(_, outcome)| *outcome)
    }

    fn count(&self, predicate: impl Fn(&TriggerOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| predicate(outcome)).count()
    }
}

/// Routes events to subscribers.
///
/// Shared by the ingress and reply receivers; every call takes its own snapshot of
/// the trigger table.
pub struct Dispatcher {
    table: Arc<TriggerTable>,
    client: Arc<dyn DeliveryClient>,
    replies: ReplySender,
    background: BackgroundTasks,
}

impl Dispatcher {
    /// Builds a dispatcher and the receiving end of its reply loopback.
    pub fn new(
        table: Arc<TriggerTable>,
        client: Arc<dyn DeliveryClient>,
        config: DispatcherConfig,
    ) -> (Arc<Self>, ReplyReceiver) {
        let (replies, receiver) = reply_channel(config.reply_queue_capacity);
        let dispatcher = Arc::new(Self {
            table,
            client,
            replies,
            background: BackgroundTasks::new(config.background_task_limit),
        });
        (dispatcher, receiver)
    }

    pub fn table(&self) -> &Arc<TriggerTable> {
        &self.table
    }

    /// Delivers `event` to every matching trigger of the current snapshot.
    ///
    /// Per-trigger failures are absorbed (logged, dead-lettered); only a snapshot
    /// failure is returned. Deliveries to distinct triggers run concurrently.
    pub async fn dispatch(
        &self,
        cancel: &CancellationToken,
        event: EventEnvelope,
    ) -> Result<DispatchReport, BrokerError> {
        let span = info_span!(
            "dispatch",
            event_id = event.id(),
            event_source = event.source(),
            event_type = event.ty()
        );
        self.dispatch_inner(cancel, event).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        cancel: &CancellationToken,
        event: EventEnvelope,
    ) -> Result<DispatchReport, BrokerError> {
        let snapshot = self.table.snapshot().map_err(|err| {
            error!(
                event = events::DISPATCH_SNAPSHOT,
                component = COMPONENT,
                err = %err,
                "unable to snapshot trigger table"
            );
            err
        })?;

        let targets = select_triggers(&snapshot, &event);
        let retry = snapshot.config().retry_policy();
        debug!(
            event = events::DISPATCH_SNAPSHOT,
            component = COMPONENT,
            generation = snapshot.generation(),
            triggers = snapshot.len(),
            matched = targets.len(),
            retries = retry.retries,
            "dispatching event"
        );
        if targets.is_empty() {
            return Ok(DispatchReport::default());
        }

        let ctx = DeliveryContext {
            client: &self.client,
            background: &self.background,
            replies: &self.replies,
            retry: &retry,
            dead_letter_sink: snapshot.config().dead_letter_sink.as_ref(),
        };
        let event = Arc::new(event);
        let outcomes = join_all(
            targets
                .iter()
                .map(|trigger| deliver_to_trigger(&ctx, cancel, trigger, &event)),
        )
        .await;

        Ok(DispatchReport {
            outcomes: targets
                .iter()
                .map(|trigger| trigger.name().to_string())
                .zip(outcomes)
                .collect(),
        })
    }

    /// Cancels dead-letter sends and reply enqueues still in flight.
    pub fn cancel_background(&self) {
        self.background.cancel();
    }

    /// Dead-letter sends and reply enqueues not yet finished.
    pub fn background_in_flight(&self) -> usize {
        self.background.in_flight()
    }

    /// Waits for background work submitted so far.
    pub async fn wait_background(&self) {
        self.background.wait().await;
    }
}
