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

//! In-process loopback that feeds subscriber replies back into the dispatcher.

use crate::api::event::EventEnvelope;
use crate::data_plane::dispatcher::Dispatcher;
use crate::error::BrokerError;
use crate::observability::{events, fields};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

const COMPONENT: &str = "reply_channel";

pub(crate) const RECEIVER_NAME: &str = "reply";

pub(crate) fn reply_channel(capacity: usize) -> (ReplySender, ReplyReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ReplySender { tx }, ReplyReceiver { rx })
}

#[derive(Debug, Clone)]
pub(crate) struct ReplySender {
    tx: mpsc::Sender<EventEnvelope>,
}

impl ReplySender {
    /// Enqueues `reply`, waiting for queue capacity until `cancel` fires. Failures
    /// are logged and the reply is dropped.
    pub(crate) async fn enqueue(&self, cancel: &CancellationToken, reply: EventEnvelope) -> bool {
        let key = fields::format_event_key(&reply);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err("shutting_down".to_string()),
            sent = self.tx.send(reply) => sent.map_err(|err| err.to_string()),
        };

        match result {
            Ok(()) => {
                debug!(
                    event = events::REPLY_ENQUEUE,
                    component = COMPONENT,
                    reply = key.as_str(),
                    "reply enqueued for re-ingestion"
                );
                true
            }
            Err(reason) => {
                warn!(
                    event = events::REPLY_ENQUEUE_FAILED,
                    component = COMPONENT,
                    reply = key.as_str(),
                    reason = reason.as_str(),
                    "dropping reply"
                );
                false
            }
        }
    }
}

/// Receiving half of the loopback; runs as one of the broker's two receivers.
#[derive(Debug)]
pub struct ReplyReceiver {
    rx: mpsc::Receiver<EventEnvelope>,
}

impl ReplyReceiver {
    /// Dispatches every received reply on its own task until `cancel` fires, then
    /// waits for those dispatches to finish.
    pub(crate) async fn run(
        mut self,
        dispatcher: Arc<Dispatcher>,
        cancel: CancellationToken,
    ) -> Result<(), BrokerError> {
        let in_flight = TaskTracker::new();

        let result = loop {
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(()),
                reply = self.rx.recv() => reply,
            };
            let Some(reply) = reply else {
                break Err(BrokerError::ReceiverFailed {
                    receiver: RECEIVER_NAME,
                    reason: "reply channel closed".to_string(),
                });
            };

            info!(
                event = events::REPLY_RECEIVE,
                component = COMPONENT,
                reply = %fields::format_event_key(&reply),
                event_type = reply.ty(),
                "re-ingesting reply"
            );
            let dispatcher = dispatcher.clone();
            let cancel = cancel.clone();
            in_flight.spawn(async move {
                if let Err(err) = dispatcher.dispatch(&cancel, reply).await {
                    warn!(
                        event = events::INGRESS_DISPATCH_FAILED,
                        component = COMPONENT,
                        err = %err,
                        "reply dispatch failed"
                    );
                }
            });
        };

        self.rx.close();
        in_flight.close();
        in_flight.wait().await;
        result
    }
}
