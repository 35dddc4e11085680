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

//! Startup, readiness and bounded graceful shutdown of the two receivers.

use crate::data_plane::dispatcher::Dispatcher;
use crate::data_plane::ingress::{self, ingress_router};
use crate::data_plane::reply_channel::{self, ReplyReceiver};
use crate::error::BrokerError;
use crate::observability::events;
use crate::runtime::readiness::Readiness;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum::Display;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const COMPONENT: &str = "lifecycle";

pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// `Created → Starting → Ready → Draining → Stopped`. One-shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    Created,
    Starting,
    Ready,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Upper bound for receivers and background work to finish once draining.
    pub drain_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

type ReceiverHandle = JoinHandle<Result<(), BrokerError>>;

pub struct LifecycleController {
    dispatcher: Arc<Dispatcher>,
    replies: Mutex<Option<ReplyReceiver>>,
    readiness: Readiness,
    state: watch::Sender<LifecycleState>,
    config: LifecycleConfig,
}

impl LifecycleController {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        replies: ReplyReceiver,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            dispatcher,
            replies: Mutex::new(Some(replies)),
            readiness: Readiness::new(),
            state: watch::Sender::new(LifecycleState::Created),
            config,
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Observes state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Serves ingress on `listener` and the reply loopback until `shutdown` fires
    /// or a receiver fails, then drains within the configured timeout.
    ///
    /// Returns [`BrokerError::ShutdownTimeout`] when draining does not complete in
    /// time, or the first receiver failure.
    pub async fn run(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), BrokerError> {
        let started = self.state.send_if_modified(|state| {
            if *state == LifecycleState::Created {
                *state = LifecycleState::Starting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(BrokerError::AlreadyStarted(self.state().to_string()));
        }
        self.log_transition(LifecycleState::Created, LifecycleState::Starting);

        let replies = self
            .replies
            .lock()
            .map_err(|err| BrokerError::AlreadyStarted(err.to_string()))?
            .take()
            .ok_or_else(|| BrokerError::AlreadyStarted(LifecycleState::Starting.to_string()))?;

        let local_addr = listener.local_addr()?;
        let drain = CancellationToken::new();

        let mut ingress = self.spawn_ingress(listener, drain.clone());
        let mut reply = tokio::spawn(replies.run(Arc::clone(&self.dispatcher), drain.clone()));
        let ingress_abort = ingress.abort_handle();
        let reply_abort = reply.abort_handle();

        self.readiness.set(true);
        self.transition(LifecycleState::Starting, LifecycleState::Ready);
        info!(
            event = events::LIFECYCLE_TRANSITION,
            component = COMPONENT,
            addr = %local_addr,
            "receivers accepting"
        );

        let mut ingress_done = None;
        let mut reply_done = None;
        tokio::select! {
            _ = shutdown.cancelled() => {}
            joined = &mut ingress => {
                ingress_done = Some(exited_early(ingress::RECEIVER_NAME, joined));
            }
            joined = &mut reply => {
                reply_done = Some(exited_early(reply_channel::RECEIVER_NAME, joined));
            }
        }

        self.readiness.set(false);
        self.transition(LifecycleState::Ready, LifecycleState::Draining);
        drain.cancel();
        self.dispatcher.cancel_background();

        let dispatcher = Arc::clone(&self.dispatcher);
        let drained = tokio::time::timeout(self.config.drain_timeout, async move {
            let ingress_result = match ingress_done {
                Some(result) => result,
                None => flatten(ingress::RECEIVER_NAME, ingress.await),
            };
            let reply_result = match reply_done {
                Some(result) => result,
                None => flatten(reply_channel::RECEIVER_NAME, reply.await),
            };
            dispatcher.wait_background().await;
            ingress_result.and(reply_result)
        })
        .await;

        let result = match drained {
            Ok(result) => result,
            Err(_) => {
                ingress_abort.abort();
                reply_abort.abort();
                error!(
                    event = events::LIFECYCLE_DRAIN_TIMEOUT,
                    component = COMPONENT,
                    timeout = ?self.config.drain_timeout,
                    background_in_flight = self.dispatcher.background_in_flight(),
                    "receivers did not stop in time"
                );
                Err(BrokerError::ShutdownTimeout {
                    timeout: self.config.drain_timeout,
                })
            }
        };

        self.transition(LifecycleState::Draining, LifecycleState::Stopped);
        result
    }

    fn spawn_ingress(&self, listener: TcpListener, drain: CancellationToken) -> ReceiverHandle {
        let router = ingress_router(
            Arc::clone(&self.dispatcher),
            self.readiness.clone(),
            drain.clone(),
        );
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { drain.cancelled().await })
                .await
                .map_err(|err| BrokerError::ReceiverFailed {
                    receiver: ingress::RECEIVER_NAME,
                    reason: err.to_string(),
                })
        })
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) {
        self.state.send_replace(to);
        self.log_transition(from, to);
    }

    fn log_transition(&self, from: LifecycleState, to: LifecycleState) {
        info!(
            event = events::LIFECYCLE_TRANSITION,
            component = COMPONENT,
            from = %from,
            to = %to,
            ready = self.readiness.is_ready(),
            "lifecycle transition"
        );
    }
}

fn flatten(
    receiver: &'static str,
    joined: Result<Result<(), BrokerError>, JoinError>,
) -> Result<(), BrokerError> {
    joined.map_err(|err| BrokerError::ReceiverFailed {
        receiver,
        reason: err.to_string(),
    })?
}

/// A receiver finishing before shutdown was requested is always a failure.
fn exited_early(
    receiver: &'static str,
    joined: Result<Result<(), BrokerError>, JoinError>,
) -> Result<(), BrokerError> {
    let err = match flatten(receiver, joined) {
        Ok(()) => BrokerError::ReceiverFailed {
            receiver,
            reason: "exited before shutdown".to_string(),
        },
        Err(err) => err,
    };
    warn!(
        event = events::LIFECYCLE_RECEIVER_EXITED,
        component = COMPONENT,
        receiver,
        err = %err,
        "receiver exited unexpectedly"
    );
    Err(err)
}
