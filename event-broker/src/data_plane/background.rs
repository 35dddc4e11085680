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

//! Bounded pool for fire-and-forget work (dead-letter sends, reply enqueue).

use crate::observability::events;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::warn;

const COMPONENT: &str = "background";

#[derive(Debug, Clone)]
pub(crate) struct BackgroundTasks {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl BackgroundTasks {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(limit.max(1))),
            cancel: CancellationToken::new(),
        }
    }

    /// Submits `task` unless the pool is full or shutting down. Rejected work is
    /// logged and dropped.
    pub(crate) fn spawn<F, Fut>(&self, kind: &'static str, task: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            warn!(
                event = events::BACKGROUND_TASK_REJECTED,
                component = COMPONENT,
                kind,
                reason = "shutting_down",
                "background task dropped"
            );
            return false;
        }

        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    event = events::BACKGROUND_TASK_REJECTED,
                    component = COMPONENT,
                    kind,
                    reason = "pool_full",
                    in_flight = self.tracker.len(),
                    "background task dropped"
                );
                return false;
            }
        };

        let work = task(self.cancel.child_token());
        self.tracker.spawn(async move {
            let _permit = permit;
            work.await;
        });
        true
    }

    /// Signals every running task to wind down. New submissions are rejected.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until every submitted task has finished.
    pub(crate) async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}
