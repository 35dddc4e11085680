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

use crate::api::delivery::DeliveryClient;
use crate::api::event::EventEnvelope;
use crate::control_plane::config_feed::TableFeed;
use crate::control_plane::trigger_table::TriggerTable;
use crate::data_plane::dispatcher::{DispatchReport, Dispatcher, DispatcherConfig};
use crate::error::BrokerError;
use crate::runtime::lifecycle::{LifecycleConfig, LifecycleController, LifecycleState};
use crate::runtime::readiness::Readiness;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerSettings {
    pub dispatcher: DispatcherConfig,
    pub lifecycle: LifecycleConfig,
}

/// One broker's dataplane: routing state, its feed, the dispatcher and the
/// lifecycle controller driving both receivers.
pub struct EventBroker {
    name: String,
    table: Arc<TriggerTable>,
    feed: TableFeed,
    dispatcher: Arc<Dispatcher>,
    lifecycle: LifecycleController,
}

impl EventBroker {
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn DeliveryClient>,
        settings: BrokerSettings,
    ) -> Self {
        let name = name.into();
        let table = Arc::new(TriggerTable::new());
        let feed = TableFeed::new(name.clone(), Arc::clone(&table));
        let (dispatcher, replies) =
            Dispatcher::new(Arc::clone(&table), client, settings.dispatcher);
        let lifecycle =
            LifecycleController::new(Arc::clone(&dispatcher), replies, settings.lifecycle);

        debug!(broker = name.as_str(), ?settings, "event broker created");

        Self {
            name,
            table,
            feed,
            dispatcher,
            lifecycle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &Arc<TriggerTable> {
        &self.table
    }

    /// Entry point for control-plane updates scoped to this broker.
    pub fn feed(&self) -> &TableFeed {
        &self.feed
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn readiness(&self) -> Readiness {
        self.lifecycle.readiness()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    pub async fn dispatch(
        &self,
        cancel: &CancellationToken,
        event: EventEnvelope,
    ) -> Result<DispatchReport, BrokerError> {
        self.dispatcher.dispatch(cancel, event).await
    }

    /// Runs both receivers until `shutdown` fires. See [`LifecycleController::run`].
    pub async fn run(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), BrokerError> {
        self.lifecycle.run(listener, shutdown).await
    }
}
