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

//! Control-plane feed boundary.

use crate::control_plane::broker_config::{BrokerConfig, BrokerSpec};
use crate::control_plane::trigger::TriggerSpec;
use crate::control_plane::trigger_table::TriggerTable;
use crate::error::BrokerError;
use crate::observability::events;
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "config_feed";

/// Receiver of control-plane updates. Callable from any task or thread.
///
/// A rejected update leaves the previous state serving traffic.
pub trait ConfigFeed: Send + Sync {
    fn on_config_update(&self, spec: &BrokerSpec) -> Result<(), BrokerError>;

    fn on_trigger_upsert(&self, name: &str, spec: &TriggerSpec) -> Result<(), BrokerError>;

    fn on_trigger_remove(&self, name: &str) -> Result<(), BrokerError>;
}

/// Validates updates for one broker and applies them to its [`TriggerTable`].
#[derive(Debug, Clone)]
pub struct TableFeed {
    broker: String,
    table: Arc<TriggerTable>,
}

impl TableFeed {
    pub fn new(broker: impl Into<String>, table: Arc<TriggerTable>) -> Self {
        Self {
            broker: broker.into(),
            table,
        }
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    fn reject(&self, what: &'static str, name: &str, err: BrokerError) -> BrokerError {
        warn!(
            event = events::CONFIG_REJECTED,
            component = COMPONENT,
            broker = self.broker.as_str(),
            what,
            name,
            err = %err,
            "rejected control-plane update"
        );
        err
    }
}

impl ConfigFeed for TableFeed {
    fn on_config_update(&self, spec: &BrokerSpec) -> Result<(), BrokerError> {
        let config = BrokerConfig::from_spec(spec)
            .map_err(|err| self.reject("broker", &self.broker, err.into()))?;
        let retry = config.retry_policy();
        self.table.replace_config(config)?;
        info!(
            event = events::CONFIG_UPDATE,
            component = COMPONENT,
            broker = self.broker.as_str(),
            retries = retry.retries,
            backoff = %retry.backoff,
            delay = ?retry.delay,
            "broker config updated"
        );
        Ok(())
    }

    fn on_trigger_upsert(&self, name: &str, spec: &TriggerSpec) -> Result<(), BrokerError> {
        if let Some(broker) = spec.broker.as_deref() {
            if broker != self.broker {
                let removed = self.table.remove_trigger(name)?;
                debug!(
                    event = events::TRIGGER_IGNORED,
                    component = COMPONENT,
                    broker = self.broker.as_str(),
                    trigger = name,
                    trigger_broker = broker,
                    removed,
                    reason = "other_broker",
                    "ignoring trigger bound to another broker"
                );
                return Ok(());
            }
        }

        let resolved = spec
            .resolve(name)
            .map_err(|err| self.reject("trigger", name, err.into()))?;
        match resolved {
            Some(trigger) => {
                info!(
                    event = events::TRIGGER_UPSERT,
                    component = COMPONENT,
                    broker = self.broker.as_str(),
                    trigger = name,
                    subscriber = %trigger.subscriber(),
                    filter = %crate::observability::fields::format_filter(trigger.filter()),
                    "trigger upserted"
                );
                self.table.upsert_trigger(trigger)
            }
            None => {
                let removed = self.table.remove_trigger(name)?;
                debug!(
                    event = events::TRIGGER_IGNORED,
                    component = COMPONENT,
                    broker = self.broker.as_str(),
                    trigger = name,
                    removed,
                    reason = "subscriber_unresolved",
                    "trigger has no resolved subscriber"
                );
                Ok(())
            }
        }
    }

    fn on_trigger_remove(&self, name: &str) -> Result<(), BrokerError> {
        let removed = self.table.remove_trigger(name)?;
        info!(
            event = events::TRIGGER_REMOVE,
            component = COMPONENT,
            broker = self.broker.as_str(),
            trigger = name,
            removed,
            "trigger removed"
        );
        Ok(())
    }
}
