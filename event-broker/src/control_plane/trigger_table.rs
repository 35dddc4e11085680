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

//! Copy-on-write store of the broker config and active trigger set.

use crate::control_plane::broker_config::BrokerConfig;
use crate::control_plane::trigger::Trigger;
use crate::error::BrokerError;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Immutable point-in-time view of the table.
///
/// Triggers are keyed and iterated by name.
#[derive(Debug, Clone, Default)]
pub struct TableSnapshot {
    generation: u64,
    config: Arc<BrokerConfig>,
    triggers: BTreeMap<String, Arc<Trigger>>,
}

impl TableSnapshot {
    /// Number of mutations applied to the table when this snapshot was taken.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn trigger(&self, name: &str) -> Option<&Arc<Trigger>> {
        self.triggers.get(name)
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Arc<Trigger>> {
        self.triggers.values()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

/// Owned routing state of one broker.
///
/// Mutators hold the write lock only while swapping in a new snapshot; a snapshot
/// still held by a dispatcher is cloned instead of modified in place, so readers
/// never observe a partial update.
#[derive(Debug, Default)]
pub struct TriggerTable {
    current: RwLock<Arc<TableSnapshot>>,
}

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(TableSnapshot {
                config: Arc::new(config),
                ..Default::default()
            })),
        }
    }

    /// Returns the current snapshot. Repeated calls without an intervening mutation
    /// return the same snapshot.
    pub fn snapshot(&self) -> Result<Arc<TableSnapshot>, BrokerError> {
        self.current
            .read()
            .map(|current| Arc::clone(&current))
            .map_err(|err| BrokerError::SnapshotUnavailable(err.to_string()))
    }

    pub fn replace_config(&self, config: BrokerConfig) -> Result<(), BrokerError> {
        self.mutate(|snapshot| {
            snapshot.config = Arc::new(config);
        })
    }

    /// Inserts or replaces the trigger stored under its name.
    pub fn upsert_trigger(&self, trigger: Trigger) -> Result<(), BrokerError> {
        self.mutate(|snapshot| {
            snapshot
                .triggers
                .insert(trigger.name().to_string(), Arc::new(trigger));
        })
    }

    /// Removes a trigger. Returns `false` when no trigger of that name existed.
    pub fn remove_trigger(&self, name: &str) -> Result<bool, BrokerError> {
        let mut removed = false;
        self.mutate(|snapshot| {
            removed = snapshot.triggers.remove(name).is_some();
        })?;
        Ok(removed)
    }

    /// Replaces config and trigger set in one step.
    pub fn replace_all(
        &self,
        config: BrokerConfig,
        triggers: impl IntoIterator<Item = Trigger>,
    ) -> Result<(), BrokerError> {
        let triggers: BTreeMap<_, _> = triggers
            .into_iter()
            .map(|trigger| (trigger.name().to_string(), Arc::new(trigger)))
            .collect();
        self.mutate(|snapshot| {
            snapshot.config = Arc::new(config);
            snapshot.triggers = triggers;
        })
    }

    fn mutate(&self, apply: impl FnOnce(&mut TableSnapshot)) -> Result<(), BrokerError> {
        let mut current = self
            .current
            .write()
            .map_err(|err| BrokerError::SnapshotUnavailable(err.to_string()))?;
        let next = Arc::make_mut(&mut *current);
        apply(next);
        next.generation += 1;
        Ok(())
    }
}
