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

//! Trigger selection for one event against one snapshot.

use crate::api::event::EventEnvelope;
use crate::control_plane::trigger::Trigger;
use crate::control_plane::trigger_table::TableSnapshot;
use crate::observability::{events, fields};
use crate::routing::filter::matches;
use std::sync::Arc;
use tracing::trace;

const COMPONENT: &str = "selection";

/// Returns the triggers of `snapshot` whose filter matches `event`, ordered by name.
pub(crate) fn select_triggers(snapshot: &TableSnapshot, event: &EventEnvelope) -> Vec<Arc<Trigger>> {
    snapshot
        .triggers()
        .filter(|trigger| {
            let matched = matches(event, trigger.filter());
            let outcome = if matched {
                events::DISPATCH_MATCH
            } else {
                events::DISPATCH_NO_MATCH
            };
            trace!(
                event = outcome,
                component = COMPONENT,
                trigger = trigger.name(),
                filter = %fields::format_filter(trigger.filter()),
                "evaluated trigger filter"
            );
            matched
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::select_triggers;
    use crate::api::delivery::DeliveryAddress;
    use crate::api::event::EventEnvelope;
    use crate::control_plane::broker_config::BrokerConfig;
    use crate::control_plane::trigger::Trigger;
    use crate::control_plane::trigger_table::TriggerTable;
    use crate::routing::filter::AttributeFilter;

    fn trigger(name: &str, filter: &[(&str, &str)]) -> Trigger {
        Trigger::new(
            name,
            filter.iter().copied().collect::<AttributeFilter>(),
            DeliveryAddress::parse("subscriber", "http://sub.example").expect("address"),
        )
        .expect("trigger")
    }

    #[test]
    fn selects_exactly_the_matching_subset_in_name_order() {
        let table = TriggerTable::new();
        table
            .replace_all(
                BrokerConfig::default(),
                vec![
                    trigger("z-all", &[]),
                    trigger("a-type", &[("type", "foo")]),
                    trigger("m-subject", &[("type", "foo"), ("subject", "x")]),
                    trigger("b-other", &[("type", "bar")]),
                ],
            )
            .expect("replace");

        let event = EventEnvelope::builder("1", "bar", "foo").build().expect("event");
        let snapshot = table.snapshot().expect("snapshot");
        let selected: Vec<_> = select_triggers(&snapshot, &event)
            .iter()
            .map(|trigger| trigger.name().to_string())
            .collect();

        assert_eq!(selected, vec!["a-type", "z-all"]);
    }
}
