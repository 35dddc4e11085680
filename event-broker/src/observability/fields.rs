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

use crate::api::event::EventEnvelope;
use crate::routing::filter::AttributeFilter;

/// `source/id`, the pair that identifies an event across hops.
pub fn format_event_key(event: &EventEnvelope) -> String {
    format!("{}/{}", event.source(), event.id())
}

/// Renders a filter as `{a=b, c=d}` in attribute order.
pub fn format_filter(filter: &AttributeFilter) -> String {
    let pairs: Vec<String> = filter
        .iter()
        .map(|(attribute, expected)| format!("{attribute}={expected}"))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

pub fn format_optional(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
