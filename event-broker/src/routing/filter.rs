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

//! Exact-match attribute filter evaluation.

use crate::api::event::EventEnvelope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute name → required value. Names are normalised to lower case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct AttributeFilter {
    attributes: BTreeMap<String, String>,
}

impl AttributeFilter {
    pub fn from_attributes(attributes: BTreeMap<String, String>) -> Self {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl From<BTreeMap<String, String>> for AttributeFilter {
    fn from(attributes: BTreeMap<String, String>) -> Self {
        Self::from_attributes(attributes)
    }
}

impl From<AttributeFilter> for BTreeMap<String, String> {
    fn from(filter: AttributeFilter) -> Self {
        filter.attributes
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeFilter {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_attributes(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// `true` when every attribute in `filter` equals the event's value.
///
/// An attribute the event does not carry resolves to the empty string, so it only
/// matches a filter that explicitly expects `""`.
pub fn matches(event: &EventEnvelope, filter: &AttributeFilter) -> bool {
    filter.iter().all(|(attribute, expected)| {
        let actual = event.attribute(attribute);
        actual.as_deref().unwrap_or_default() == expected
    })
}
