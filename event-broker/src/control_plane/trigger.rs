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

//! Trigger objects: the raw control-plane shape and the resolved routing rule.

use crate::api::delivery::DeliveryAddress;
use crate::error::ConfigError;
use crate::routing::filter::AttributeFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Trigger object as pushed by the control plane.
///
/// `subscriber_uri` is `None` until the control plane has resolved the subscriber
/// reference to an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSpec {
    /// Name of the broker this trigger is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_uri: Option<String>,
}

/// A resolved routing rule: events matching `filter` go to `subscriber`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    name: String,
    filter: AttributeFilter,
    subscriber: DeliveryAddress,
}

impl Trigger {
    pub fn new(
        name: impl Into<String>,
        filter: AttributeFilter,
        subscriber: DeliveryAddress,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyTriggerName);
        }
        if filter.iter().any(|(attribute, _)| attribute.is_empty()) {
            return Err(ConfigError::EmptyFilterAttribute { trigger: name });
        }
        Ok(Self {
            name,
            filter,
            subscriber,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> &AttributeFilter {
        &self.filter
    }

    pub fn subscriber(&self) -> &DeliveryAddress {
        &self.subscriber
    }
}

impl TriggerSpec {
    /// Resolves this trigger object into a [`Trigger`].
    ///
    /// Returns `Ok(None)` while the subscriber is unresolved: such a trigger is not
    /// eligible for routing.
    pub fn resolve(&self, name: &str) -> Result<Option<Trigger>, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::EmptyTriggerName);
        }
        if let Some(filter) = &self.filter {
            check_filter_names(name, &filter.attributes)?;
        }
        let Some(uri) = self.subscriber_uri.as_deref().filter(|uri| !uri.is_empty()) else {
            return Ok(None);
        };
        let subscriber = DeliveryAddress::parse("subscriberUri", uri)?;
        let filter = self
            .filter
            .as_ref()
            .map(|filter| AttributeFilter::from_attributes(filter.attributes.clone()))
            .unwrap_or_default();
        Trigger::new(name, filter, subscriber).map(Some)
    }
}

/// Attribute names compare case-insensitively, so `Type` and `type` must agree.
fn check_filter_names(
    trigger: &str,
    attributes: &BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for (name, value) in attributes {
        let lowered = name.to_ascii_lowercase();
        match seen.insert(lowered.clone(), value.as_str()) {
            Some(previous) if previous != value.as_str() => {
                return Err(ConfigError::ConflictingFilterAttribute {
                    trigger: trigger.to_string(),
                    attribute: lowered,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(uri: Option<&str>, attributes: &[(&str, &str)]) -> TriggerSpec {
        TriggerSpec {
            broker: Some("default".to_string()),
            filter: Some(FilterSpec {
                attributes: attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }),
            subscriber_uri: uri.map(str::to_string),
        }
    }

    #[test]
    fn resolve_lowercases_filter_attributes() {
        let trigger = spec(Some("http://sub.example"), &[("Type", "foo")])
            .resolve("t1")
            .expect("valid")
            .expect("resolved");
        assert_eq!(trigger.name(), "t1");
        assert_eq!(trigger.filter().iter().collect::<Vec<_>>(), vec![("type", "foo")]);
        assert_eq!(trigger.subscriber().as_str(), "http://sub.example");
    }

    #[test]
    fn same_attribute_in_different_case_with_equal_values_is_kept_once() {
        let trigger = spec(Some("http://sub.example"), &[("TYPE", "foo"), ("type", "foo")])
            .resolve("t1")
            .expect("valid")
            .expect("resolved");
        assert_eq!(trigger.filter().iter().collect::<Vec<_>>(), vec![("type", "foo")]);
    }

    #[test]
    fn unresolved_subscriber_yields_none() {
        assert_eq!(spec(None, &[]).resolve("t1"), Ok(None));
        assert_eq!(spec(Some(""), &[]).resolve("t1"), Ok(None));
    }

    #[test]
    fn invalid_specs_are_rejected() {
        assert_eq!(
            spec(Some("http://sub.example"), &[]).resolve(""),
            Err(ConfigError::EmptyTriggerName)
        );
        assert_eq!(
            spec(Some("http://sub.example"), &[("", "x")]).resolve("t1"),
            Err(ConfigError::EmptyFilterAttribute {
                trigger: "t1".to_string()
            })
        );
        assert_eq!(
            spec(Some("http://sub.example"), &[("Type", "a"), ("type", "b")]).resolve("t1"),
            Err(ConfigError::ConflictingFilterAttribute {
                trigger: "t1".to_string(),
                attribute: "type".to_string()
            })
        );
        assert!(matches!(
            spec(Some("sub.example"), &[]).resolve("t1"),
            Err(ConfigError::InvalidUri { field: "subscriberUri", .. })
        ));
    }
}
