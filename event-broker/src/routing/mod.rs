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

//! Routing layer.
//!
//! Pure matching policy: decides which triggers of a snapshot an event is routed to.
//! Nothing in here touches shared state or performs I/O.
//!
//! ```
//! use event_broker::{matches, AttributeFilter, EventEnvelope};
//!
//! let event = EventEnvelope::builder("1", "bar", "foo").build().unwrap();
//! let filter: AttributeFilter = [("Type", "foo")].into_iter().collect();
//! assert!(matches(&event, &filter));
//! ```

pub mod filter;
pub(crate) mod selection;
