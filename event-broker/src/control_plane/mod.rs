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

//! Control-plane layer.
//!
//! Owns the broker's routing state and the feed boundary that validates updates
//! before they reach it. Every update is applied as a whole-snapshot swap, so a
//! dispatch in progress keeps the view it started with.
//!
//! ```
//! use std::sync::Arc;
//! use event_broker::{ConfigFeed, TableFeed, TriggerSpec, TriggerTable};
//!
//! let table = Arc::new(TriggerTable::new());
//! let feed = TableFeed::new("default", table.clone());
//!
//! let spec = TriggerSpec {
//!     subscriber_uri: Some("http://subscriber.example".to_string()),
//!     ..Default::default()
//! };
//! feed.on_trigger_upsert("all-events", &spec).unwrap();
//! assert_eq!(table.snapshot().unwrap().len(), 1);
//!
//! feed.on_trigger_remove("all-events").unwrap();
//! assert!(table.snapshot().unwrap().is_empty());
//! ```

pub(crate) mod broker_config;
pub(crate) mod config_feed;
pub(crate) mod trigger;
pub(crate) mod trigger_table;
