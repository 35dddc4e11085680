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

//! Runtime integration layer.
//!
//! Task spawning, readiness and shutdown ordering live here so the rest of the crate
//! stays free of process-lifecycle concerns.
//!
//! ```
//! use event_broker::{LifecycleState, Readiness};
//!
//! let readiness = Readiness::new();
//! assert!(!readiness.is_ready());
//! assert_eq!(LifecycleState::Draining.to_string(), "draining");
//! ```

pub(crate) mod lifecycle;
pub(crate) mod readiness;
