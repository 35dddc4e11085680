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

//! Stable tracing event names and field formatting helpers.
//!
//! Every structured log line in the broker carries `event = events::...` and
//! `component = ...` so downstream log pipelines can key on them regardless of the
//! human-readable message.

pub mod events;
pub mod fields;
