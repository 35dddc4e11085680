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

//! Data-plane layer.
//!
//! Owns the two receivers (HTTP ingress and the reply loopback), the dispatcher
//! they share, and the bounded pool running dead-letter sends and reply enqueues.
//! Per-trigger delivery failures are recovered here and never leave this layer.

pub(crate) mod background;
pub(crate) mod delivery;
pub(crate) mod dispatcher;
pub(crate) mod ingress;
pub(crate) mod reply_channel;
