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

//! API layer.
//!
//! Value types and seams shared by every other layer: the event envelope, its HTTP
//! binding, the delivery client contract and the retry parameters passed across it.

pub mod delivery;
pub mod event;
pub mod http_binding;
pub mod retry;
