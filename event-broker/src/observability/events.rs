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

pub const INGRESS_RECEIVE: &str = "ingress_receive";
pub const INGRESS_REJECT_MALFORMED: &str = "ingress_reject_malformed";
pub const INGRESS_DISPATCH_FAILED: &str = "ingress_dispatch_failed";

pub const DISPATCH_SNAPSHOT: &str = "dispatch_snapshot";
pub const DISPATCH_MATCH: &str = "dispatch_match";
pub const DISPATCH_NO_MATCH: &str = "dispatch_no_match";
pub const DISPATCH_DELIVERED: &str = "dispatch_delivered";
pub const DISPATCH_UNDELIVERED: &str = "dispatch_undelivered";
pub const DISPATCH_CANCELED: &str = "dispatch_canceled";

pub const DELIVERY_ATTEMPT_FAILED: &str = "delivery_attempt_failed";
pub const DELIVERY_REPLY_MALFORMED: &str = "delivery_reply_malformed";

pub const DEAD_LETTER_SEND: &str = "dead_letter_send";
pub const DEAD_LETTER_FAILED: &str = "dead_letter_failed";

pub const REPLY_ENQUEUE: &str = "reply_enqueue";
pub const REPLY_ENQUEUE_FAILED: &str = "reply_enqueue_failed";
pub const REPLY_RECEIVE: &str = "reply_receive";

pub const BACKGROUND_TASK_REJECTED: &str = "background_task_rejected";

pub const CONFIG_UPDATE: &str = "config_update";
pub const CONFIG_REJECTED: &str = "config_rejected";
pub const TRIGGER_UPSERT: &str = "trigger_upsert";
pub const TRIGGER_IGNORED: &str = "trigger_ignored";
pub const TRIGGER_REMOVE: &str = "trigger_remove";

pub const LIFECYCLE_TRANSITION: &str = "lifecycle_transition";
pub const LIFECYCLE_RECEIVER_EXITED: &str = "lifecycle_receiver_exited";
pub const LIFECYCLE_DRAIN_TIMEOUT: &str = "lifecycle_drain_timeout";
