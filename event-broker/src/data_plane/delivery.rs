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

//! Delivery of one event to one trigger, with dead-letter and reply handoff.

use crate::api::delivery::{DeliveryAddress, DeliveryClient};
use crate::api::event::EventEnvelope;
use crate::api::retry::RetryPolicy;
use crate::control_plane::trigger::Trigger;
use crate::data_plane::background::BackgroundTasks;
use crate::data_plane::reply_channel::ReplySender;
use crate::error::DeliveryError;
use crate::observability::{events, fields};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "delivery";

/// What happened to one (event, trigger) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Delivered { replied: bool },
    Undelivered { dead_lettered: bool },
    Canceled,
}

pub(crate) struct DeliveryContext<'a> {
    pub(crate) client: &'a Arc<dyn DeliveryClient>,
    pub(crate) background: &'a BackgroundTasks,
    pub(crate) replies: &'a ReplySender,
    pub(crate) retry: &'a RetryPolicy,
    pub(crate) dead_letter_sink: Option<&'a DeliveryAddress>,
}

pub(crate) async fn deliver_to_trigger(
    ctx: &DeliveryContext<'_>,
    cancel: &CancellationToken,
    trigger: &Trigger,
    event: &Arc<EventEnvelope>,
) -> TriggerOutcome {
    let result = ctx
        .client
        .request(cancel, trigger.subscriber(), event, ctx.retry)
        .await;

    match result {
        Ok(reply) => {
            info!(
                event = events::DISPATCH_DELIVERED,
                component = COMPONENT,
                trigger = trigger.name(),
                subscriber = %trigger.subscriber(),
                replied = reply.is_some(),
                "event delivered"
            );
            let replied = match reply {
                Some(reply) => hand_off_reply(ctx, reply),
                None => false,
            };
            TriggerOutcome::Delivered { replied }
        }
        Err(DeliveryError::Canceled { attempts }) => {
            info!(
                event = events::DISPATCH_CANCELED,
                component = COMPONENT,
                trigger = trigger.name(),
                subscriber = %trigger.subscriber(),
                attempts,
                "delivery abandoned on shutdown"
            );
            TriggerOutcome::Canceled
        }
        Err(err) => {
            warn!(
                event = events::DISPATCH_UNDELIVERED,
                component = COMPONENT,
                trigger = trigger.name(),
                subscriber = %trigger.subscriber(),
                attempts = err.attempts(),
                dead_letter_sink = fields::format_optional(ctx.dead_letter_sink.map(DeliveryAddress::as_str)),
                err = %err,
                "event undelivered"
            );
            let dead_lettered = match ctx.dead_letter_sink {
                Some(sink) => send_to_dead_letter(ctx, trigger, sink, event),
                None => false,
            };
            TriggerOutcome::Undelivered { dead_lettered }
        }
    }
}

fn send_to_dead_letter(
    ctx: &DeliveryContext<'_>,
    trigger: &Trigger,
    sink: &DeliveryAddress,
    event: &Arc<EventEnvelope>,
) -> bool {
    let client = Arc::clone(ctx.client);
    let sink = sink.clone();
    let event = Arc::clone(event);
    let trigger = trigger.name().to_string();

    ctx.background.spawn("dead_letter", move |cancel| async move {
        match client.send(&cancel, &sink, &event).await {
            Ok(()) => info!(
                event = events::DEAD_LETTER_SEND,
                component = COMPONENT,
                trigger = trigger.as_str(),
                sink = %sink,
                event_key = %fields::format_event_key(&event),
                "event sent to dead-letter sink"
            ),
            Err(err) => warn!(
                event = events::DEAD_LETTER_FAILED,
                component = COMPONENT,
                trigger = trigger.as_str(),
                sink = %sink,
                event_key = %fields::format_event_key(&event),
                err = %err,
                "dead-letter send failed"
            ),
        }
    })
}

fn hand_off_reply(ctx: &DeliveryContext<'_>, reply: EventEnvelope) -> bool {
    debug!(
        event = events::REPLY_ENQUEUE,
        component = COMPONENT,
        reply = %fields::format_event_key(&reply),
        "handing reply to re-ingestion"
    );
    let replies = ctx.replies.clone();
    ctx.background.spawn("reply_enqueue", move |cancel| async move {
        replies.enqueue(&cancel, reply).await;
    })
}
