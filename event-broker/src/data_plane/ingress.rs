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

//! HTTP ingress: event submission plus liveness and readiness probes.

use crate::api::http_binding;
use crate::data_plane::dispatcher::Dispatcher;
use crate::observability::{events, fields};
use crate::runtime::readiness::Readiness;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const COMPONENT: &str = "ingress";

pub(crate) const RECEIVER_NAME: &str = "ingress";

pub const HEALTH_PATH: &str = "/healthz";
pub const READY_PATH: &str = "/readyz";

#[derive(Clone)]
struct IngressState {
    dispatcher: Arc<Dispatcher>,
    readiness: Readiness,
    cancel: CancellationToken,
}

/// Router serving `POST /`, [`HEALTH_PATH`] and [`READY_PATH`].
///
/// Deliveries started by accepted events observe `cancel`.
pub fn ingress_router(
    dispatcher: Arc<Dispatcher>,
    readiness: Readiness,
    cancel: CancellationToken,
) -> Router {
    Router::new()
        .route("/", post(receive_event))
        .route(HEALTH_PATH, get(healthz))
        .route(READY_PATH, get(readyz))
        .with_state(IngressState {
            dispatcher,
            readiness,
            cancel,
        })
}

async fn receive_event(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let event = match http_binding::decode(&headers, body) {
        Ok(event) => event,
        Err(err) => {
            warn!(
                event = events::INGRESS_REJECT_MALFORMED,
                component = COMPONENT,
                err = %err,
                "rejecting malformed event"
            );
            return (StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    debug!(
        event = events::INGRESS_RECEIVE,
        component = COMPONENT,
        event_key = %fields::format_event_key(&event),
        event_type = event.ty(),
        "event received"
    );

    match state.dispatcher.dispatch(&state.cancel, event).await {
        Ok(_) => (StatusCode::ACCEPTED, String::new()),
        Err(err) => {
            error!(
                event = events::INGRESS_DISPATCH_FAILED,
                component = COMPONENT,
                err = %err,
                "dispatch failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State(state): State<IngressState>) -> StatusCode {
    if state.readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
