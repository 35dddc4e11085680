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

use event_broker::{
    BrokerError, BrokerSettings, ConfigFeed, EventBroker, LifecycleConfig, LifecycleState,
    TriggerSpec, READY_PATH,
};
use integration_test_utils::{init_tracing, Response, ScriptedClient};
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

struct Running {
    broker: Arc<EventBroker>,
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), BrokerError>>,
}

async fn start(client: Arc<ScriptedClient>, drain_timeout: Duration) -> Running {
    init_tracing();
    let settings = BrokerSettings {
        lifecycle: LifecycleConfig { drain_timeout },
        ..Default::default()
    };
    let broker = Arc::new(EventBroker::new("default", client, settings));
    broker
        .feed()
        .on_trigger_upsert(
            "all",
            &TriggerSpec {
                subscriber_uri: Some("http://all.example".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    assert_eq!(broker.state(), LifecycleState::Created);
    assert!(!broker.readiness().is_ready());

    let handle = {
        let broker = broker.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { broker.run(listener, shutdown).await })
    };
    let mut state = broker.subscribe_state();
    tokio::time::timeout(WAIT, state.wait_for(|state| *state == LifecycleState::Ready))
        .await
        .expect("broker became ready")
        .unwrap();

    Running {
        broker,
        addr,
        shutdown,
        handle,
    }
}

fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(WAIT)
        .no_proxy()
        .build()
        .unwrap()
}

async fn post_event(client: &reqwest::Client, addr: SocketAddr, id: &str) -> StatusCode {
    client
        .post(format!("http://{addr}/"))
        .header("ce-specversion", "1.0")
        .header("ce-id", id)
        .header("ce-source", "/lifecycle")
        .header("ce-type", "foo")
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn serves_until_shutdown_then_stops_cleanly() {
    let client = Arc::new(ScriptedClient::new());
    let running = start(client.clone(), Duration::from_secs(5)).await;
    let http = http();

    let ready = http
        .get(format!("http://{}{READY_PATH}", running.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    assert!(running.broker.readiness().is_ready());

    assert_eq!(post_event(&http, running.addr, "e1").await, StatusCode::ACCEPTED);
    assert_eq!(client.attempts_to("http://all.example"), 1);

    let mut state = running.broker.subscribe_state();
    running.shutdown.cancel();
    state
        .wait_for(|state| *state != LifecycleState::Ready)
        .await
        .unwrap();
    assert!(!running.broker.readiness().is_ready());

    running.handle.await.unwrap().unwrap();
    assert_eq!(running.broker.state(), LifecycleState::Stopped);
    assert!(!running.broker.readiness().is_ready());
}

#[tokio::test]
async fn second_run_is_rejected() {
    let running = start(Arc::new(ScriptedClient::new()), Duration::from_secs(5)).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let err = running
        .broker
        .run(listener, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::AlreadyStarted(_)));

    running.shutdown.cancel();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn slow_in_flight_delivery_hits_the_drain_timeout() {
    let client = Arc::new(ScriptedClient::new());
    client.script("http://all.example", [Response::Slow(Duration::from_secs(30))]);
    let running = start(client.clone(), Duration::from_millis(200)).await;

    let addr = running.addr;
    let in_flight = tokio::spawn(async move { post_event(&http(), addr, "slow").await });
    assert!(
        client
            .wait_until(WAIT, |c| c.attempts_to("http://all.example") == 1)
            .await
    );

    running.shutdown.cancel();
    let err = tokio::time::timeout(WAIT, running.handle)
        .await
        .expect("bounded drain")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, BrokerError::ShutdownTimeout { .. }));
    assert_eq!(running.broker.state(), LifecycleState::Stopped);

    in_flight.abort();
}
