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
    BrokerSettings, BrokerSpec, ConfigFeed, DeliverySpec, EventBroker, EventEnvelope, FilterSpec,
    LifecycleState, TriggerOutcome, TriggerSpec,
};
use integration_test_utils::{init_tracing, Response, ScriptedClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

fn trigger(subscriber: &str, filter: &[(&str, &str)]) -> TriggerSpec {
    TriggerSpec {
        broker: Some("default".to_string()),
        filter: Some(FilterSpec {
            attributes: filter
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }),
        subscriber_uri: Some(subscriber.to_string()),
    }
}

fn delivery(retry: i64, policy: &str, delay: &str, dead_letter: Option<&str>) -> BrokerSpec {
    BrokerSpec {
        delivery: Some(DeliverySpec {
            retry: Some(retry),
            backoff_policy: Some(policy.to_string()),
            backoff_delay: Some(delay.to_string()),
        }),
        dead_letter_sink_uri: dead_letter.map(str::to_string),
    }
}

fn event(id: &str, ty: &str) -> EventEnvelope {
    EventEnvelope::builder(id, "/test", ty)
        .build()
        .expect("valid event")
}

fn broker(client: &Arc<ScriptedClient>) -> EventBroker {
    init_tracing();
    EventBroker::new("default", client.clone(), BrokerSettings::default())
}

#[tokio::test]
async fn delivers_to_exactly_the_matching_subset() {
    let client = Arc::new(ScriptedClient::new());
    let broker = broker(&client);
    let feed = broker.feed();
    feed.on_trigger_upsert("all", &trigger("http://all.example", &[]))
        .unwrap();
    feed.on_trigger_upsert("foo", &trigger("http://foo.example", &[("type", "foo")]))
        .unwrap();
    feed.on_trigger_upsert(
        "foo-x",
        &trigger("http://foo-x.example", &[("type", "foo"), ("subject", "x")]),
    )
    .unwrap();
    feed.on_trigger_upsert("bar", &trigger("http://bar.example", &[("type", "bar")]))
        .unwrap();

    let report = broker
        .dispatch(&CancellationToken::new(), event("e1", "foo"))
        .await
        .unwrap();

    assert_eq!(report.matched(), 2);
    assert_eq!(report.delivered(), 2);
    assert_eq!(client.attempts_to("http://all.example"), 1);
    assert_eq!(client.attempts_to("http://foo.example"), 1);
    assert_eq!(client.attempts_to("http://foo-x.example"), 0);
    assert_eq!(client.attempts_to("http://bar.example"), 0);
}

#[tokio::test]
async fn retries_until_the_fourth_attempt_succeeds() {
    let client = Arc::new(ScriptedClient::new());
    let broker = broker(&client);
    broker
        .feed()
        .on_config_update(&delivery(3, "linear", "PT0.01S", Some("http://dlq.example")))
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("t", &trigger("http://flaky.example", &[]))
        .unwrap();
    client.script(
        "http://flaky.example",
        [
            Response::Fail("503".to_string()),
            Response::Fail("503".to_string()),
            Response::Fail("503".to_string()),
        ],
    );

    let report = broker
        .dispatch(&CancellationToken::new(), event("e1", "foo"))
        .await
        .unwrap();

    assert_eq!(
        report.outcome("t"),
        Some(TriggerOutcome::Delivered { replied: false })
    );
    let attempts: Vec<u32> = client.attempts().iter().map(|a| a.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3, 4]);

    broker.dispatcher().wait_background().await;
    assert!(client.sends_to("http://dlq.example").is_empty());
}

#[tokio::test]
async fn exhausted_delivery_is_dead_lettered_once_per_trigger() {
    let client = Arc::new(ScriptedClient::new());
    let broker = broker(&client);
    broker
        .feed()
        .on_config_update(&delivery(1, "exponential", "PT0.005S", Some("http://dlq.example")))
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("down-a", &trigger("http://down-a.example", &[]))
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("down-b", &trigger("http://down-b.example", &[]))
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("up", &trigger("http://up.example", &[]))
        .unwrap();
    for target in ["http://down-a.example", "http://down-b.example"] {
        client.script(
            target,
            [
                Response::Fail("unavailable".to_string()),
                Response::Fail("unavailable".to_string()),
            ],
        );
    }

    let report = broker
        .dispatch(&CancellationToken::new(), event("e1", "foo"))
        .await
        .unwrap();

    assert_eq!(report.undelivered(), 2);
    assert_eq!(report.delivered(), 1);
    assert_eq!(
        report.outcome("down-a"),
        Some(TriggerOutcome::Undelivered {
            dead_lettered: true
        })
    );
    assert_eq!(client.attempts_to("http://down-a.example"), 2);

    broker.dispatcher().wait_background().await;
    let dead_lettered = client.sends_to("http://dlq.example");
    assert_eq!(dead_lettered.len(), 2);
    assert!(dead_lettered.iter().all(|sent| sent == &event("e1", "foo")));
}

#[tokio::test]
async fn terminal_rejection_skips_remaining_retries() {
    let client = Arc::new(ScriptedClient::new());
    let broker = broker(&client);
    broker
        .feed()
        .on_config_update(&delivery(5, "linear", "PT0.01S", None))
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("t", &trigger("http://strict.example", &[]))
        .unwrap();
    client.script(
        "http://strict.example",
        [Response::Reject("400 bad request".to_string())],
    );

    let report = broker
        .dispatch(&CancellationToken::new(), event("e1", "foo"))
        .await
        .unwrap();

    assert_eq!(
        report.outcome("t"),
        Some(TriggerOutcome::Undelivered {
            dead_lettered: false
        })
    );
    assert_eq!(client.attempts_to("http://strict.example"), 1);
}

#[tokio::test]
async fn dead_letter_failure_is_absorbed() {
    let client = Arc::new(ScriptedClient::new());
    let broker = broker(&client);
    broker
        .feed()
        .on_config_update(&BrokerSpec {
            delivery: None,
            dead_letter_sink_uri: Some("http://dlq.example".to_string()),
        })
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("t", &trigger("http://down.example", &[]))
        .unwrap();
    client.script("http://down.example", [Response::Fail("down".to_string())]);
    client.fail_sends_to("http://dlq.example");

    // no delivery policy: a single attempt
    let report = broker
        .dispatch(&CancellationToken::new(), event("e1", "foo"))
        .await
        .unwrap();
    assert_eq!(report.undelivered(), 1);
    assert_eq!(client.attempts_to("http://down.example"), 1);

    broker.dispatcher().wait_background().await;
    assert_eq!(client.sends_to("http://dlq.example").len(), 1);
}

#[tokio::test]
async fn removal_during_dispatch_does_not_affect_the_running_pass() {
    let client = Arc::new(ScriptedClient::new());
    let broker = Arc::new(broker(&client));
    broker
        .feed()
        .on_config_update(&delivery(1, "linear", "PT0.1S", None))
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("t", &trigger("http://slow.example", &[]))
        .unwrap();
    client.script("http://slow.example", [Response::Fail("busy".to_string())]);

    let dispatching = {
        let broker = broker.clone();
        tokio::spawn(async move {
            broker
                .dispatch(&CancellationToken::new(), event("e1", "foo"))
                .await
        })
    };

    assert!(
        client
            .wait_until(WAIT, |c| c.attempts_to("http://slow.example") == 1)
            .await
    );
    broker.feed().on_trigger_remove("t").unwrap();

    let report = dispatching.await.unwrap().unwrap();
    assert_eq!(
        report.outcome("t"),
        Some(TriggerOutcome::Delivered { replied: false })
    );
    assert_eq!(client.attempts_to("http://slow.example"), 2);

    let report = broker
        .dispatch(&CancellationToken::new(), event("e2", "foo"))
        .await
        .unwrap();
    assert_eq!(report.matched(), 0);
}

#[tokio::test]
async fn cancellation_abandons_retries_without_dead_lettering() {
    let client = Arc::new(ScriptedClient::new());
    let broker = Arc::new(broker(&client));
    broker
        .feed()
        .on_config_update(&delivery(5, "linear", "PT10S", Some("http://dlq.example")))
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("t", &trigger("http://down.example", &[]))
        .unwrap();
    client.script("http://down.example", [Response::Fail("down".to_string())]);

    let cancel = CancellationToken::new();
    let dispatching = {
        let broker = broker.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { broker.dispatch(&cancel, event("e1", "foo")).await })
    };

    assert!(
        client
            .wait_until(WAIT, |c| c.attempts_to("http://down.example") == 1)
            .await
    );
    cancel.cancel();

    let report = tokio::time::timeout(WAIT, dispatching)
        .await
        .expect("dispatch finished")
        .unwrap()
        .unwrap();
    assert_eq!(report.outcome("t"), Some(TriggerOutcome::Canceled));
    broker.dispatcher().wait_background().await;
    assert!(client.sends().is_empty());
}

#[tokio::test]
async fn replies_are_reingested_exactly_once() {
    let client = Arc::new(ScriptedClient::new());
    let broker = Arc::new(broker(&client));
    broker
        .feed()
        .on_trigger_upsert(
            "orders",
            &trigger("http://orders.example", &[("type", "order.created")]),
        )
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert(
            "audit",
            &trigger("http://audit.example", &[("type", "order.confirmed")]),
        )
        .unwrap();

    let reply = EventEnvelope::builder("r-1", "/orders", "order.confirmed")
        .subject("order-42")
        .extension("tenant", "acme")
        .data(&b"{\"ok\":true}"[..])
        .build()
        .unwrap();
    client.script("http://orders.example", [Response::Reply(reply.clone())]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shutdown = CancellationToken::new();
    let running = {
        let broker = broker.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { broker.run(listener, shutdown).await })
    };
    let mut state = broker.subscribe_state();
    state
        .wait_for(|state| *state == LifecycleState::Ready)
        .await
        .unwrap();

    let report = broker
        .dispatch(&CancellationToken::new(), event("o-1", "order.created"))
        .await
        .unwrap();
    assert_eq!(
        report.outcome("orders"),
        Some(TriggerOutcome::Delivered { replied: true })
    );

    assert!(
        client
            .wait_until(WAIT, |c| c.attempts_to("http://audit.example") == 1)
            .await
    );
    // give a duplicate a chance to show up
    tokio::time::sleep(Duration::from_millis(50)).await;
    let audited: Vec<_> = client
        .attempts()
        .into_iter()
        .filter(|attempt| attempt.target == "http://audit.example")
        .collect();
    assert_eq!(audited.len(), 1);
    assert_eq!(audited[0].event, reply);

    shutdown.cancel();
    running.await.unwrap().unwrap();
    assert_eq!(broker.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn replies_without_a_payload_are_still_reingested() {
    let client = Arc::new(ScriptedClient::new());
    let broker = Arc::new(broker(&client));
    broker
        .feed()
        .on_trigger_upsert("orders", &trigger("http://orders.example", &[("type", "order.created")]))
        .unwrap();
    broker
        .feed()
        .on_trigger_upsert("acks", &trigger("http://acks.example", &[("type", "order.ack")]))
        .unwrap();

    let reply = EventEnvelope::builder("r-2", "/orders", "order.ack")
        .build()
        .unwrap();
    assert!(reply.data().is_none());
    client.script("http://orders.example", [Response::Reply(reply.clone())]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shutdown = CancellationToken::new();
    let running = {
        let broker = broker.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { broker.run(listener, shutdown).await })
    };
    let mut state = broker.subscribe_state();
    state
        .wait_for(|state| *state == LifecycleState::Ready)
        .await
        .unwrap();

    let report = broker
        .dispatch(&CancellationToken::new(), event("o-2", "order.created"))
        .await
        .unwrap();
    assert_eq!(
        report.outcome("orders"),
        Some(TriggerOutcome::Delivered { replied: true })
    );
    assert!(
        client
            .wait_until(WAIT, |c| c.attempts_to("http://acks.example") == 1)
            .await
    );

    shutdown.cancel();
    running.await.unwrap().unwrap();
}
