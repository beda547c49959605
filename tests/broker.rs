//! Broker integration tests.
//!
//! These require a reachable broker and are disabled by default:
//!
//! ```text
//! VIPSERVICE_TEST_BROKER_URL=redis://127.0.0.1:6379 \
//!     cargo test --features test-broker --test broker
//! ```

#![cfg(feature = "test-broker")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use vipservice::lifecycle::startup::{self, Args};
use vipservice::{MessagingClient, Shutdown};

const DELIVERY_DEADLINE: Duration = Duration::from_secs(5);

fn broker_url() -> String {
    std::env::var("VIPSERVICE_TEST_BROKER_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn connected_client() -> MessagingClient {
    let client = MessagingClient::new(&broker_url()).unwrap();
    client.connect().await.unwrap();
    client
}

/// Per-test channel name so parallel tests never share a queue or topic.
fn unique(prefix: &str) -> String {
    format!("{prefix}_test_{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn queue_roundtrip_delivers_payload() {
    let client = connected_client().await;
    let queue = unique("vip_queue");
    let (tx, mut rx) = mpsc::unbounded_channel();

    client
        .subscribe_to_queue(&queue, "vipservice", move |delivery| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(delivery.body);
            }
        })
        .await
        .unwrap();

    client.publish_to_queue(&queue, b"hello vip").await.unwrap();

    let body = timeout(DELIVERY_DEADLINE, rx.recv())
        .await
        .expect("queued message was not delivered")
        .unwrap();
    assert_eq!(body, b"hello vip");

    client.close().await;
}

#[tokio::test]
async fn topic_fans_out_to_every_subscriber() {
    let publisher = connected_client().await;
    let first = connected_client().await;
    let second = connected_client().await;

    let topic = unique("springCloudBus");
    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, mut rx2) = mpsc::unbounded_channel();

    first
        .subscribe_to_topic(&topic, "one", move |delivery| {
            let tx = tx1.clone();
            async move {
                let _ = tx.send(delivery.body);
            }
        })
        .await
        .unwrap();
    second
        .subscribe_to_topic(&topic, "two", move |delivery| {
            let tx = tx2.clone();
            async move {
                let _ = tx.send(delivery.body);
            }
        })
        .await
        .unwrap();

    // Pub/sub drops messages published before a subscription registers.
    tokio::time::sleep(Duration::from_millis(100)).await;
    publisher.publish_to_topic(&topic, b"refresh").await.unwrap();

    for rx in [&mut rx1, &mut rx2] {
        let body = timeout(DELIVERY_DEADLINE, rx.recv())
            .await
            .expect("topic message was not fanned out")
            .unwrap();
        assert_eq!(body, b"refresh");
    }

    publisher.close().await;
    first.close().await;
    second.close().await;
}

#[tokio::test]
async fn ping_tracks_connection_state() {
    let client = connected_client().await;
    assert!(client.ping().await);

    client.close().await;
    assert!(!client.ping().await);
}

#[tokio::test]
async fn close_stops_queue_workers() {
    let client = Arc::new(connected_client().await);
    let queue = unique("vip_queue");
    let (tx, mut rx) = mpsc::unbounded_channel();

    client
        .subscribe_to_queue(&queue, "vipservice", move |delivery| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(delivery.body);
            }
        })
        .await
        .unwrap();

    client.close().await;

    // Publish through a separate client; the worker must not pick it up.
    let publisher = connected_client().await;
    publisher.publish_to_queue(&queue, b"late").await.unwrap();

    // The worker ends when it observes the stop channel; once it drops the
    // sender, recv returns None. A delivered body means it kept consuming.
    let leftover = timeout(Duration::from_secs(3), rx.recv()).await;
    assert!(
        matches!(leftover, Ok(None) | Err(_)),
        "queue worker consumed a message after close"
    );

    publisher.close().await;
}

#[tokio::test]
async fn full_bootstrap_serves_health_and_stops_on_shutdown() {
    // Fixed port for the service under test; unique per test binary run.
    let http_port = 48681u16;
    let document = common::config_document(json!({
        "broker_url": broker_url(),
        "config_event_bus": unique("springCloudBus"),
        "server_port": http_port.to_string()
    }));
    let (addr, _requests) = common::start_mock_config_server(document).await;

    let args = Args::try_parse_from([
        "vipservice",
        "--configServerUrl",
        &format!("http://{addr}"),
    ])
    .unwrap();

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    let service = tokio::spawn(async move { startup::run(&args, shutdown).await });

    let health_url = format!("http://127.0.0.1:{http_port}/health");
    let http = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let response = loop {
        if let Ok(response) = http.get(&health_url).send().await {
            break response;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "health endpoint never came up"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    };
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["status"], "UP");
    assert_eq!(payload["components"]["broker"], "UP");

    trigger.trigger();

    let result = timeout(Duration::from_secs(5), service)
        .await
        .expect("service did not stop after shutdown trigger")
        .unwrap();
    assert!(result.is_ok(), "serve loop ended with error: {result:?}");
}
