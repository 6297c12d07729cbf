//! End-to-end signaling over real WebSocket connections.

use serde_json::json;
use std::time::Duration;

use interpreter_relay::RelayConfig;

mod common;

use common::TestRelay;

#[tokio::test]
async fn test_queued_requester_reaches_provider() {
    let mut relay = TestRelay::start().await;

    let mut requester = relay.client().await;
    requester.login("requester").await;
    assert_eq!(
        requester.expect("interpreter-status").await,
        json!({"available": false, "id": null})
    );

    let mut provider = relay.client().await;
    provider.login("provider").await;
    provider.send("provider-online", json!({})).await;

    assert_eq!(
        requester.expect("interpreter-status").await,
        json!({"available": true, "id": provider.id})
    );

    let offer = json!({"type": "offer", "sdp": "v=0"});
    requester
        .send(
            "call-request",
            json!({"to": provider.id, "from": requester.id, "offer": offer}),
        )
        .await;
    assert_eq!(
        provider.expect("incoming-call").await,
        json!({"from": requester.id, "offer": offer})
    );

    let stats = relay.stats().await;
    assert_eq!(stats["providers_available"], 0);
    assert_eq!(stats["requesters_waiting"], 0);

    let answer = json!({"type": "answer", "sdp": "v=0"});
    provider
        .send(
            "call-answer",
            json!({"to": requester.id, "from": provider.id, "answer": answer}),
        )
        .await;
    assert_eq!(
        requester.expect("call-answer").await,
        json!({"from": provider.id, "answer": answer})
    );

    let candidate = json!({"candidate": "candidate:1 1 UDP 2122252543 10.0.0.2 50000 typ host"});
    requester
        .send("ice-candidate", json!({"to": provider.id, "candidate": candidate}))
        .await;
    assert_eq!(
        provider.expect("ice-candidate").await,
        json!({"from": requester.id, "candidate": candidate})
    );

    requester.send("call-end", json!({"to": provider.id})).await;
    assert_eq!(
        provider.expect("call-ended").await,
        json!({"from": requester.id})
    );

    let stats = relay.stats().await;
    assert_eq!(stats["sessions"], 2);
    assert_eq!(stats["providers_available"], 1);

    relay.stop().await;
}

#[tokio::test]
async fn test_second_request_for_same_provider_is_rejected() {
    let mut relay = TestRelay::start().await;

    let mut provider = relay.client().await;
    provider.login("interpreter").await;
    provider.send("interpreter-online", json!({})).await;

    let mut first = relay.client().await;
    first.login("requester").await;
    assert_eq!(first.expect("interpreter-status").await["id"], provider.id);

    let mut second = relay.client().await;
    second.login("surdo").await;
    assert_eq!(second.expect("interpreter-status").await["id"], provider.id);

    first
        .send("call-request", json!({"to": provider.id, "from": first.id, "offer": {}}))
        .await;
    provider.expect("incoming-call").await;

    second
        .send("request-call", json!({"to": provider.id, "from": second.id, "offer": {}}))
        .await;
    assert_eq!(
        second.expect("interpreter-status").await,
        json!({"available": false, "id": null})
    );
    provider.expect_silence(200).await;

    relay.stop().await;
}

#[tokio::test]
async fn test_decline_requeues_requester_and_frees_provider() {
    let mut relay = TestRelay::start().await;

    let mut provider = relay.client().await;
    provider.login("provider").await;
    provider.send("provider-online", json!({})).await;

    let mut requester = relay.client().await;
    requester.login("requester").await;
    requester.expect("interpreter-status").await;

    requester
        .send("call-request", json!({"to": provider.id, "from": requester.id, "offer": {}}))
        .await;
    provider.expect("incoming-call").await;

    provider
        .send("call-decline", json!({"to": requester.id, "from": provider.id}))
        .await;
    assert_eq!(
        requester.expect("call-declined").await,
        json!({"from": provider.id})
    );
    assert_eq!(
        requester.expect("interpreter-status").await,
        json!({"available": true, "id": provider.id})
    );

    let stats = relay.stats().await;
    assert_eq!(stats["providers_available"], 1);
    assert_eq!(stats["requesters_waiting"], 1);

    relay.stop().await;
}

#[tokio::test]
async fn test_provider_disconnect_notifies_queue() {
    let mut relay = TestRelay::start().await;

    let mut requester = relay.client().await;
    requester.login("requester").await;
    requester.expect("interpreter-status").await;

    let mut provider = relay.client().await;
    provider.login("provider").await;
    provider.send("provider-online", json!({})).await;
    requester.expect("interpreter-status").await;

    provider.close().await;
    assert_eq!(
        requester.expect("interpreter-status").await,
        json!({"available": false, "id": null})
    );

    let stats = relay.stats().await;
    assert_eq!(stats["sessions"], 1);
    assert_eq!(stats["providers_available"], 0);

    relay.stop().await;
}

#[tokio::test]
async fn test_malformed_login_and_ping() {
    let mut relay = TestRelay::start().await;
    let mut client = relay.client().await;

    client.send("login", json!({"identity": "no-role"})).await;
    assert_eq!(
        client.expect("error").await,
        json!({"message": "Login failed: invalid payload"})
    );

    // Bad envelopes and unknown events are dropped without a reply.
    client.send_raw("not json").await;
    client.send("teleport", json!({})).await;
    client.send("call-request", json!({"to": 5})).await;
    client.send("ping", json!(null)).await;
    assert_eq!(client.recv().await.unwrap(), json!({"event": "pong"}));

    relay.stop().await;
}

#[tokio::test]
async fn test_shutdown_notice_then_close() {
    let mut relay = TestRelay::start().await;
    let mut client = relay.client().await;

    relay.stop().await;
    assert_eq!(
        client.expect("error").await,
        json!({"message": "server shutting down"})
    );
    assert!(client.recv().await.is_none());
}

#[tokio::test]
async fn test_channel_limit_rejects_upgrade() {
    let mut config = RelayConfig::default();
    config.listener.max_connections = 1;
    let mut relay = TestRelay::start_with(config).await;

    let first = relay.client().await;
    assert!(tokio_tungstenite::connect_async(relay.ws_url()).await.is_err());

    first.close().await;
    // Slot is released once the socket task notices the close.
    let mut reconnected = false;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if tokio_tungstenite::connect_async(relay.ws_url()).await.is_ok() {
            reconnected = true;
            break;
        }
    }
    assert!(reconnected);

    relay.stop().await;
}

#[tokio::test]
async fn test_http_endpoints() {
    let mut relay = TestRelay::start().await;

    let ping: serde_json::Value = reqwest::get(relay.http_url("/api/ping"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ping["message"], "pong");
    assert_eq!(ping["server_healthy"], true);

    let health = reqwest::get(relay.http_url("/health")).await.unwrap();
    assert!(health.status().is_success());

    let index = reqwest::get(relay.http_url("/")).await.unwrap().text().await.unwrap();
    assert!(index.contains("WebSocket endpoint: /ws"));

    relay.stop().await;
}
