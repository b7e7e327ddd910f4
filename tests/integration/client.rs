//! Remote action client against the local HTTP stub.
//!
//! Exercises the envelope normalization and the two-step referral flow
//! over real HTTP round-trips.

use std::time::Duration;

use reqwest::Client;

use kilobot::api::{GameApi, KiloClient, OrderParams};
use kilobot::config::ApiConfig;
use kilobot::net;
use kilobot::types::{ActionOutcome, Direction};

use crate::http_stub::StubServer;

fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        referral_code: "i4gr77mh".to_string(),
        request_timeout_secs: 30,
        ip_echo_url: String::new(),
        ip_echo_timeout_secs: 10,
    }
}

fn client_for(base_url: &str) -> KiloClient {
    let order = OrderParams {
        product_id: 2,
        leverage: 100,
        settle_delay_secs: 300,
    };
    // Zero bind pause keeps the referral test fast.
    KiloClient::new(Client::new(), &api_config(base_url), order, Duration::ZERO)
}

#[tokio::test]
async fn test_fetch_info_success() {
    let stub = StubServer::start(vec![(
        "/tg/user/info",
        r#"{"status": true, "data": {"balance": 250.0, "stamina": 12, "autoYield": 3}}"#.to_string(),
    )])
    .await;

    let api = client_for(&stub.base_url);
    let outcome = api.fetch_info("123", "alice").await;

    let ActionOutcome::Success(status) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!((status.balance - 250.0).abs() < 1e-10);
    assert!((status.stamina - 12.0).abs() < 1e-10);
    assert!((status.auto_yield - 3.0).abs() < 1e-10);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "GET");
    assert!(requests[0].1.contains("account=123"));
    assert!(requests[0].1.contains("name=alice"));
    assert!(requests[0].1.contains("from=kiloextrade"));
}

#[tokio::test]
async fn test_fetch_info_server_rejection() {
    let stub = StubServer::start(vec![(
        "/tg/user/info",
        r#"{"status": false, "msg": "system maintenance"}"#.to_string(),
    )])
    .await;

    let api = client_for(&stub.base_url);
    let outcome = api.fetch_info("123", "alice").await;
    assert_eq!(
        outcome,
        ActionOutcome::Failure("system maintenance".to_string()),
    );
}

#[tokio::test]
async fn test_fetch_info_transport_failure_normalized() {
    // Grab a port and release it so the connection is refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let api = client_for(&base_url);
    let outcome = api.fetch_info("123", "alice").await;
    match outcome {
        ActionOutcome::Failure(msg) => assert!(!msg.is_empty()),
        other => panic!("expected normalized failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bind_referral_submits_when_unbound() {
    let stub = StubServer::start(vec![
        ("/tg/referral/code", r#"{"status": true, "data": []}"#.to_string()),
        ("/tg/referral/bind", r#"{"status": true}"#.to_string()),
    ])
    .await;

    let api = client_for(&stub.base_url);
    let outcome = api.bind_referral("123").await;
    assert_eq!(outcome, ActionOutcome::Success(()));

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, "GET");
    assert!(requests[0].1.starts_with("/tg/referral/code"));
    assert_eq!(requests[1].0, "POST");
    assert!(requests[1].1.starts_with("/tg/referral/bind"));
}

#[tokio::test]
async fn test_bind_referral_noop_when_already_bound() {
    let stub = StubServer::start(vec![(
        "/tg/referral/code",
        r#"{"status": true, "data": ["existing-code"]}"#.to_string(),
    )])
    .await;

    let api = client_for(&stub.base_url);
    let outcome = api.bind_referral("123").await;
    assert_eq!(outcome, ActionOutcome::Success(()));

    // The bind call is never issued.
    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "GET");
}

#[tokio::test]
async fn test_bind_referral_check_failure_propagates() {
    let stub = StubServer::start(vec![(
        "/tg/referral/code",
        r#"{"status": false, "msg": "account not found"}"#.to_string(),
    )])
    .await;

    let api = client_for(&stub.base_url);
    let outcome = api.bind_referral("123").await;
    assert_eq!(
        outcome,
        ActionOutcome::Failure("account not found".to_string()),
    );
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_convert_stamina_posts_update() {
    let stub = StubServer::start(vec![(
        "/tg/mining/update",
        r#"{"status": true}"#.to_string(),
    )])
    .await;

    let api = client_for(&stub.base_url);
    let outcome = api.convert_stamina("123", 12.0).await;
    assert_eq!(outcome, ActionOutcome::Success(()));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "POST");
}

#[tokio::test]
async fn test_open_position_and_claim() {
    let stub = StubServer::start(vec![
        ("/tg/order/open", r#"{"status": true}"#.to_string()),
        ("/tg/mining/claim", r#"{"status": true}"#.to_string()),
    ])
    .await;

    let api = client_for(&stub.base_url);
    assert!(api.open_position("123", Direction::Long, 100.0).await.is_success());
    assert!(api.open_position("123", Direction::Short, 100.0).await.is_success());
    assert!(api.claim_offline_yield("123").await.is_success());

    let requests = stub.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|(method, _)| method == "POST"));
}

#[tokio::test]
async fn test_resolve_public_ip_via_stub() {
    let stub = StubServer::start(vec![("/", r#"{"ip": "203.0.113.9"}"#.to_string())]).await;

    let client = net::build_client(Default::default(), None, Duration::from_secs(10)).unwrap();
    let ip = net::resolve_public_ip(
        &client,
        &format!("{}/?format=json", stub.base_url),
        Duration::from_secs(10),
    )
    .await;
    assert_eq!(ip.as_deref(), Some("203.0.113.9"));
}
