//! End-to-end tests: SDK / reqwest → gateway → mock upstream.

use std::time::Duration;

use bridge_gateway::http::GatewayServer;
use bridge_gateway_sdk::SdkError;
use serde_json::{json, Value};

mod common;

use common::{closed_port_url, spawn_gateway, test_config, MockUpstream, TEST_API_KEY, TEST_TOKEN};

async fn json_body(res: reqwest::Response) -> Value {
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let res = reqwest::get(format!("{}/health", gateway.url())).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.headers()["x-ratelimit-type"], "ip");

    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["service"], "bridge-api-gateway");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_missing_credentials_rejected() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/api/customers", gateway.url())).send().await.unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(json_body(res).await["error"]["code"], "UNAUTHORIZED");

    let res = client
        .get(format!("{}/api/customers", gateway.url()))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(json_body(res).await["error"]["code"], "INVALID_TOKEN");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_list_forwards_query_and_api_key() {
    let upstream = MockUpstream::start().await;
    upstream.push(200, r#"{"data":[{"id":"c1"}],"count":1}"#);
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let body = gateway.sdk().list_customers(&[("limit", "2")]).await.unwrap();
    assert_eq!(body, json!({"success": true, "data": {"data": [{"id": "c1"}], "count": 1}}));

    let seen = upstream.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].target, "/customers?limit=2");
    assert_eq!(seen[0].header("api-key"), Some(TEST_API_KEY));
    assert_eq!(seen[0].header("idempotency-key"), None);
    assert!(seen[0].body.is_empty());
}

#[tokio::test]
async fn test_post_retries_with_same_idempotency_key() {
    let upstream = MockUpstream::start().await;
    upstream.push(503, r#"{"error":"busy"}"#);
    upstream.push(502, "bad gateway");
    upstream.push(201, r#"{"id":"tr_1","state":"awaiting_funds"}"#);
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let body = gateway
        .sdk()
        .create_transfer(&json!({"amount": "25.00", "on_behalf_of": "c1"}))
        .await
        .unwrap();
    assert_eq!(body["data"]["id"], "tr_1");

    let seen = upstream.requests();
    assert_eq!(seen.len(), 3);
    let key = seen[0].header("idempotency-key").unwrap().to_string();
    assert!(!key.is_empty());
    for request in &seen {
        assert_eq!(request.target, "/transfers");
        assert_eq!(request.header("idempotency-key"), Some(key.as_str()));
        assert_eq!(
            serde_json::from_str::<Value>(&request.body).unwrap(),
            json!({"amount": "25.00", "on_behalf_of": "c1"})
        );
    }
}

#[tokio::test]
async fn test_exhausted_retries_return_last_response() {
    let upstream = MockUpstream::start().await;
    upstream.always(503, r#"{"code":"unavailable","message":"try later"}"#);
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let err = gateway.sdk().get_customer("c1").await.unwrap_err();
    match err {
        SdkError::Api { status, code, .. } => {
            assert_eq!(status, 503);
            assert_eq!(code, "unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(upstream.hits(), 4);
}

#[tokio::test]
async fn test_terminal_status_not_retried() {
    let upstream = MockUpstream::start().await;
    upstream.always(404, r#"{"code":"not_found","message":"No such customer"}"#);
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let res = reqwest::Client::new()
        .get(format!("{}/api/customers/missing", gateway.url()))
        .header("x-api-token", TEST_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(
        json_body(res).await,
        json!({"success": false, "error": {"code": "not_found", "message": "No such customer"}})
    );
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_caller_idempotency_key_is_forwarded() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    gateway
        .sdk()
        .create_customer_idempotent(&json!({"type": "individual"}), "client-key-42")
        .await
        .unwrap();
    assert_eq!(upstream.requests()[0].header("idempotency-key"), Some("client-key-42"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let err = gateway
        .sdk()
        .request(reqwest::Method::GET, "/api/nothing-here", &[], None, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "gateway returned 404 NOT_FOUND: Route GET /api/nothing-here not found");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_invalid_json_rejected_before_dispatch() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let res = reqwest::Client::new()
        .post(format!("{}/api/customers", gateway.url()))
        .header("x-api-token", TEST_TOKEN)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(json_body(res).await["error"]["code"], "INVALID_JSON");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_empty_body_forwarded_as_empty_object() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let res = reqwest::Client::new()
        .post(format!("{}/api/customers/tos-links", gateway.url()))
        .header("x-api-token", TEST_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let requests = upstream.requests();
    assert_eq!(requests[0].target, "/tos_links");
    assert_eq!(requests[0].body, "{}");
    assert!(requests[0].header("idempotency-key").is_some());
}

#[tokio::test]
async fn test_unreachable_upstream() {
    let gateway = spawn_gateway(test_config(&closed_port_url())).await;

    let err = gateway.sdk().list_transfers(&[]).await.unwrap_err();
    assert_eq!(err.code(), "INTERNAL_ERROR");
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("ECONNRESET"));

    let err = gateway.sdk().status().await.unwrap_err();
    assert_eq!(err.code(), "BRIDGE_UNREACHABLE");
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_status_reports_upstream() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let body = gateway.sdk().status().await.unwrap();
    assert_eq!(body["data"]["bridge"]["status"], "connected");
    assert_eq!(body["data"]["bridge"]["attempts"], 1);
    assert_eq!(body["data"]["features"]["retryLogic"]["maxRetries"], 3);
    assert_eq!(upstream.requests()[0].target, "/customers?limit=1");
}

#[tokio::test]
async fn test_docs_cover_route_table() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;

    let body = gateway.sdk().docs().await.unwrap();
    assert_eq!(body["data"]["endpointCount"], 62);
    assert!(body["data"]["endpoints"]["transfers"].as_array().unwrap().len() >= 5);
    assert!(body["data"]["webhooks"]["events"]["card"].is_array());
}

#[tokio::test]
async fn test_rate_limit_per_token() {
    let upstream = MockUpstream::start().await;
    let mut config = test_config(&upstream.url());
    config.rate_limit.max_requests = 2;
    let gateway = spawn_gateway(config).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/lists/chains", gateway.url());

    for remaining in ["1", "0"] {
        let res = client.get(&url).header("x-api-token", TEST_TOKEN).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["x-ratelimit-limit"], "2");
        assert_eq!(res.headers()["x-ratelimit-remaining"], remaining);
        assert_eq!(res.headers()["x-ratelimit-type"], "token");
    }

    let res = client.get(&url).header("x-api-token", TEST_TOKEN).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert!(res.headers().contains_key("retry-after"));
    let body = json_body(res).await;
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert!(body["error"]["resetIn"].as_u64().unwrap() <= 60);
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn test_webhook_receiver_is_public() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/webhooks/bridge", gateway.url()))
        .header("content-type", "application/json")
        .body(r#"{"id":"evt_1","type":"transfer.payment_completed","data":{"id":"tr_9"}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        json_body(res).await,
        json!({"success": true, "message": "Webhook received", "eventType": "transfer.payment_completed"})
    );

    let res = client
        .post(format!("{}/webhooks/bridge", gateway.url()))
        .body("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(json_body(res).await["error"]["code"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let upstream = MockUpstream::start().await;
    let gateway = spawn_gateway(test_config(&upstream.url())).await;
    gateway.sdk().health().await.unwrap();

    gateway.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), gateway.task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_reload_changes_retry_policy() {
    let upstream = MockUpstream::start().await;
    upstream.always(500, r#"{"error":"boom"}"#);
    let config = test_config(&upstream.url());
    let server = GatewayServer::new(config.clone()).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server
        .router()
        .into_make_service_with_connect_info::<std::net::SocketAddr>();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    let sdk = bridge_gateway_sdk::GatewayClient::new(&format!("http://{addr}")).with_token(TEST_TOKEN);

    let list_cards = || sdk.request(reqwest::Method::GET, "/api/cards", &[], None, None);

    assert!(list_cards().await.is_err());
    assert_eq!(upstream.hits(), 4);

    let mut reloaded = config;
    reloaded.retries.max_retries = 0;
    server.apply_config(reloaded);

    assert!(list_cards().await.is_err());
    assert_eq!(upstream.hits(), 5);
}
