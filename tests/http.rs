use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use mcp_hub::base::ErrorKind;
use mcp_hub::clients::{ExternalSystem, HttpSubsystemClient, SubsystemClients};
use mcp_hub::config::ConfigEntity;
use mcp_hub::{dashboard, ClientRequest, Hub, SubsystemClient};
use serde_json::{json, Value};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

/// A stand-in MES answering each operation in a different way.
fn fake_mes() -> Router {
    Router::new()
        .route(
            "/mcp/getBatchStatus",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "batchNumber": body["batchNumber"], "status": "IN_PROGRESS" }))
            }),
        )
        .route("/mcp/sendNotification", post(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/mcp/getBatchInfo",
            post(|| async { (StatusCode::NOT_FOUND, "no such batch") }),
        )
        .route(
            "/mcp/getProcessParameters",
            post(|| async { (StatusCode::BAD_REQUEST, "processId is required") }),
        )
        .route("/mcp/getBatchProcessExecution", post(|| async { StatusCode::FORBIDDEN }))
        .route(
            "/mcp/broken",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
        .route("/mcp/garbage", post(|| async { "<html>gateway</html>" }))
        .route(
            "/mcp/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        )
}

fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);
    addr
}

fn client(addr: SocketAddr, timeout_ms: u64) -> HttpSubsystemClient {
    HttpSubsystemClient::new(
        "mes",
        &format!("http://{}/mcp", addr),
        Duration::from_millis(timeout_ms),
    )
    .unwrap()
}

async fn kind_of(client: &HttpSubsystemClient, operation: &str) -> ErrorKind {
    client
        .call(ClientRequest::new(operation, json!({})))
        .await
        .unwrap_err()
        .kind()
}

#[tokio::test]
async fn http_answers_are_classified() {
    let addr = spawn(fake_mes());
    let mes = client(addr, 500);

    let status = mes
        .call(ClientRequest::new("getBatchStatus", json!({"batchNumber": "B-7"})))
        .await
        .unwrap();
    assert_eq!(status, json!({"batchNumber": "B-7", "status": "IN_PROGRESS"}));
    let sent = mes
        .call(ClientRequest::new("sendNotification", json!({"message": "hi"})))
        .await
        .unwrap();
    assert_eq!(sent, Value::Null);

    assert_eq!(kind_of(&mes, "getBatchInfo").await, ErrorKind::ResourceNotFound);
    assert_eq!(kind_of(&mes, "getProcessParameters").await, ErrorKind::BadRequest);
    assert_eq!(
        kind_of(&mes, "getBatchProcessExecution").await,
        ErrorKind::Unauthorized
    );
    assert_eq!(kind_of(&mes, "broken").await, ErrorKind::ServiceUnavailable);
    assert_eq!(kind_of(&mes, "garbage").await, ErrorKind::ServiceUnavailable);
    assert_eq!(kind_of(&mes, "slow").await, ErrorKind::ConnectionTimeout);
}

#[tokio::test]
async fn unreachable_system_is_a_timeout() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let mes = client(addr, 500);
    let err = mes
        .call(ClientRequest::new("getBatchStatus", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionTimeout);
}

#[tokio::test]
async fn dashboard_sees_http_calls() {
    let mes_addr = spawn(fake_mes());
    let mut config = ConfigEntity::new();
    config
        .config
        .systems
        .entry("mes".into())
        .or_default()
        .base_url = format!("http://{}/mcp", mes_addr);
    config.config.dispatcher.call_timeout_ms = 1_000;
    let hub = Arc::new(Hub::new(config).unwrap());
    let clients = SubsystemClients::from_config(&hub).unwrap();
    assert_eq!(clients.systems(), vec![ExternalSystem::Mes]);

    let mes = clients.mes().unwrap();
    assert!(!mes.get_batch_status("B-1").await.unwrap().used_fallback);
    let info = mes.get_batch_info("B-404").await.unwrap();
    assert!(info.degraded);
    assert_eq!(info.payload["batchNumber"], json!("B-404"));

    let dashboard_addr = spawn(dashboard::router(Arc::clone(&hub)));
    let http = reqwest::Client::new();
    let base = format!("http://{}{}", dashboard_addr, dashboard::API_PREFIX);

    let metrics: Value = http
        .get(format!("{}/metrics", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["totalCalls"], json!(2));
    assert_eq!(metrics["errorRate"], json!(50.0));

    let errors: Value = http
        .get(format!("{}/errors?limit=5", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let errors = errors.as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["system"], json!("mes"));
    assert_eq!(errors[0]["errorType"], json!("ResourceNotFound"));

    let call_id = errors[0]["callId"].as_str().unwrap();
    let details = http
        .get(format!("{}/error-details/{}", base, call_id))
        .send()
        .await
        .unwrap();
    assert_eq!(details.status().as_u16(), 200);
    let missing = http
        .get(format!("{}/error-details/not-a-call", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}
