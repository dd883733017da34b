//! HTTP API integration tests — exercise every gateway endpoint in-process.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use persona_config::schema::GatewayConfig;
use std::path::Path;

/// Build a test router whose plugin root is `plugin_dir`.
fn setup(plugin_dir: &Path) -> axum::Router {
    persona_gateway::build_router(GatewayConfig::default(), plugin_dir.to_path_buf())
}

/// Helper to read the full body bytes from a response.
async fn body_string(resp: axum::response::Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ── Health & Metrics ───────────────────────────────────────────

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["uptime_secs"].is_number());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let req = Request::get("/metrics").body(Body::empty()).unwrap();
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(ct.contains("text/plain"));
    let body = body_string(resp).await;
    assert!(body.contains("persona_http_requests_total"));
    assert!(body.contains("persona_fs_reads_total"));
}

#[tokio::test]
async fn test_metrics_count_filesystem_traffic() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("counted.txt");
    std::fs::write(&file, "x").unwrap();
    let app = setup(dir.path());

    let read = post_json(
        "/api/filesystem",
        serde_json::json!({"action": "readFile", "path": file}),
    );
    assert_eq!(app.clone().oneshot(read).await.unwrap().status(), StatusCode::OK);

    let req = Request::get("/metrics").body(Body::empty()).unwrap();
    let body = body_string(app.oneshot(req).await.unwrap()).await;
    assert!(body.contains("persona_fs_reads_total 1"));
    assert!(body.contains("persona_fs_writes_total 0"));
}

// ── Filesystem ─────────────────────────────────────────────────

#[tokio::test]
async fn test_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("hello.txt");
    std::fs::write(&file, "hello gateway\n").unwrap();

    let req = post_json(
        "/api/filesystem",
        serde_json::json!({"action": "readFile", "path": file}),
    );
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], "hello gateway\n");
}

#[tokio::test]
async fn test_write_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("out.txt");

    let req = post_json(
        "/api/filesystem",
        serde_json::json!({"action": "writeFile", "path": file, "content": "written"}),
    );
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert!(json["message"].is_string());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "written");
}

#[tokio::test]
async fn test_write_without_content_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("truncate.txt");
    std::fs::write(&file, "old content").unwrap();

    let req = post_json(
        "/api/filesystem",
        serde_json::json!({"action": "writeFile", "path": file}),
    );
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "");
}

#[tokio::test]
async fn test_invalid_action_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("keep.txt");
    std::fs::write(&file, "keep me").unwrap();

    let req = post_json(
        "/api/filesystem",
        serde_json::json!({"action": "deleteFile", "path": file}),
    );
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Invalid action: deleteFile");
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "keep me");
}

#[tokio::test]
async fn test_missing_file_reports_error_kind() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("missing.txt");

    let req = post_json(
        "/api/filesystem",
        serde_json::json!({"action": "readFile", "path": file}),
    );
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error_kind"], "not_found");
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let req = Request::post("/api/filesystem")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"action":"readFile"}"#))
        .unwrap();
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    // Missing required field "path" → 422 Unprocessable Entity
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ── System info ────────────────────────────────────────────────

#[tokio::test]
async fn test_systeminfo_shape() {
    let dir = tempfile::tempdir().unwrap();
    let req = Request::post("/api/systeminfo").body(Body::empty()).unwrap();
    let resp = setup(dir.path()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);

    let load = json["data"]["cpu_load"].as_array().unwrap();
    assert_eq!(load.len(), 3);
    assert!(load.iter().all(|v| v.as_f64().unwrap() >= 0.0));

    let free = json["data"]["free_memory"].as_u64().unwrap();
    let total = json["data"]["total_memory"].as_u64().unwrap();
    assert!(total > 0);
    assert!(free <= total);
}

// ── Plugins ────────────────────────────────────────────────────

#[tokio::test]
async fn test_plugins_are_rediscovered_per_request() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("alpha")).unwrap();
    std::fs::create_dir(dir.path().join(".hidden")).unwrap();
    let app = setup(dir.path());

    let req = Request::get("/api/plugins").body(Body::empty()).unwrap();
    let json = body_json(app.clone().oneshot(req).await.unwrap()).await;
    assert_eq!(json["success"], true);
    let ids: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["alpha".to_string()]);

    std::fs::create_dir(dir.path().join("beta")).unwrap();
    let req = Request::get("/api/plugins").body(Body::empty()).unwrap();
    let json = body_json(app.oneshot(req).await.unwrap()).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_plugins_missing_root_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let req = Request::get("/api/plugins").body(Body::empty()).unwrap();
    let resp = setup(&dir.path().join("absent")).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("absent"));
}

#[tokio::test]
async fn test_unknown_route_404() {
    let dir = tempfile::tempdir().unwrap();
    let req = Request::get("/api/nope").body(Body::empty()).unwrap();
    let resp = setup(dir.path()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
