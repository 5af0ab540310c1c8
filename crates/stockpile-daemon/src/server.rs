//! Web server setup and routing

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::auth;
use crate::config::TlsConfig;
use crate::state::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    // Snapshot routes sit behind the session gate
    let surfaces = Router::new()
        .route("/api/surfaces", get(api::list_surfaces))
        .route("/api/surfaces/next", get(api::next_surface))
        .route("/api/surfaces/parse", post(api::parse_surface))
        .route("/api/surfaces/{filename}", get(api::get_surface))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    Router::new()
        .route("/api/auth", post(auth::login))
        .merge(surfaces)
        // Static files (WASM viewer) - must be fallback for root
        .fallback_service(ServeDir::new(&state.config.daemon.web_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the web server (HTTP or HTTPS depending on config)
pub async fn run(state: Arc<AppState>, bind: &str, tls: Option<&TlsConfig>) -> Result<()> {
    let app = router(state);

    if let Some(tls_config) = tls {
        run_https(app, bind, tls_config).await
    } else {
        run_http(app, bind).await
    }
}

/// Run plain HTTP server
async fn run_http(app: Router, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run HTTPS server with TLS
async fn run_https(app: Router, bind: &str, tls: &TlsConfig) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::path::PathBuf;

    let cert_path = PathBuf::from(&tls.cert);
    let key_path = PathBuf::from(&tls.key);

    if !cert_path.exists() {
        anyhow::bail!("TLS certificate file not found: {}", tls.cert);
    }
    if !key_path.exists() {
        anyhow::bail!("TLS key file not found: {}", tls.key);
    }

    let rustls_config = RustlsConfig::from_pem_file(&cert_path, &key_path).await?;

    let addr: std::net::SocketAddr = bind.parse()?;
    info!(address = %bind, protocol = "HTTPS", cert = %tls.cert, "Starting web server with TLS");

    axum_server::bind_rustls(addr, rustls_config)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::path::Path;
    use stockpile_core::SceneObjectDocument;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn snapshot(z: f64) -> Value {
        let sample = |x: f64, y: f64| json!({ "x": x, "y": y, "z": z, "color": "#FFE066" });
        json!({
            "surface_points": [sample(0.0, 0.0), sample(50.0, 0.0), sample(0.0, 50.0), sample(50.0, 50.0)],
            "array": { "0": { "0": [{ "x": 0, "y": 0, "z": z }] } },
            "avg_disappeared_quality": 38.5
        })
    }

    fn write(dir: &Path, name: &str, content: &Value) {
        std::fs::write(dir.join(name), content.to_string()).unwrap();
    }

    fn app(dir: &TempDir, password: Option<&str>) -> Router {
        let mut config = Config::default();
        config.surfaces.path = dir.path().display().to_string();
        config.daemon.web_dir = dir.path().join("web").display().to_string();
        config.auth.password = password.map(str::to_string);
        router(AppState::new(config))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_next_wraps_around() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &snapshot(1.0));
        write(dir.path(), "b.json", &snapshot(2.0));
        let app = app(&dir, None);

        let (status, _, body) = send(&app, get("/api/surfaces/next")).await;
        assert_eq!(status, StatusCode::OK);
        let first: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(first["totalFiles"], 2);
        assert_eq!(first["currentIndex"], 0);

        let current = first["filename"].as_str().unwrap();
        let (_, _, body) = send(&app, get(&format!("/api/surfaces/next?current={}", current))).await;
        let second: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(second["currentIndex"], 1);

        let current = second["filename"].as_str().unwrap();
        let (_, _, body) = send(&app, get(&format!("/api/surfaces/next?current={}", current))).await;
        let third: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(third["filename"], first["filename"]);
    }

    #[tokio::test]
    async fn test_next_with_no_snapshots() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);

        let (status, _, body) = send(&app, get("/api/surfaces/next")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert!(error["error"].is_string());
    }

    #[tokio::test]
    async fn test_get_raw_snapshot() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &snapshot(3.0));
        let app = app(&dir, None);

        let (status, headers, body) = send(&app, get("/api/surfaces/a.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        let content: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(content["avg_disappeared_quality"], 38.5);

        let (status, _, _) = send(&app, get("/api/surfaces/missing.json")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(&app, get("/api/surfaces/..%5Ca.json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_includes_content() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &snapshot(3.0));
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let app = app(&dir, None);

        let (status, _, body) = send(&app, get("/api/surfaces")).await;
        assert_eq!(status, StatusCode::OK);
        let listing: Value = serde_json::from_slice(&body).unwrap();
        let listing = listing.as_array().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0]["name"], "a.json");
        assert_eq!(listing[0]["content"]["avg_disappeared_quality"], 38.5);
    }

    #[tokio::test]
    async fn test_parse_builds_mesh() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &snapshot(3.0));
        let app = app(&dir, None);

        let (status, _, body) = send(&app, post_json("/api/surfaces/parse", json!({ "filename": "a.json" }))).await;
        assert_eq!(status, StatusCode::OK);
        let document: SceneObjectDocument = serde_json::from_slice(&body).unwrap();
        let mesh = document.into_mesh().unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.name, "a.json");
    }

    #[tokio::test]
    async fn test_parse_errors() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);

        let (status, _, _) = send(&app, post_json("/api/surfaces/parse", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(&app, post_json("/api/surfaces/parse", json!({ "filename": "gone.json" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_password_gate() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &snapshot(3.0));
        let app = app(&dir, Some("hunter2"));

        let (status, _, _) = send(&app, get("/api/surfaces/next")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(&app, post_json("/api/auth", json!({ "password": "wrong" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, headers, _) = send(&app, post_json("/api/auth", json!({ "password": "hunter2" }))).await;
        assert_eq!(status, StatusCode::OK);
        let cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("HttpOnly"));
        let session = cookie.split(';').next().unwrap().to_string();

        let request = Request::get("/api/surfaces/next")
            .header(header::COOKIE, &session)
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::get("/api/surfaces/next")
            .header(header::COOKIE, "stockpile_session=forged")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_open_server_needs_no_login() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &snapshot(3.0));
        let app = app(&dir, None);

        let (status, _, _) = send(&app, get("/api/surfaces/next")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = send(&app, post_json("/api/auth", json!({ "password": "anything" }))).await;
        assert_eq!(status, StatusCode::OK);
    }
}
