//! HTTP client for the snapshot server

use bevy::prelude::*;
use tracing::{info, warn};
use std::cell::Cell;
use std::sync::{Arc, Mutex};
use stockpile_core::{AdvanceRequest, AutoAdvance, FeedError, LoadedSnapshot, NextSnapshot};
use stockpile_scene::{LoadSnapshot, SceneConfig, SectionSelected, SelectSection};

pub struct NetworkPlugin;

/// Resource storing the snapshot server location
#[derive(Resource, Clone, Default)]
pub struct ServerConfig {
    /// HTTP(S) base URL for the REST API (e.g., "http://192.168.1.100:8080")
    pub http_url: String,
}

impl ServerConfig {
    /// Create config from URL query parameters or same-origin fallback
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let location = window.location();

        // Check for ?server= query parameter
        if let Ok(search) = location.search() {
            if let Some(server) = Self::parse_query_param(&search, "server") {
                tracing::info!("Using server from URL parameter: {}", server);
                return Self::from_server_address(&server);
            }
        }

        let host = location.host().unwrap_or_else(|_| "localhost:8080".to_string());
        let is_https = location.protocol().unwrap_or_default() == "https:";
        Self {
            http_url: format!("{}://{}", if is_https { "https" } else { "http" }, host),
        }
    }

    /// Same-origin (empty base URL) off the browser
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_browser() -> Self {
        Self::default()
    }

    /// Create config from a server address (host:port or full URL)
    pub fn from_server_address(addr: &str) -> Self {
        let addr = addr.trim_end_matches('/');
        let http_url = if addr.starts_with("https://") || addr.starts_with("http://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        };
        Self { http_url }
    }

    /// Parse a query parameter from a search string
    pub fn parse_query_param(search: &str, param: &str) -> Option<String> {
        let search = search.trim_start_matches('?');
        for pair in search.split('&') {
            let mut parts = pair.splitn(2, '=');
            if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                if key == param {
                    return Some(value.replace("%3A", ":").replace("%2F", "/"));
                }
            }
        }
        None
    }
}

/// Map a non-success HTTP status to a feed error
pub fn status_error(status: u16) -> Option<FeedError> {
    match status {
        200..=299 => None,
        401 => Some(FeedError::Unauthorized),
        other => Some(FeedError::Status(other)),
    }
}

/// Snapshot source backed by the server's REST API
pub struct HttpSnapshotSource {
    base_url: String,
    /// (index, total) reported by the last sequencer answer
    position: Cell<Option<(usize, usize)>>,
}

impl HttpSnapshotSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            position: Cell::new(None),
        }
    }

    /// `current` must already be URI-encoded
    pub fn next_url(&self, current: Option<&str>) -> String {
        match current {
            Some(current) => format!("{}/api/surfaces/next?current={}", self.base_url, current),
            None => format!("{}/api/surfaces/next", self.base_url),
        }
    }

    pub fn survey_url(&self, id: &str) -> String {
        format!("{}/api/surfaces/{}", self.base_url, id)
    }

    pub fn parse_url(&self) -> String {
        format!("{}/api/surfaces/parse", self.base_url)
    }

    pub fn record_position(&self, next: &NextSnapshot) {
        self.position.set(Some((next.current_index, next.total_files)));
    }

    pub fn position(&self) -> Option<(usize, usize)> {
        self.position.get()
    }
}

#[cfg(target_arch = "wasm32")]
mod http {
    use super::{status_error, HttpSnapshotSource};
    use gloo_net::http::{Request, Response};
    use serde::de::DeserializeOwned;
    use stockpile_core::{FeedError, NextSnapshot, SceneObjectDocument, SnapshotSource, SurveyPayload};

    fn transport(e: gloo_net::Error) -> FeedError {
        FeedError::Transport(e.to_string())
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, FeedError> {
        if let Some(error) = status_error(response.status()) {
            return Err(error);
        }
        let text = response.text().await.map_err(transport)?;
        serde_json::from_str(&text).map_err(|e| FeedError::Decode(e.to_string()))
    }

    impl SnapshotSource for HttpSnapshotSource {
        async fn next_identifier(&self, current: Option<&str>) -> Result<String, FeedError> {
            let encoded = current.map(|c| String::from(js_sys::encode_uri_component(c)));
            let url = self.next_url(encoded.as_deref());
            let response = Request::get(&url).send().await.map_err(transport)?;
            let next: NextSnapshot = decode(response).await?;
            self.record_position(&next);
            Ok(next.filename)
        }

        async fn fetch_survey(&self, id: &str) -> Result<SurveyPayload, FeedError> {
            let url = self.survey_url(&String::from(js_sys::encode_uri_component(id)));
            let response = Request::get(&url).send().await.map_err(transport)?;
            decode(response).await
        }

        async fn fetch_mesh(&self, id: &str) -> Result<SceneObjectDocument, FeedError> {
            let body = serde_json::json!({ "filename": id });
            let response = Request::post(&self.parse_url())
                .header("Content-Type", "application/json")
                .body(body.to_string())
                .map_err(transport)?
                .send()
                .await
                .map_err(transport)?;
            decode(response).await
        }
    }
}

/// A finished poll handed back from the async task
#[derive(Debug)]
pub struct FetchOutcome {
    pub result: Result<LoadedSnapshot, FeedError>,
    pub position: Option<(usize, usize)>,
}

/// Poll results waiting for the next frame
#[derive(Resource, Default, Clone)]
pub struct PendingSnapshots(pub Arc<Mutex<Vec<FetchOutcome>>>);

/// Auto-advance state plus what the UI shows about it
#[derive(Resource, Debug, Default)]
pub struct SnapshotFeed {
    pub advance: AutoAdvance,
    /// (index, total) of the snapshot on display
    pub position: Option<(usize, usize)>,
}

/// Login window state
#[derive(Resource, Debug, Default)]
pub struct LoginDialog {
    pub open: bool,
    pub password: String,
    pub error: Option<String>,
    pub submitting: bool,
}

/// Login result waiting for the next frame
#[derive(Resource, Default, Clone)]
pub struct PendingLogin(pub Arc<Mutex<Option<Result<(), String>>>>);

impl PendingLogin {
    /// Hand a login outcome to [`drain_login`]; every submission must end here
    pub fn complete(&self, result: Result<(), String>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(result);
        }
    }
}

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        let interval = app
            .world()
            .get_resource::<SceneConfig>()
            .map(|config| config.poll_interval)
            .unwrap_or(AutoAdvance::DEFAULT_INTERVAL);

        let mut advance = AutoAdvance::new(interval);
        advance.resume();

        app.init_resource::<ServerConfig>()
            .insert_resource(SnapshotFeed {
                advance,
                position: None,
            })
            .init_resource::<PendingSnapshots>()
            .init_resource::<LoginDialog>()
            .init_resource::<PendingLogin>()
            .add_systems(
                Update,
                (poll_snapshots, drain_snapshots, drain_login, forward_section_clicks),
            );
    }
}

fn poll_snapshots(
    time: Res<Time>,
    mut feed: ResMut<SnapshotFeed>,
    config: Res<ServerConfig>,
    pending: Res<PendingSnapshots>,
) {
    if let Some(request) = feed.advance.tick(time.delta()) {
        spawn_fetch(&config, &pending, request, &mut feed);
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_fetch(
    config: &ServerConfig,
    pending: &PendingSnapshots,
    request: AdvanceRequest,
    _feed: &mut SnapshotFeed,
) {
    use wasm_bindgen_futures::spawn_local;

    let pending_clone = pending.0.clone();
    let base_url = config.http_url.clone();

    spawn_local(async move {
        let source = HttpSnapshotSource::new(base_url);
        let result = stockpile_core::load_next(&source, request.current.as_deref()).await;
        if let Err(e) = &result {
            tracing::error!("Failed to load next snapshot: {}", e);
        }
        let outcome = FetchOutcome {
            result,
            position: source.position(),
        };
        if let Ok(mut queue) = pending_clone.lock() {
            queue.push(outcome);
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_fetch(
    config: &ServerConfig,
    pending: &PendingSnapshots,
    request: AdvanceRequest,
    feed: &mut SnapshotFeed,
) {
    let _ = (config, pending, request);
    feed.advance
        .fail(FeedError::Transport("HTTP snapshots need a browser".to_string()));
}

/// Hand finished polls to the scene
pub(crate) fn drain_snapshots(
    pending: Res<PendingSnapshots>,
    mut feed: ResMut<SnapshotFeed>,
    mut login: ResMut<LoginDialog>,
    mut loads: MessageWriter<LoadSnapshot>,
) {
    let outcomes: Vec<FetchOutcome> = match pending.0.lock() {
        Ok(mut queue) => queue.drain(..).collect(),
        Err(_) => return,
    };

    for outcome in outcomes {
        match outcome.result {
            Ok(loaded) => {
                if feed.advance.finish(&loaded.id) {
                    info!("Showing snapshot {}", loaded.id);
                    feed.position = outcome.position;
                    loads.write(LoadSnapshot {
                        id: loaded.id,
                        payload: loaded.payload,
                        surface: loaded.surface,
                    });
                }
            }
            Err(error) => {
                if error == FeedError::Unauthorized {
                    login.open = true;
                }
                feed.advance.fail(error);
            }
        }
    }
}

/// Submit the login form to the server
pub fn submit_login(password: String, base_url: &str, pending: &PendingLogin) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending = pending.clone();
        let url = format!("{}/api/auth", base_url);

        spawn_local(async move {
            let body = serde_json::json!({ "password": password });
            let request = match gloo_net::http::Request::post(&url)
                .header("Content-Type", "application/json")
                .body(body.to_string())
            {
                Ok(request) => request,
                Err(e) => {
                    tracing::error!("Failed to build login request: {:?}", e);
                    pending.complete(Err(format!("Failed to build login request: {}", e)));
                    return;
                }
            };

            let result = match request.send().await {
                Ok(response) if response.ok() => Ok(()),
                Ok(response) if response.status() == 401 => Err("Wrong password".to_string()),
                Ok(response) => Err(format!("Server returned status {}", response.status())),
                Err(e) => Err(e.to_string()),
            };
            pending.complete(result);
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (password, base_url);
        pending.complete(Err("Login needs a browser".to_string()));
    }
}

/// Close the login window on success and resume playback
pub(crate) fn drain_login(
    pending: Res<PendingLogin>,
    mut login: ResMut<LoginDialog>,
    mut feed: ResMut<SnapshotFeed>,
) {
    let Some(result) = pending.0.lock().ok().and_then(|mut slot| slot.take()) else {
        return;
    };

    login.submitting = false;
    match result {
        Ok(()) => {
            info!("Logged in");
            login.open = false;
            login.password.clear();
            login.error = None;
            feed.advance.resume();
        }
        Err(error) => {
            warn!("Login failed: {}", error);
            login.error = Some(error);
        }
    }
}

/// A surface click selects that section
fn forward_section_clicks(
    mut clicks: MessageReader<SectionSelected>,
    mut requests: MessageWriter<SelectSection>,
) {
    for SectionSelected(x) in clicks.read() {
        requests.write(SelectSection(*x));
    }
}
