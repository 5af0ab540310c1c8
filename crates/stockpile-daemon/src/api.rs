//! REST API handlers for snapshots

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stockpile_core::{triangulate, CatalogError, NextSnapshot, SceneObjectDocument, SurfaceError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::AppState;

/// Handler failure, rendered as `{ "error": ... }`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Catalog(CatalogError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            Self::Catalog(CatalogError::NotFound(_) | CatalogError::Empty) => StatusCode::NOT_FOUND,
            Self::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Surface(SurfaceError::InvalidPoints(_)) => StatusCode::BAD_REQUEST,
            Self::Surface(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        } else {
            debug!(error = %self, "Request rejected");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// A snapshot file together with its parsed content
#[derive(Debug, Serialize)]
pub struct SurfaceListing {
    pub name: String,
    pub modified: DateTime<Utc>,
    pub content: serde_json::Value,
}

/// List all snapshots, oldest first, with their content
pub async fn list_surfaces(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SurfaceListing>>, ApiError> {
    let mut listings = Vec::new();
    for entry in state.catalog.list()? {
        let text = state.catalog.read(&entry.name)?;
        match serde_json::from_str(&text) {
            Ok(content) => listings.push(SurfaceListing {
                name: entry.name,
                modified: entry.modified,
                content,
            }),
            Err(e) => warn!(file = %entry.name, error = %e, "Skipping unreadable snapshot"),
        }
    }
    Ok(Json(listings))
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub current: Option<String>,
}

/// The snapshot after `current`, wrapping around
pub async fn next_surface(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextQuery>,
) -> Result<Json<NextSnapshot>, ApiError> {
    let next = state.catalog.next_after(query.current.as_deref())?;
    debug!(file = %next.filename, index = next.current_index, total = next.total_files, "Next snapshot");
    Ok(Json(next))
}

/// Raw snapshot document
pub async fn get_surface(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let content = state.catalog.read(&filename)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], content).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub filename: Option<String>,
}

/// Triangulate a snapshot's surface samples into a mesh document
pub async fn parse_surface(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<SceneObjectDocument>, ApiError> {
    let filename = req
        .filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::BadRequest("filename is required".to_string()))?;

    let payload = state.catalog.load_survey(&filename)?;
    let (points, dropped) = payload.surface_samples();
    if dropped > 0 {
        warn!(file = %filename, dropped, "Dropped invalid surface samples");
    }

    let mesh = triangulate(&filename, &points)?;
    debug!(file = %filename, triangles = mesh.triangle_count(), "Built surface mesh");
    Ok(Json(SceneObjectDocument::Mesh(mesh)))
}
