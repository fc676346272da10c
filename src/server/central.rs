// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Central authority routes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::{health, traced, ApiError, LoginRequest, LoginResponse};
use crate::central::CentralService;
use crate::chunk::WireChunk;
use crate::content::{CatalogEntry, ContentId};
use crate::transport::UserSnapshot;

/// Body of `POST /sync-chunk`. Fields are optional so a missing one gets a
/// specific message; other rejections also map to 400.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SyncChunkBody {
    content_id: Option<ContentId>,
    chunk_index: Option<u64>,
}

pub fn central_router(central: Arc<CentralService>) -> Router {
    let routes = Router::new()
        .route("/login", post(login))
        .route("/content", get(catalog))
        .route("/download/{id}", get(download))
        .route("/sync-chunk", post(sync_chunk))
        .route("/auth/sync", post(user_snapshot))
        .route("/health", get(|| async { health("central") }))
        .with_state(central);
    traced(routes)
}

async fn login(
    State(central): State<Arc<CentralService>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(body) = body?;
    let (username, password) = body.credentials()?;
    let token = central.login(username, password)?;
    Ok(Json(LoginResponse { token }))
}

async fn catalog(State(central): State<Arc<CentralService>>) -> Json<Vec<CatalogEntry>> {
    Json(central.catalog())
}

async fn download(
    State(central): State<Arc<CentralService>>,
    Path(id): Path<ContentId>,
) -> Result<Response, ApiError> {
    let units = central.download(id)?;
    let body = Body::from_stream(futures::stream::iter(units));
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response())
}

async fn sync_chunk(
    State(central): State<Arc<CentralService>>,
    body: Result<Json<SyncChunkBody>, JsonRejection>,
) -> Result<Json<WireChunk>, ApiError> {
    let Json(body) = body?;
    let (Some(content_id), Some(chunk_index)) = (body.content_id, body.chunk_index) else {
        return Err(ApiError::BadRequest("content_id and chunk_index are required".into()));
    };
    Ok(Json(central.sync_chunk(content_id, chunk_index)?))
}

async fn user_snapshot(State(central): State<Arc<CentralService>>) -> Json<UserSnapshot> {
    Json(UserSnapshot {
        users: central.user_snapshot(),
    })
}
