// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Edge node routes. Content is listed and served for a single pool user.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::{health, traced, ApiError, LoginRequest, LoginResponse};
use crate::content::{CatalogEntry, ContentId};
use crate::edge::EdgeNode;

#[derive(Clone)]
struct EdgeState {
    edge: Arc<EdgeNode>,
    pool_user: Arc<str>,
}

pub fn edge_router(edge: Arc<EdgeNode>, pool_user: impl Into<Arc<str>>) -> Router {
    let state = EdgeState {
        edge,
        pool_user: pool_user.into(),
    };
    let routes = Router::new()
        .route("/login", post(login))
        .route("/content", get(catalog))
        .route("/download/{id}", get(download))
        .route("/health", get(|| async { health("edge") }))
        .with_state(state);
    traced(routes)
}

async fn login(
    State(state): State<EdgeState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(body) = body?;
    let (username, password) = body.credentials()?;
    let token = state.edge.login(username, password)?;
    Ok(Json(LoginResponse { token }))
}

async fn catalog(State(state): State<EdgeState>) -> Json<Vec<CatalogEntry>> {
    Json(state.edge.owned_catalog(&state.pool_user))
}

async fn download(
    State(state): State<EdgeState>,
    Path(id): Path<ContentId>,
) -> Result<Response, ApiError> {
    let bytes = state.edge.read_content(&state.pool_user, id)?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}
