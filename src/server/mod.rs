// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP surface for the central authority and for edge nodes.
//!
//! # Central routes
//! - `POST /login` - `{user|username, password}` → `{token}`
//! - `GET /content` - catalog `[{id, title, size, sha256}]`
//! - `GET /download/{id}` - raw bytes, one transformed unit per chunk
//! - `POST /sync-chunk` - `{content_id, chunk_index}` → base64 chunk
//! - `POST /auth/sync` - full credential snapshot
//! - `GET /health`
//!
//! # Edge routes
//! - `POST /login` - answered offline from the edge's credential copy
//! - `GET /content` - what the pool user holds at this edge
//! - `GET /download/{id}` - served from the edge cache
//! - `GET /health`

mod central;
mod edge;
mod error;

pub use central::central_router;
pub use edge::edge_router;
pub use error::ApiError;

use std::io;

use axum::http::Request;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Level;

/// Body of `POST /login`. Either `user` or `username` is accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub user: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// `(username, password)`, or 400 when either is missing.
    pub fn credentials(&self) -> Result<(&str, &str), ApiError> {
        let username = self
            .username
            .as_deref()
            .or(self.user.as_deref())
            .ok_or_else(|| ApiError::BadRequest("missing username".into()))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("missing password".into()))?;
        Ok((username, password))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    role: &'static str,
    version: &'static str,
}

fn health(role: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        role,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Request tracing shared by both routers.
fn traced(router: Router) -> Router {
    router.layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        tracing::span!(
            Level::INFO,
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
        )
    }))
}

/// Serve `router` until the listener fails.
pub async fn serve(listener: TcpListener, router: Router) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "starting server");
    }
    axum::serve(listener, router).await
}
