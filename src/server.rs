//! Mock responses-API HTTP server.
//!
//! Answers chat-style requests from the knowledge snapshot using the
//! [`Matcher`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/v1/chat/completions` | Answer a query |
//! | `POST` | `/v1/responses` | Same handler |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Bodies are parsed leniently. Anything that is not a recognised JSON
//! shape is answered as the query `unknown`, and a missing knowledge file
//! is reported inside the reply text. Every documented path returns 200.
//!
//! With `"stream": true` the reply is sent as `text/event-stream`, one
//! `data: <json>` record per event.

use axum::{
    body::Bytes,
    extract::State,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream;
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::knowledge::{KnowledgeBase, KnowledgeStore};
use crate::matcher::Matcher;
use crate::responses::{
    completed_response, extract_query, request_model, stream_events, wants_stream, ResponseIds,
};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    knowledge: Arc<KnowledgeStore>,
    matcher: Arc<Matcher>,
    default_model: Arc<str>,
}

/// Builds the router. Reads the knowledge snapshot unless the config asks
/// for per-request reloads.
pub fn build_router(config: &Config) -> anyhow::Result<Router> {
    let knowledge = KnowledgeStore::open(config)?;

    if !config.server.reload_per_request {
        match &*knowledge.snapshot() {
            KnowledgeBase::Loaded(chunks) => {
                tracing::info!(
                    path = %knowledge.path().display(),
                    chunks = chunks.len(),
                    "loaded knowledge snapshot"
                );
            }
            KnowledgeBase::Missing(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "knowledge file not found, replies will carry a warning"
                );
            }
        }
    }

    let state = AppState {
        knowledge: Arc::new(knowledge),
        matcher: Arc::new(Matcher::new(&config.matcher)),
        default_model: Arc::from(config.server.default_model.as_str()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/v1/chat/completions", post(handle_chat))
        .route("/v1/responses", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state))
}

/// Starts the server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = build_router(config)?;
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "mock responses server listening");
    println!("Mock responses server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /v1/responses ============

async fn handle_chat(State(state): State<AppState>, body: Bytes) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let query = extract_query(&body);
    let knowledge = state.knowledge.snapshot();
    let reply = state.matcher.reply(&query, &knowledge);
    let model = request_model(&body, &state.default_model);
    let streaming = wants_stream(&body);
    let ids = ResponseIds::now();

    tracing::info!(stream = streaming, chunks = knowledge.len(), model = %model, "answered query");

    if !streaming {
        return Json(completed_response(&reply, &model, &ids)).into_response();
    }

    let events = stream_events(&reply, &model, &ids)
        .into_iter()
        .map(|event| Event::default().json_data(&event))
        .collect::<Result<Vec<Event>, _>>();

    match events {
        Ok(events) => Sse::new(stream::iter(events.into_iter().map(Ok::<_, Infallible>)))
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode stream events");
            Json(completed_response(&reply, &model, &ids)).into_response()
        }
    }
}
