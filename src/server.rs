use crate::config::{RelayConfig, BODY_LIMIT_BYTES};
use crate::error::RelayError;
use crate::logging::{RequestLog, SharedLogger};
use crate::payload::audio::TranscribeRequest;
use crate::payload::translation::{self, TranslateRequest};
use crate::upstream;

use axum::async_trait;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, FromRequest, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const HEALTH_MESSAGE: &str = "✅ Whisper proxy online";

#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub client: reqwest::Client,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_online))
        .route("/test", get(handle_online))
        .route("/health", get(handle_health))
        .route("/chat", post(handle_chat))
        .route("/translate", post(handle_translate))
        .route("/transcribe", post(handle_transcribe))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A client body as JSON bytes. JSON arrives untouched, url-encoded forms are
/// converted, and an empty body reads as `{}`.
pub struct ClientJson(pub Bytes);

impl ClientJson {
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, RelayError> {
        serde_json::from_slice(&self.0)
            .map_err(|e| RelayError::validation(format!("Invalid request body: {}", e)))
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for ClientJson
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(req.headers()) {
            let Form(value) = Form::<serde_json::Value>::from_request(req, state)
                .await
                .map_err(|e| rejection(e.status(), e.body_text()))?;
            let body = serde_json::to_vec(&value)
                .map_err(|e| RelayError::from(e).into_response())?;
            return Ok(Self(Bytes::from(body)));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Bytes::from_static(b"{}")));
        }

        serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(|e| {
            RelayError::validation(format!("Invalid JSON body: {}", e)).into_response()
        })?;

        Ok(Self(body))
    }
}

/// Extractor rejections in the `{ "error": ... }` shape. An oversized body keeps
/// its 413; every other rejection is a validation error.
fn rejection(status: StatusCode, message: String) -> Response {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return (status, Json(serde_json::json!({ "error": message }))).into_response();
    }
    RelayError::validation(message).into_response()
}

async fn handle_online() -> &'static str {
    HEALTH_MESSAGE
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_chat(State(state): State<Arc<AppState>>, ClientJson(body): ClientJson) -> Response {
    let log = state.logger.request("chat");

    match upstream::forward_chat(body, &state.config, &state.client, &log).await {
        Ok(resp) => json_bytes(resp),
        Err(e) => failure(&log, e),
    }
}

async fn handle_translate(State(state): State<Arc<AppState>>, body: ClientJson) -> Response {
    let log = state.logger.request("translate");

    let req: TranslateRequest = match body.parse() {
        Ok(r) => r,
        Err(e) => return failure(&log, e),
    };

    let chat = translation::build_chat_request(&req, &state.config);

    match upstream::complete_chat(&chat, &state.config, &state.client, &log).await {
        Ok(resp) => Json(translation::first_message(&resp)).into_response(),
        Err(e) => failure(&log, e),
    }
}

async fn handle_transcribe(State(state): State<Arc<AppState>>, body: ClientJson) -> Response {
    let log = state.logger.request("transcribe");

    let upload = match body
        .parse::<TranscribeRequest>()
        .and_then(|req| req.into_upload(&state.config))
    {
        Ok(u) => u,
        Err(e) => return failure(&log, e),
    };

    match upstream::transcribe(upload, &state.config, &state.client, &log).await {
        Ok(resp) => json_bytes(resp),
        Err(e) => failure(&log, e),
    }
}

/// Provider JSON, byte for byte.
fn json_bytes(body: Bytes) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn failure(log: &RequestLog, err: RelayError) -> Response {
    log.error(format!(
        "{} ERROR ({}): {}",
        log.endpoint().to_uppercase(),
        err.status_code().as_u16(),
        err.detail()
    ));
    err.into_response()
}
