//! Error types for the relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{message}")]
    Validation { message: String },

    /// Failure reported by (or while talking to) the provider. `detail` is what
    /// the caller sees under `error`.
    #[error("Upstream error: {detail}")]
    Upstream { status: Option<u16>, detail: Value },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RelayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Build an upstream error from a raw response body. JSON bodies are kept
    /// structured, anything else is surfaced as text.
    pub fn upstream(status: Option<u16>, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<Value>(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));
        Self::Upstream { status, detail }
    }

    /// Upstream failure with no response to forward (connect error, bad body).
    pub fn upstream_message(msg: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            detail: Value::String(msg.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream {
                status: Some(code), ..
            } => StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The value placed under `error` in the response body.
    pub fn detail(&self) -> Value {
        match self {
            Self::Upstream { detail, .. } => detail.clone(),
            Self::Validation { message } => Value::String(message.clone()),
            other => Value::String(other.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.detail() });
        (self.status_code(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
