use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::logging::RequestLog;
use crate::payload::audio::AudioUpload;
use crate::payload::openai_types::ChatCompletionRequest;

use bytes::Bytes;
use reqwest::multipart;
use reqwest::RequestBuilder;

const CHAT_PATH: &str = "chat/completions";
const TRANSCRIPTION_PATH: &str = "audio/transcriptions";

/// Attach the server-held credential. Without one the request goes out bare
/// and the provider answers 401, which is forwarded like any other failure.
fn authorize(builder: RequestBuilder, config: &RelayConfig) -> RequestBuilder {
    match config.api_key.as_deref() {
        Some(key) => builder.bearer_auth(key),
        None => builder,
    }
}

/// Send one request and return the raw 2xx body. Anything else becomes
/// `RelayError::Upstream` carrying the provider's status and body when there is one.
async fn send(builder: RequestBuilder, log: &RequestLog) -> Result<Bytes> {
    let response = builder
        .send()
        .await
        .map_err(|e| RelayError::upstream_message(format!("Request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| RelayError::upstream_message(format!("Failed to read response body: {}", e)))?;

    log.debug(format!("Response status={} body_len={}", status.as_u16(), body.len()));

    if !status.is_success() {
        return Err(RelayError::upstream(Some(status.as_u16()), &body));
    }

    Ok(body)
}

/// A 2xx body the client is promised to be JSON.
fn require_json(body: Bytes) -> Result<Bytes> {
    serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(|e| {
        RelayError::upstream_message(format!(
            "Provider returned a malformed response: {}. Body: {}",
            e,
            truncate(&String::from_utf8_lossy(&body), 300)
        ))
    })?;
    Ok(body)
}

/// Forward a client chat body to the provider without touching it.
pub async fn forward_chat(
    body: Bytes,
    config: &RelayConfig,
    client: &reqwest::Client,
    log: &RequestLog,
) -> Result<Bytes> {
    let url = config.endpoint(CHAT_PATH);
    log.info(format!("POST {} body_len={}", url, body.len()));

    let builder = client
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body);

    send(authorize(builder, config), log).await.and_then(require_json)
}

/// Run a chat completion built by the relay itself. The reply only has to be JSON;
/// its shape is left to the caller.
pub async fn complete_chat(
    req: &ChatCompletionRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    log: &RequestLog,
) -> Result<serde_json::Value> {
    let url = config.endpoint(CHAT_PATH);
    log.info(format!("POST {} model={}", url, req.model));

    let body = send(authorize(client.post(&url).json(req), config), log).await?;

    serde_json::from_slice(&body).map_err(|e| {
        RelayError::upstream_message(format!(
            "Failed to parse provider response: {}. Body: {}",
            e,
            truncate(&String::from_utf8_lossy(&body), 300)
        ))
    })
}

/// Upload decoded audio as multipart form data. The outbound body has no size cap.
pub async fn transcribe(
    upload: AudioUpload,
    config: &RelayConfig,
    client: &reqwest::Client,
    log: &RequestLog,
) -> Result<Bytes> {
    let url = config.endpoint(TRANSCRIPTION_PATH);
    log.info(format!(
        "POST {} model={} file={} bytes={}",
        url,
        upload.model,
        upload.filename,
        upload.bytes.len()
    ));

    let mime = upload.mime_type();
    let file_part = multipart::Part::bytes(upload.bytes)
        .file_name(upload.filename)
        .mime_str(&mime)?;

    let mut form = multipart::Form::new()
        .part("file", file_part)
        .text("model", upload.model);

    if let Some(prompt) = upload.prompt {
        form = form.text("prompt", prompt);
    }

    send(authorize(client.post(&url).multipart(form), config), log)
        .await
        .and_then(require_json)
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
