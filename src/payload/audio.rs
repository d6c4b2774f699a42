//! Base64 audio uploads from the mobile client.

use super::lenient_string;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;

pub const MISSING_AUDIO: &str = "audioBase64 saknas i body";

const DEFAULT_FILENAME: &str = "audio.wav";

/// Standard alphabet, padding optional, stray low bits in the last symbol ignored.
const AUDIO_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Body of `POST /transcribe`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub audio_base64: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prompt: Option<String>,
}

/// Decoded audio plus the form fields sent alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub model: String,
    pub prompt: Option<String>,
}

impl AudioUpload {
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// Drop a `data:<mime>;base64,` header: everything up to the last comma goes.
pub fn strip_data_uri(payload: &str) -> &str {
    match payload.rfind(',') {
        Some(idx) => &payload[idx + 1..],
        None => payload,
    }
}

/// Reduce a payload to canonical standard-alphabet symbols: URL-safe `-`/`_`
/// become `+`/`/`, padding and anything outside the alphabet is dropped, and a
/// lone final symbol (less than one byte of data) is discarded.
fn canonical_symbols(payload: &str) -> String {
    let mut symbols: String = payload
        .chars()
        .filter_map(|c| match c {
            '-' => Some('+'),
            '_' => Some('/'),
            'A'..='Z' | 'a'..='z' | '0'..='9' | '+' | '/' => Some(c),
            _ => None,
        })
        .collect();
    if symbols.len() % 4 == 1 {
        symbols.pop();
    }
    symbols
}

/// Decode the audio payload the way lenient base64 readers do: after the
/// data-URI prefix is gone, unreadable characters are skipped rather than
/// rejected, so any present payload yields bytes.
pub fn decode_audio(payload: &str) -> Vec<u8> {
    let symbols = canonical_symbols(strip_data_uri(payload));
    // Canonical symbols of a decodable length cannot fail.
    AUDIO_ENGINE.decode(symbols).unwrap_or_default()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl TranscribeRequest {
    /// Validate and decode into an upload. Missing or empty `audioBase64` is
    /// the only failure.
    pub fn into_upload(self, config: &RelayConfig) -> Result<AudioUpload> {
        let payload =
            non_empty(&self.audio_base64).ok_or_else(|| RelayError::validation(MISSING_AUDIO))?;

        let bytes = decode_audio(payload);

        Ok(AudioUpload {
            bytes,
            filename: non_empty(&self.filename)
                .unwrap_or(DEFAULT_FILENAME)
                .to_string(),
            model: non_empty(&self.model)
                .unwrap_or(&config.models.transcribe)
                .to_string(),
            prompt: non_empty(&self.prompt).map(str::to_string),
        })
    }
}
