//! Shaping between client payloads and the provider API.
//!
//! Everything here is pure (no I/O): building the translation chat request,
//! picking the reply out of a chat completion, and turning a base64 audio
//! payload into bytes ready for upload.

pub mod audio;
pub mod openai_types;
pub mod translation;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Read an optional field as text whatever JSON type the client sent.
/// `null` counts as absent; numbers, booleans and structures keep their JSON text.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "lenient_string")]
        field: Option<String>,
    }

    fn field(body: Value) -> Option<String> {
        serde_json::from_value::<Fields>(body).unwrap().field
    }

    #[test]
    fn test_lenient_string() {
        assert_eq!(field(json!({})), None);
        assert_eq!(field(json!({ "field": null })), None);
        assert_eq!(field(json!({ "field": "Hola" })).as_deref(), Some("Hola"));
        assert_eq!(field(json!({ "field": 123 })).as_deref(), Some("123"));
        assert_eq!(field(json!({ "field": true })).as_deref(), Some("true"));
        assert_eq!(field(json!({ "field": ["a"] })).as_deref(), Some(r#"["a"]"#));
    }
}
