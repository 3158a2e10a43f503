use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::SonicError;

pub const DEFAULT_FALLBACK: &str = "Request failed";

/// Status and full body text of a finished call. The body is read before
/// the status is inspected so error payloads are never lost.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub async fn read(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|err| {
            log::debug!("Could not read response body ({}): {}", status, err);
            String::new()
        });
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn error(&self, fallback: &str) -> SonicError {
        SonicError::Api {
            status: self.status.as_u16(),
            message: resolve_error_message(self.status.as_u16(), &self.body, fallback),
        }
    }

    /// Body of a 2xx response, or the normalized API error otherwise.
    pub fn into_body(self, fallback: &str) -> Result<String, SonicError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(self.error(fallback))
        }
    }
}

/// Error text for a failed call: the JSON `detail` field when present,
/// otherwise the raw body, otherwise `"{fallback} (status {status})"`.
pub fn resolve_error_message(status: u16, body: &str, fallback: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match json.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => return detail.clone(),
            Some(Value::Null) | Some(Value::String(_)) | Some(Value::Bool(false)) | None => {}
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => {}
            Some(other) => return other.to_string(),
        }
    }

    if body.is_empty() {
        format!("{} (status {})", fallback, status)
    } else {
        body.to_string()
    }
}

/// Empty body is "no data"; anything else must be JSON.
pub fn parse_json(body: &str) -> Result<Option<Value>, SonicError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|err| SonicError::Protocol(format!("Response body is not valid JSON: {}", err)))
}

pub fn decode_optional<T: DeserializeOwned>(body: &str) -> Result<Option<T>, SonicError> {
    match parse_json(body)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|err| SonicError::Protocol(format!("Unexpected response shape: {}", err))),
        None => Ok(None),
    }
}

pub fn decode_required<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, SonicError> {
    decode_optional(body)?
        .ok_or_else(|| SonicError::Protocol(format!("Empty response body for {}", what)))
}

/// Decodes a JSON array, skipping entries that do not match `T`. Anything
/// other than an array yields an empty list.
pub fn lenient_list<T: DeserializeOwned>(value: Option<Value>, what: &str) -> Vec<T> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(_) => {
            log::warn!("Expected a list of {}, got a different shape; treating as empty", what);
            return Vec::new();
        }
        None => return Vec::new(),
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                log::warn!("Skipping malformed {} entry #{}: {}", what, idx, err);
                None
            }
        })
        .collect()
}

/// Unwraps `{ <key>: [...] }`. A missing envelope or key is an empty list.
pub fn envelope_list<T: DeserializeOwned>(value: Option<Value>, key: &str) -> Vec<T> {
    let inner = match value {
        Some(Value::Object(mut map)) => map.remove(key),
        _ => None,
    };
    match inner {
        Some(list @ Value::Array(_)) => lenient_list(Some(list), key),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn prefers_json_detail() {
        let msg = resolve_error_message(403, r#"{"detail":"API key revoked"}"#, DEFAULT_FALLBACK);
        assert_eq!(msg, "API key revoked");
    }

    #[test]
    fn renders_structured_detail() {
        let msg = resolve_error_message(422, r#"{"detail":[{"loc":["query"],"msg":"bad"}]}"#, DEFAULT_FALLBACK);
        assert_eq!(msg, r#"[{"loc":["query"],"msg":"bad"}]"#);
    }

    #[test]
    fn falls_back_to_raw_text() {
        assert_eq!(resolve_error_message(502, "Bad Gateway", DEFAULT_FALLBACK), "Bad Gateway");
        let json_without_detail = r#"{"error":"nope"}"#;
        assert_eq!(resolve_error_message(400, json_without_detail, DEFAULT_FALLBACK), json_without_detail);
        assert_eq!(resolve_error_message(400, r#"{"detail":""}"#, DEFAULT_FALLBACK), r#"{"detail":""}"#);
    }

    #[test]
    fn falsy_detail_falls_back_to_raw_text() {
        let zero = r#"{"detail":0}"#;
        assert_eq!(resolve_error_message(400, zero, DEFAULT_FALLBACK), zero);
        let zero_float = r#"{"detail":0.0}"#;
        assert_eq!(resolve_error_message(400, zero_float, DEFAULT_FALLBACK), zero_float);
        assert_eq!(resolve_error_message(400, r#"{"detail":7}"#, DEFAULT_FALLBACK), "7");
    }

    #[test]
    fn falls_back_to_status_phrase() {
        assert_eq!(resolve_error_message(500, "", DEFAULT_FALLBACK), "Request failed (status 500)");
        assert_eq!(
            resolve_error_message(503, "", "Failed to fetch invoices"),
            "Failed to fetch invoices (status 503)"
        );
    }

    #[test]
    fn empty_body_is_no_data() {
        assert!(parse_json("").unwrap().is_none());
        assert!(parse_json("  \n").unwrap().is_none());
        assert!(decode_optional::<Item>("").unwrap().is_none());
    }

    #[test]
    fn non_json_success_body_is_protocol_error() {
        assert!(matches!(parse_json("<html>"), Err(SonicError::Protocol(_))));
        assert!(matches!(decode_required::<Item>("", "item"), Err(SonicError::Protocol(_))));
    }

    #[test]
    fn envelope_defaults_to_empty() {
        let missing: Vec<Item> = envelope_list(Some(serde_json::json!({"count": 0})), "meters");
        let wrong_type: Vec<Item> = envelope_list(Some(serde_json::json!({"meters": "x"})), "meters");
        let not_object: Vec<Item> = envelope_list(Some(serde_json::json!([{"id": "a"}])), "meters");
        let none: Vec<Item> = envelope_list(None, "meters");

        assert!(missing.is_empty());
        assert!(wrong_type.is_empty());
        assert!(not_object.is_empty());
        assert!(none.is_empty());
    }

    #[test]
    fn lenient_list_skips_bad_entries() {
        let items: Vec<Item> = lenient_list(
            Some(serde_json::json!([{"id": "a"}, {"name": "no id"}, {"id": "b"}])),
            "item",
        );
        assert_eq!(items, vec![Item { id: "a".into() }, Item { id: "b".into() }]);
    }
}
