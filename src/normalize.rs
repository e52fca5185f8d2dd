//! Completion normalization.
//!
//! The model is asked for a bare JSON object but in practice replies with
//! Markdown code fences, plain prose, string-only link lists, or objects
//! missing fields. [`normalize_completion`] turns any of these into a
//! [`QaResponse`] without failing.
//!
//! # Rules
//!
//! | Input | Result |
//! |-------|--------|
//! | ```` ```json\n{..}\n``` ```` | fence removed, then parsed |
//! | not JSON, or JSON but not an object | raw text echoed after [`INVALID_JSON_PREFIX`] |
//! | `answer` string / number / bool | used as text |
//! | `answer` missing or null | [`MISSING_ANSWER`] |
//! | `links: ["https://…"]` | `{url, text: "Related discussion"}` |
//! | `links: [{url, text}]` | kept; missing `text` gets the default |
//! | link without a string `url`, or a non-string non-object entry | dropped |
//! | `links` missing or not an array | empty |

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::models::{Link, QaResponse};

/// Prefix of the answer returned when the completion is not a JSON object.
pub const INVALID_JSON_PREFIX: &str = "GPT did not return valid JSON. Here's what it returned:";

/// Answer used when the JSON object has no usable `answer` field.
pub const MISSING_ANSWER: &str = "The model returned a response without an answer.";

/// Link text used for bare-URL links.
pub const DEFAULT_LINK_TEXT: &str = "Related discussion";

fn opening_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[a-zA-Z]*\n?").expect("valid regex"))
}

fn closing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n?```$").expect("valid regex"))
}

/// Trims `text` and, if it opens with a code fence, removes the opening
/// fence (with its language tag) and a closing fence at the very end.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let without_open = opening_fence().replace(trimmed, "");
    closing_fence().replace(&without_open, "").into_owned()
}

/// Converts a raw completion into a well-formed [`QaResponse`].
pub fn normalize_completion(raw: &str) -> QaResponse {
    let cleaned = strip_code_fence(raw);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(obj)) => from_object(&obj),
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "completion JSON is not an object");
            invalid_json(&cleaned)
        }
        Err(e) => {
            tracing::warn!(error = %e, completion = %cleaned, "completion is not valid JSON");
            invalid_json(&cleaned)
        }
    }
}

fn invalid_json(cleaned: &str) -> QaResponse {
    QaResponse::message(format!("{}\n\n{}", INVALID_JSON_PREFIX, cleaned))
}

fn from_object(obj: &Map<String, Value>) -> QaResponse {
    let answer = match obj.get("answer") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => {
            tracing::warn!(kind = json_kind(other), "completion answer has unexpected type");
            MISSING_ANSWER.to_string()
        }
        None => MISSING_ANSWER.to_string(),
    };

    let links = match obj.get("links") {
        Some(Value::Array(items)) => items.iter().filter_map(normalize_link).collect(),
        _ => Vec::new(),
    };

    QaResponse { answer, links }
}

fn normalize_link(item: &Value) -> Option<Link> {
    match item {
        Value::String(url) => Some(Link {
            url: url.clone(),
            text: DEFAULT_LINK_TEXT.to_string(),
        }),
        Value::Object(obj) => {
            let url = obj.get("url")?.as_str()?.to_string();
            let text = obj
                .get("text")
                .and_then(|t| t.as_str())
                .unwrap_or(DEFAULT_LINK_TEXT)
                .to_string();
            Some(Link { url, text })
        }
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
