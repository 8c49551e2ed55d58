//! Wire format of the remote batch API and the live/dead decision rule.
//!
//! Request:
//!
//! ```text
//! {"batch": [{"method": "GET", "relative_url": "<id>/picture?..."}, ...], "include_headers": false}
//! ```
//!
//! Response: a JSON array with one entry per sub-request, each either `null`
//! or `{"code": 200, "body": "{\"data\":{\"url\":\"...\"}}"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CheckerError, Result};
use crate::types::result::CheckOutcome;

#[derive(Debug, Serialize)]
pub struct BatchRequest {
    pub batch: Vec<SubRequest>,
    pub include_headers: bool,
}

#[derive(Debug, Serialize)]
pub struct SubRequest {
    pub method: &'static str,
    pub relative_url: String,
}

impl BatchRequest {
    pub fn from_relative_urls(urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            batch: urls
                .into_iter()
                .map(|relative_url| SubRequest {
                    method: "GET",
                    relative_url,
                })
                .collect(),
            include_headers: false,
        }
    }
}

/// One entry of the batch response.
#[derive(Debug, Deserialize)]
pub struct SubResponse {
    #[serde(alias = "statusCode")]
    pub code: u16,
    /// Usually a JSON document encoded as a string; a bare object is accepted too.
    #[serde(default)]
    pub body: Value,
}

#[derive(Debug, Deserialize)]
struct ResourceBody {
    data: ResourceData,
}

#[derive(Debug, Deserialize)]
struct ResourceData {
    url: String,
}

impl SubResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// The resource URL carried by the body, if the body has one.
    pub fn resource_url(&self) -> Option<String> {
        let parsed: ResourceBody = match &self.body {
            Value::String(raw) => serde_json::from_str(raw).ok()?,
            Value::Object(_) => serde_json::from_value(self.body.clone()).ok()?,
            _ => return None,
        };
        Some(parsed.data.url)
    }
}

/// Split a raw batch response into per-sub-request entries.
///
/// `null` entries stay in place as `Value::Null` so positions line up with
/// the request.
pub fn parse_batch_response(raw: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(entries) => Ok(entries),
        other => Err(CheckerError::ResponseShape(format!(
            "expected an array of sub-responses, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decide one identifier's outcome from its sub-response entry.
pub fn classify(entry: Option<&Value>, placeholder_marker: &str) -> CheckOutcome {
    let entry = match entry {
        None | Some(Value::Null) => return CheckOutcome::unknown("missing sub-response"),
        Some(entry) => entry,
    };

    let sub: SubResponse = match serde_json::from_value(entry.clone()) {
        Ok(sub) => sub,
        Err(_) => return CheckOutcome::unknown("unparsable sub-response"),
    };

    if !sub.is_success() {
        return CheckOutcome::unknown(format!("sub-response status {}", sub.code));
    }

    match sub.resource_url() {
        None => CheckOutcome::unknown("unparsable sub-response body"),
        Some(url) if url.contains(placeholder_marker) => CheckOutcome::Dead,
        Some(resource_url) => CheckOutcome::Live { resource_url },
    }
}
