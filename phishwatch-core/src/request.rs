// Inbound analysis requests from the browser collector

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

/// Characters of raw body shown in debug logs
const BODY_PREVIEW_CHARS: usize = 800;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing URL or DOM")]
    MissingRequiredField,
}

impl RequestError {
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::MissingRequiredField => "missing_required_field",
        }
    }
}

/// A validated page snapshot ready for prompting
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub url: String,
    pub hostname: String,
    pub dom_signature: String,
    /// Opaque form descriptors; only the count is used.
    pub forms: Vec<Value>,
    pub image_b64: Option<String>,
}

impl AnalysisRequest {
    /// Parse and normalize a raw request body.
    ///
    /// Bodies that are not valid JSON are treated as an empty mapping, which
    /// then fails validation.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, RequestError> {
        debug!(
            bytes = body.len(),
            preview = %body_preview(body),
            "Raw analysis request body"
        );
        let raw = serde_json::from_slice::<Value>(body).unwrap_or(Value::Null);
        normalize(&raw)
    }

    pub fn form_count(&self) -> usize {
        self.forms.len()
    }

    pub fn has_screenshot(&self) -> bool {
        self.image_b64.is_some()
    }
}

/// Extract and validate request fields from an untyped JSON value.
pub fn normalize(raw: &Value) -> Result<AnalysisRequest, RequestError> {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let url = string_field(fields, "url");
    let hostname = string_field(fields, "hostname");
    let dom_signature = string_field(fields, "dom_signature");
    let forms = fields
        .get("forms")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let image_b64 = Some(string_field(fields, "image_b64")).filter(|s| !s.is_empty());

    info!(
        url = %url,
        hostname = %hostname,
        dom_len = dom_signature.chars().count(),
        forms = forms.len(),
        screenshot = image_b64.is_some(),
        "Parsed analysis request"
    );

    if url.is_empty() || dom_signature.is_empty() {
        return Err(RequestError::MissingRequiredField);
    }

    Ok(AnalysisRequest {
        url,
        hostname,
        dom_signature,
        forms,
        image_b64,
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut preview: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
    if text.chars().count() > BODY_PREVIEW_CHARS {
        preview.push_str(" ... [truncated]");
    }
    preview
}
