// Turning free-form model output back into a Verdict

use crate::verdict::{RiskLabel, Verdict};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

const FENCE: &str = "```";

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model output is JSON but not an object")]
    NotAnObject,
}

/// Recover a verdict from raw model text, falling back to the fail-closed
/// verdict when nothing usable can be extracted. Never fails.
pub fn recover(raw_text: &str) -> Verdict {
    debug!(raw = %raw_text, "Model raw response");

    match try_recover(raw_text) {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(
                error = %e,
                raw = %raw_text,
                "Failed to parse model output, using fallback verdict"
            );
            Verdict::fallback()
        }
    }
}

pub fn try_recover(raw_text: &str) -> Result<Verdict, RecoveryError> {
    let cleaned = strip_code_fences(raw_text);
    let object = extract_json_object(cleaned).ok_or(RecoveryError::NoJsonObject)?;
    let value: Value = serde_json::from_str(object)?;

    match value {
        Value::Object(fields) => Ok(coerce_verdict(&fields)),
        _ => Err(RecoveryError::NotAnObject),
    }
}

/// Remove every leading and trailing markdown fence, including a language
/// tag after an opening fence (```json, ```JSON, ...).
pub fn strip_code_fences(text: &str) -> &str {
    let mut current = text.trim();

    loop {
        let before = current.len();

        if let Some(rest) = current.strip_prefix(FENCE) {
            current = skip_language_tag(rest).trim_start();
        }
        if let Some(rest) = current.strip_suffix(FENCE) {
            current = rest.trim_end();
        }

        if current.len() == before {
            return current;
        }
    }
}

fn skip_language_tag(text: &str) -> &str {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .unwrap_or(text.len());
    &text[end..]
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn coerce_verdict(fields: &Map<String, Value>) -> Verdict {
    Verdict {
        risk_score: fields.get("risk_score").and_then(coerce_score),
        risk_label: fields
            .get("risk_label")
            .and_then(Value::as_str)
            .and_then(RiskLabel::parse),
        analysis: fields.get("analysis").and_then(coerce_text),
        screenshot_notes: fields
            .get("screenshot")
            .or_else(|| fields.get("screenshot_notes"))
            .and_then(coerce_text),
    }
}

fn coerce_score(value: &Value) -> Option<u8> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !score.is_finite() {
        return None;
    }
    Some(score.round().clamp(0.0, 100.0) as u8)
}

// Models sometimes answer with a list of bullet points instead of a string
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let lines: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if lines.is_empty() {
                None
            } else {
                Some(lines.join("\n"))
            }
        }
        _ => None,
    }
}
