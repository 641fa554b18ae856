// Prompt synthesis and screenshot attachment

use crate::request::AnalysisRequest;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use phishwatch_model::{ContentPart, PromptPayload};
use image::ImageFormat;
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};

/// Hard cap on DOM characters embedded in the prompt
pub const MAX_DOM_CHARS: usize = 5000;

#[derive(Error, Debug)]
pub enum ImageDecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("empty image payload")]
    Empty,

    #[error("unrecognized image data: {0}")]
    Image(#[from] image::ImageError),
}

/// Build the text prompt and, when possible, the screenshot part.
pub fn assemble(request: &AnalysisRequest) -> PromptPayload {
    let payload = PromptPayload::new(build_prompt(request));

    let Some(ref image_b64) = request.image_b64 else {
        return payload;
    };

    match decode_screenshot(image_b64) {
        Ok(part) => {
            debug!("Screenshot attached to prompt");
            payload.with_image(part)
        }
        Err(e) => {
            warn!(error = %e, "Failed to process screenshot, continuing text-only");
            payload
        }
    }
}

pub fn build_prompt(request: &AnalysisRequest) -> String {
    let dom = truncate_chars(&request.dom_signature, MAX_DOM_CHARS);

    format!(
        r#"You are a phishing detection AI.

Evaluate the following webpage:

URL: {url}
Hostname: {hostname}

Forms found: {forms}

DOM content:
{dom}

Decide whether the site is Safe, Suspicious or Dangerous.

Return ONLY valid JSON with exactly these keys:
{{
    "risk_score": <integer 0-100>,
    "risk_label": "Safe" | "Suspicious" | "Dangerous",
    "analysis": "<short explanation>",
    "screenshot": "<short points about the screenshot if one is attached, including any red flags it shows>"
}}
"#,
        url = request.url,
        hostname = request.hostname,
        forms = request.form_count(),
        dom = dom,
    )
}

/// Decode a base64 screenshot, optionally prefixed with a data URI header.
///
/// PNG, JPEG and WebP bytes are forwarded as-is; any other decodable format
/// is re-encoded to PNG so the model only ever sees types it accepts.
pub fn decode_screenshot(image_b64: &str) -> Result<ContentPart, ImageDecodeError> {
    // Line-wrapped base64 is common from some collectors
    let encoded: String = strip_data_uri(image_b64)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if encoded.is_empty() {
        return Err(ImageDecodeError::Empty);
    }

    let bytes = STANDARD.decode(&encoded)?;
    if bytes.is_empty() {
        return Err(ImageDecodeError::Empty);
    }

    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    debug!(
        format = ?format,
        width = decoded.width(),
        height = decoded.height(),
        "Decoded screenshot"
    );

    if is_forwardable(format) {
        return Ok(ContentPart::image(format.to_mime_type(), encoded));
    }

    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    debug!(from = ?format, bytes = png.len(), "Re-encoded screenshot as PNG");
    Ok(ContentPart::image(
        ImageFormat::Png.to_mime_type(),
        STANDARD.encode(&png),
    ))
}

fn is_forwardable(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP
    )
}

/// Everything up to and including the first comma is treated as a data URI header.
pub fn strip_data_uri(value: &str) -> &str {
    match value.split_once(',') {
        Some((_, rest)) => rest,
        None => value,
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
