//! Output Normalization
//!
//! Providers answer in different shapes: markdown-fenced HTML, bare text,
//! image URLs, base64 blobs. These helpers turn them into the payloads a
//! result entry stores.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde_json::Value;

use crate::constants::image as image_constants;

static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").ok());

/// Unwrap the first markdown code fence, if the text contains one.
///
/// Unfenced text is returned unchanged. An unterminated opening fence
/// (truncated response) drops just the fence line.
pub fn unwrap_code_fence(text: &str) -> String {
    if let Some(re) = FENCED_BLOCK.as_ref()
        && let Some(caps) = re.captures(text)
        && let Some(body) = caps.get(1)
    {
        return body.as_str().trim_end().to_string();
    }

    let trimmed = text.trim_start();
    if trimmed.starts_with("```")
        && let Some(first_newline) = trimmed.find('\n')
    {
        return trimmed[first_newline + 1..].trim_end().to_string();
    }

    text.to_string()
}

/// First usable URL in a prediction `output`.
///
/// Accepts a bare string, an array (first usable element), or an object
/// carrying `url`.
pub fn first_output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(first_output_url),
        Value::Object(map) => map.get("url").and_then(first_output_url),
        _ => None,
    }
}

pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:")
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// MIME type for fetched image bytes.
///
/// Prefers the response content type when it names an image, then the URL
/// extension, then JPEG (what the image adapter requests).
pub fn image_mime(content_type: Option<&str>, url: &str) -> String {
    if let Some(ct) = content_type {
        let essence = ct.split(';').next().unwrap_or(ct).trim().to_lowercase();
        if essence.starts_with("image/") {
            return essence;
        }
    }

    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    let guessed = match path.rsplit('.').next() {
        Some("png") => Some("image/png"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("jpg") | Some("jpeg") => Some("image/jpeg"),
        _ => None,
    };

    guessed.unwrap_or(image_constants::DEFAULT_MIME).to_string()
}
