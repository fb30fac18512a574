//! Base64 and data URI handling for host payloads

use crate::error::SignpadError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

pub const PDF_MIME: &str = "application/pdf";
pub const PNG_MIME: &str = "image/png";

/// A decoded `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    /// Parse `data:<mime>;base64,<payload>`. Only base64 payloads are accepted.
    pub fn parse(uri: &str) -> Result<Self, SignpadError> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| SignpadError::InvalidPayload("Missing data: prefix".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| SignpadError::InvalidPayload("Missing data URI separator".to_string()))?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(SignpadError::InvalidPayload(
                "Only base64 data URIs are supported".to_string(),
            ));
        }

        Ok(Self {
            mime_type,
            bytes: decode_base64(data)?,
        })
    }
}

/// Decode base64 text, ignoring embedded whitespace and line breaks
pub fn decode_base64(data: &str) -> Result<Vec<u8>, SignpadError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|e| SignpadError::InvalidPayload(e.to_string()))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode a host-supplied payload given either as a data URI or as bare base64
pub fn decode_payload(input: &str) -> Result<Vec<u8>, SignpadError> {
    if input.trim_start().starts_with("data:") {
        Ok(DataUri::parse(input)?.bytes)
    } else {
        decode_base64(input)
    }
}
