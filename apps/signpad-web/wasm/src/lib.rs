//! WASM bindings for the signature compositing pipeline
//!
//! Documents, captures and the save flag live in Rust; the host page only
//! renders pages, runs the capture pad and hands over its output.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { SignpadSession, signDocument } from './pkg/signpad_wasm.js';
//!
//! await init();
//!
//! const session = new SignpadSession(JSON.stringify({ overlapPolicy: "reject" }));
//! session.addDocument("lease", pdfBase64, JSON.stringify([{ left: 5, top: 7, width: 8, height: 4, page: 1 }]));
//! session.attachSignature("lease", pad.toSVG(), pad.toDataURL("image/png"));
//! const results = session.save(); // { lease: { signedDocument, signatureImage } }
//! ```

pub mod session;

use signpad_core::capture::{CapturedSignature, SignatureRaster};
use signpad_core::payload::decode_payload;
use signpad_core::placement::SignaturePlacement;
use signpad_core::{SignpadConfig, SignpadError};
use wasm_bindgen::prelude::*;

pub use session::SignpadSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"Signpad WASM initialized".into());
}

/// Get the library version
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Centimeters to points on a page with the given `UserUnit`
#[wasm_bindgen(js_name = cmToPoints)]
pub fn cm_to_points(cm: f64, user_unit: f64) -> f64 {
    signpad_core::units::cm_to_points(cm, user_unit)
}

/// Points back to centimeters
#[wasm_bindgen(js_name = pointsToCm)]
pub fn points_to_cm(points: f64, user_unit: f64) -> f64 {
    signpad_core::units::points_to_cm(points, user_unit)
}

pub(crate) fn to_js_error(e: SignpadError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

pub(crate) fn serialize<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Parse a JSON placement list; blank input means "use the default placement"
pub(crate) fn parse_placements(json: &str) -> Result<Vec<SignaturePlacement>, SignpadError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json).map_err(|e| SignpadError::InvalidPayload(format!("placements: {}", e)))
}

/// Parse the capture pad's output into a signature and its raster
pub(crate) fn parse_capture(
    svg: &str,
    png_data_uri: &str,
    config: &SignpadConfig,
) -> Result<(CapturedSignature, SignatureRaster), SignpadError> {
    let signature = CapturedSignature::from_svg_with_defaults(svg, &config.default_stroke)
        .ok_or(SignpadError::NoSignature)?;
    let raster = SignatureRaster::from_data_uri(png_data_uri)?;
    Ok((signature, raster))
}

fn sign_document_internal(
    pdf: &str,
    placements_json: &str,
    svg: &str,
    png_data_uri: &str,
    config_json: Option<String>,
) -> Result<Option<signpad_core::SignedDocument>, SignpadError> {
    let config = match config_json {
        Some(json) if !json.trim().is_empty() => SignpadConfig::from_json(&json)?,
        _ => SignpadConfig::default(),
    };
    let pdf = decode_payload(pdf)?;
    let placements = parse_placements(placements_json)?;
    let (signature, raster) = match parse_capture(svg, png_data_uri, &config) {
        Ok(capture) => capture,
        Err(SignpadError::NoSignature) => return Ok(None),
        Err(e) => return Err(e),
    };
    signpad_core::sign_document(&pdf, &signature, &raster, &placements, &config)
}

/// Sign one document without a session.
///
/// `pdf` is base64 or a data URI. Returns `{ signedDocument, signatureImage }`,
/// `null` when nothing was drawn, and throws when the PDF cannot be read.
#[wasm_bindgen(js_name = signDocument)]
pub fn sign_document(
    pdf: &str,
    placements_json: &str,
    svg: &str,
    png_data_uri: &str,
    config_json: Option<String>,
) -> Result<JsValue, JsValue> {
    match sign_document_internal(pdf, placements_json, svg, png_data_uri, config_json) {
        Ok(Some(signed)) => serialize(&signed.result),
        Ok(None) => Ok(JsValue::NULL),
        Err(e) => Err(to_js_error(e)),
    }
}
