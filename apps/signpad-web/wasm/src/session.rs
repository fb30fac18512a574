//! Stateful signing session for the host page
//!
//! Wraps `signpad_core::SigningSession`. Each exported method has an
//! `_internal` twin returning `SignpadError` so it can be tested natively.

use crate::{parse_capture, parse_placements, serialize, to_js_error};
use signpad_core::payload::decode_payload;
use signpad_core::saver::BatchReport;
use signpad_core::session::DocumentSummary;
use signpad_core::{SignpadConfig, SignpadError, SigningSession, SourceDocument};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct SignpadSession {
    inner: SigningSession,
}

impl SignpadSession {
    fn new_internal(config_json: Option<String>) -> Result<Self, SignpadError> {
        let config = match config_json {
            Some(json) if !json.trim().is_empty() => SignpadConfig::from_json(&json)?,
            _ => SignpadConfig::default(),
        };
        Ok(Self {
            inner: SigningSession::new(config),
        })
    }

    fn add_document_internal(
        &mut self,
        id: &str,
        pdf: &str,
        placements_json: &str,
    ) -> Result<DocumentSummary, SignpadError> {
        let bytes = decode_payload(pdf)?;
        let placements = parse_placements(placements_json)?;
        self.inner
            .add_document(SourceDocument::new(id, bytes, placements))?;
        self.inner
            .summaries()
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| SignpadError::UnknownDocument(id.to_string()))
    }

    fn attach_signature_internal(
        &mut self,
        id: &str,
        svg: &str,
        png_data_uri: &str,
    ) -> Result<bool, SignpadError> {
        if self.inner.document(id).is_none() {
            return Err(SignpadError::UnknownDocument(id.to_string()));
        }
        let (signature, raster) = match parse_capture(svg, png_data_uri, self.inner.config()) {
            Ok(capture) => capture,
            Err(SignpadError::NoSignature) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.inner.attach_signature(id, signature, raster)?;
        Ok(true)
    }

    fn save_internal(&mut self) -> Result<BatchReport, SignpadError> {
        self.inner.save()
    }
}

#[wasm_bindgen]
impl SignpadSession {
    /// Create a session. `configJson` is optional camelCase JSON.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<SignpadSession, JsValue> {
        Self::new_internal(config_json).map_err(to_js_error)
    }

    /// Add or replace a document. `pdf` is base64 or a data URI; placements
    /// are a JSON array (blank for the default). Returns a document summary.
    #[wasm_bindgen(js_name = addDocument)]
    pub fn add_document(
        &mut self,
        id: &str,
        pdf: &str,
        placements_json: &str,
    ) -> Result<JsValue, JsValue> {
        let summary = self
            .add_document_internal(id, pdf, placements_json)
            .map_err(to_js_error)?;
        serialize(&summary)
    }

    #[wasm_bindgen(js_name = getDocuments)]
    pub fn get_documents(&self) -> Result<JsValue, JsValue> {
        serialize(&self.inner.summaries())
    }

    /// Store the capture pad output for a document.
    /// Returns `false` when the pad was blank; nothing is stored then.
    #[wasm_bindgen(js_name = attachSignature)]
    pub fn attach_signature(
        &mut self,
        id: &str,
        svg: &str,
        png_data_uri: &str,
    ) -> Result<bool, JsValue> {
        self.attach_signature_internal(id, svg, png_data_uri)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = clearSignature)]
    pub fn clear_signature(&mut self, id: &str) -> bool {
        self.inner.clear_signature(id)
    }

    #[wasm_bindgen(js_name = pendingDocuments)]
    pub fn pending_documents(&self) -> Vec<String> {
        self.inner
            .pending_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[wasm_bindgen(js_name = isSaving)]
    pub fn is_saving(&self) -> bool {
        self.inner.is_saving()
    }

    /// Sign every document with a pending signature.
    /// Returns `{ [id]: { signedDocument, signatureImage } }`.
    pub fn save(&mut self) -> Result<JsValue, JsValue> {
        let report = self.save_internal().map_err(to_js_error)?;
        for failure in &report.failures {
            web_sys::console::error_1(
                &format!("Failed to sign {}: {}", failure.id, failure.error).into(),
            );
        }
        serialize(&report.composition_results())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{pdf_base64, png_uri, SVG};
    use pretty_assertions::assert_eq;

    fn session() -> SignpadSession {
        SignpadSession::new_internal(None).unwrap()
    }

    #[test]
    fn test_new_with_config() {
        let s = SignpadSession::new_internal(Some(r#"{"compressOutput":false}"#.to_string())).unwrap();
        assert!(!s.inner.config().compress_output);
        assert!(SignpadSession::new_internal(Some("[]".to_string())).is_err());
        assert!(SignpadSession::new_internal(Some("  ".to_string())).is_ok());
    }

    #[test]
    fn test_add_document_summary() {
        let mut s = session();
        let summary = s
            .add_document_internal("nda", &pdf_base64(3), r#"[{"left":1,"top":1,"width":4,"height":2,"page":3}]"#)
            .unwrap();
        assert_eq!(summary.page_count, 3);
        assert_eq!(summary.placements.len(), 1);
        assert!(!summary.pending);
    }

    #[test]
    fn test_add_document_rejects_bad_input() {
        let mut s = session();
        assert!(matches!(
            s.add_document_internal("x", "%%%", ""),
            Err(SignpadError::InvalidPayload(_))
        ));
        assert!(matches!(
            s.add_document_internal("x", "aGVsbG8=", ""),
            Err(SignpadError::PdfParse(_))
        ));
    }

    #[test]
    fn test_attach_and_save_flow() {
        let mut s = session();
        for id in ["a", "b", "c"] {
            s.add_document_internal(id, &pdf_base64(1), "").unwrap();
        }
        assert!(s.attach_signature_internal("b", SVG, &png_uri()).unwrap());
        assert_eq!(s.pending_documents(), vec!["b".to_string()]);

        let report = s.save_internal().unwrap();
        assert_eq!(report.results.keys().collect::<Vec<_>>(), vec!["b"]);
        assert!(s.pending_documents().is_empty());
        assert!(!s.is_saving());
        assert!(s.inner.document("b").unwrap().already_signed);
    }

    #[test]
    fn test_attach_unknown_document() {
        let mut s = session();
        assert!(matches!(
            s.attach_signature_internal("ghost", SVG, &png_uri()),
            Err(SignpadError::UnknownDocument(_))
        ));
    }

    #[test]
    fn test_blank_pad_stores_nothing() {
        let mut s = session();
        s.add_document_internal("a", &pdf_base64(1), "").unwrap();
        assert!(!s.attach_signature_internal("a", "<svg></svg>", &png_uri()).unwrap());
        assert!(s.pending_documents().is_empty());
    }

    #[test]
    fn test_clear_signature() {
        let mut s = session();
        s.add_document_internal("a", &pdf_base64(1), "").unwrap();
        s.attach_signature_internal("a", SVG, &png_uri()).unwrap();
        assert!(s.clear_signature("a"));
        assert!(s.pending_documents().is_empty());
        assert!(s.save_internal().unwrap().results.is_empty());
    }
}
