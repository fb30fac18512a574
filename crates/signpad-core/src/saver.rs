//! Producing signed output
//!
//! Single mode signs one document and propagates any failure. Batch mode
//! signs every job it is given, logging and collecting failures so one broken
//! document does not cost the user the others.

use crate::capture::{CapturedSignature, SignatureRaster};
use crate::compositor::composite;
use crate::config::SignpadConfig;
use crate::document::PdfDocument;
use crate::error::SignpadError;
use crate::payload::{encode_base64, PDF_MIME, PNG_MIME};
use crate::placement::{PlacementOutcome, SignaturePlacement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};

/// Base64 payload tagged with its MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAsset {
    #[serde(rename = "type")]
    pub mime_type: String,
    pub data: String,
}

impl EncodedAsset {
    pub fn new(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: encode_base64(bytes),
        }
    }
}

/// What the host receives for one signed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionResult {
    pub signed_document: EncodedAsset,
    pub signature_image: EncodedAsset,
}

/// A composition result with the per-placement outcomes that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDocument {
    pub result: CompositionResult,
    pub outcomes: Vec<PlacementOutcome>,
}

impl SignedDocument {
    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }
}

/// Sign one PDF.
///
/// Returns `Ok(None)` when the capture holds no paths. Parse and serialize
/// failures are returned as errors with no partial output.
#[instrument(skip_all, fields(bytes = pdf.len(), placements = placements.len()))]
pub fn sign_document(
    pdf: &[u8],
    signature: &CapturedSignature,
    raster: &SignatureRaster,
    placements: &[SignaturePlacement],
    config: &SignpadConfig,
) -> Result<Option<SignedDocument>, SignpadError> {
    if signature.paths.is_empty() {
        debug!("Capture has no paths, nothing to sign");
        return Ok(None);
    }

    let mut doc = PdfDocument::from_bytes(pdf)?;
    let outcomes = composite(&mut doc, signature, placements, config)?;
    if config.compress_output {
        doc.compress();
    }
    let output = doc.save_to_bytes()?;

    let signed = SignedDocument {
        result: CompositionResult {
            signed_document: EncodedAsset::new(PDF_MIME, &output),
            signature_image: EncodedAsset::new(PNG_MIME, &raster.bytes),
        },
        outcomes,
    };
    info!(
        applied = signed.applied_count(),
        skipped = signed.outcomes.len() - signed.applied_count(),
        output_bytes = output.len(),
        "Signed document"
    );
    Ok(Some(signed))
}

/// One document queued for batch signing
#[derive(Debug, Clone, Copy)]
pub struct SigningJob<'a> {
    pub id: &'a str,
    pub pdf: &'a [u8],
    pub placements: &'a [SignaturePlacement],
    pub signature: &'a CapturedSignature,
    pub raster: &'a SignatureRaster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of a batch save, keyed by document id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: BTreeMap<String, SignedDocument>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Just the host-facing results, keyed by document id
    pub fn composition_results(&self) -> BTreeMap<String, CompositionResult> {
        self.results
            .iter()
            .map(|(id, signed)| (id.clone(), signed.result.clone()))
            .collect()
    }
}

/// Sign each job in turn. Jobs run sequentially to bound peak memory.
#[instrument(skip_all)]
pub fn sign_batch<'a>(
    jobs: impl IntoIterator<Item = SigningJob<'a>>,
    config: &SignpadConfig,
) -> BatchReport {
    let mut report = BatchReport::default();
    for job in jobs {
        match sign_document(job.pdf, job.signature, job.raster, job.placements, config) {
            Ok(Some(signed)) => {
                report.results.insert(job.id.to_string(), signed);
            }
            Ok(None) => debug!(id = job.id, "No signature paths, document left unsigned"),
            Err(e) => {
                error!(id = job.id, error = %e, "Failed to sign document");
                report.failures.push(BatchFailure {
                    id: job.id.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    info!(
        signed = report.results.len(),
        failed = report.failures.len(),
        "Batch save finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::tiny_png;
    use crate::document::tests::letter_pdf;
    use crate::payload::decode_base64;
    use pretty_assertions::assert_eq;

    fn capture() -> CapturedSignature {
        CapturedSignature::from_svg(r#"<svg viewBox="0 0 100 50"><path d="M 0 0 L 100 50"/></svg>"#)
            .unwrap()
    }

    fn raster() -> SignatureRaster {
        SignatureRaster::from_png_bytes(tiny_png(2, 2)).unwrap()
    }

    #[test]
    fn test_sign_document_result_shape() {
        let pdf = letter_pdf(1);
        let signed = sign_document(&pdf, &capture(), &raster(), &[], &SignpadConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(signed.result.signed_document.mime_type, "application/pdf");
        assert_eq!(signed.result.signature_image.mime_type, "image/png");
        assert_eq!(decode_base64(&signed.result.signature_image.data).unwrap(), tiny_png(2, 2));

        let output = decode_base64(&signed.result.signed_document.data).unwrap();
        assert!(output.starts_with(b"%PDF-"));
        assert_eq!(PdfDocument::from_bytes(&output).unwrap().page_count(), 1);
        assert_eq!(signed.applied_count(), 1);
    }

    #[test]
    fn test_result_json_field_names() {
        let pdf = letter_pdf(1);
        let signed = sign_document(&pdf, &capture(), &raster(), &[], &SignpadConfig::default())
            .unwrap()
            .unwrap();
        let json = serde_json::to_value(&signed.result).unwrap();
        assert_eq!(json["signedDocument"]["type"], "application/pdf");
        assert_eq!(json["signatureImage"]["type"], "image/png");
        assert!(json["signedDocument"]["data"].is_string());
    }

    #[test]
    fn test_empty_capture_yields_nothing() {
        let empty = CapturedSignature {
            paths: Vec::new(),
            ..capture()
        };
        let result =
            sign_document(&letter_pdf(1), &empty, &raster(), &[], &SignpadConfig::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_unparseable_pdf_is_error() {
        let result = sign_document(b"%PDF-garbage", &capture(), &raster(), &[], &SignpadConfig::default());
        assert!(matches!(result, Err(SignpadError::PdfParse(_))));
    }

    #[test]
    fn test_uncompressed_output_keeps_plain_operators() {
        let config = SignpadConfig {
            compress_output: false,
            ..Default::default()
        };
        let signed = sign_document(&letter_pdf(1), &capture(), &raster(), &[], &config)
            .unwrap()
            .unwrap();
        let output = decode_base64(&signed.result.signed_document.data).unwrap();
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains(" re"));
        assert!(text.contains("W"));
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let good = letter_pdf(1);
        let sig = capture();
        let png = raster();
        let jobs = vec![
            SigningJob { id: "b", pdf: &good, placements: &[], signature: &sig, raster: &png },
            SigningJob { id: "a", pdf: b"not a pdf", placements: &[], signature: &sig, raster: &png },
            SigningJob { id: "c", pdf: &good, placements: &[], signature: &sig, raster: &png },
        ];
        let report = sign_batch(jobs, &SignpadConfig::default());

        assert_eq!(report.results.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "a");
        assert_eq!(report.composition_results().len(), 2);
    }

    #[test]
    fn test_batch_of_nothing() {
        let report = sign_batch(Vec::new(), &SignpadConfig::default());
        assert_eq!(report, BatchReport::default());
    }
}
