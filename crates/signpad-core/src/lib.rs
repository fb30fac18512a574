//! Signature-to-PDF compositing
//!
//! This crate draws a handwritten signature, captured as SVG path markup,
//! onto PDF pages as vector strokes using lopdf.
//!
//! The pipeline:
//! - `capture`: SVG markup to a `CapturedSignature` (view box + styled paths)
//! - `placement`: centimeter placements to user-space boxes with aspect-fit
//! - `compositor`: clip and stroke the mapped paths on each target page
//! - `saver`: serialize and package results, one document or a batch
//! - `session`: documents, pending captures and the save gate for a host UI

pub mod capture;
pub mod compositor;
pub mod config;
pub mod document;
pub mod error;
pub mod payload;
pub mod placement;
pub mod saver;
pub mod session;
pub mod style;
pub mod units;

pub use capture::{CapturedSignature, SignaturePath, SignatureRaster, ViewBox};
pub use compositor::composite;
pub use config::{OverlapPolicy, SignpadConfig};
pub use document::PdfDocument;
pub use error::SignpadError;
pub use placement::{
    resolve, PageUnitContext, PlacementOutcome, PlacementTransform, SignaturePlacement, SkipReason,
};
pub use saver::{sign_batch, sign_document, BatchReport, CompositionResult, SignedDocument};
pub use session::{SigningSession, SourceDocument};
pub use units::{cm_to_points, points_to_cm};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, SignpadError> {
    Ok(PdfDocument::from_bytes(bytes)?.page_count())
}
