//! Signing session state
//!
//! Holds the documents a user is working through, the signature captured
//! for each, and a gate that keeps two saves from overlapping. Everything is
//! single-threaded; the gate is shared via `Rc` so the host UI can observe it.

use crate::capture::{CapturedSignature, SignatureRaster};
use crate::config::SignpadConfig;
use crate::document::PdfDocument;
use crate::error::SignpadError;
use crate::placement::SignaturePlacement;
use crate::saver::{sign_batch, BatchReport, SigningJob};
use serde::Serialize;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info};

/// A PDF supplied by the host along with where it should be signed
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: String,
    pub pdf: Vec<u8>,
    pub placements: Vec<SignaturePlacement>,
    pub already_signed: bool,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, pdf: Vec<u8>, placements: Vec<SignaturePlacement>) -> Self {
        Self {
            id: id.into(),
            pdf,
            placements,
            already_signed: false,
        }
    }
}

/// Host-facing view of a document, without the PDF bytes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub page_count: u32,
    pub placements: Vec<SignaturePlacement>,
    pub already_signed: bool,
    pub pending: bool,
}

#[derive(Debug, Clone)]
struct PendingSignature {
    signature: CapturedSignature,
    raster: SignatureRaster,
}

/// Shared "a save is running" flag
#[derive(Debug, Clone, Default)]
pub struct SaveGate(Rc<Cell<bool>>);

impl SaveGate {
    pub fn is_open(&self) -> bool {
        !self.0.get()
    }

    /// Close the gate, or `None` if it is already closed.
    /// The gate reopens when the returned ticket drops.
    pub fn try_begin(&self) -> Option<SaveTicket> {
        if self.0.replace(true) {
            return None;
        }
        Some(SaveTicket(Rc::clone(&self.0)))
    }
}

/// Held for the duration of a save
#[derive(Debug)]
pub struct SaveTicket(Rc<Cell<bool>>);

impl Drop for SaveTicket {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[derive(Debug, Default)]
pub struct SigningSession {
    config: SignpadConfig,
    documents: Vec<SourceDocument>,
    pending: BTreeMap<String, PendingSignature>,
    page_counts: BTreeMap<String, u32>,
    gate: SaveGate,
}

impl SigningSession {
    pub fn new(config: SignpadConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SignpadConfig {
        &self.config
    }

    pub fn save_gate(&self) -> SaveGate {
        self.gate.clone()
    }

    /// Add a document, replacing any with the same id.
    ///
    /// The PDF is parsed once up front so unreadable input is reported here
    /// rather than at save time. A replaced document loses its pending capture.
    pub fn add_document(&mut self, document: SourceDocument) -> Result<u32, SignpadError> {
        let page_count = PdfDocument::from_bytes(&document.pdf)?.page_count();
        self.pending.remove(&document.id);
        self.page_counts.insert(document.id.clone(), page_count);

        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }
        Ok(page_count)
    }

    pub fn document(&self, id: &str) -> Option<&SourceDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Documents in the order they were added
    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    pub fn summaries(&self) -> Vec<DocumentSummary> {
        self.documents
            .iter()
            .map(|d| DocumentSummary {
                id: d.id.clone(),
                page_count: self.page_counts.get(&d.id).copied().unwrap_or(0),
                placements: d.placements.clone(),
                already_signed: d.already_signed,
                pending: self.pending.contains_key(&d.id),
            })
            .collect()
    }

    /// Record a capture for a document; it is composited on the next save
    pub fn attach_signature(
        &mut self,
        id: &str,
        signature: CapturedSignature,
        raster: SignatureRaster,
    ) -> Result<(), SignpadError> {
        if self.document(id).is_none() {
            return Err(SignpadError::UnknownDocument(id.to_string()));
        }
        if signature.paths.is_empty() {
            return Err(SignpadError::NoSignature);
        }
        debug!(id, paths = signature.paths.len(), "Signature attached");
        self.pending
            .insert(id.to_string(), PendingSignature { signature, raster });
        Ok(())
    }

    /// Drop a pending capture. Returns whether one existed.
    pub fn clear_signature(&mut self, id: &str) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Ids with a pending capture, in document order
    pub fn pending_ids(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|d| self.pending.contains_key(&d.id))
            .map(|d| d.id.as_str())
            .collect()
    }

    pub fn is_saving(&self) -> bool {
        !self.gate.is_open()
    }

    /// Sign every document with a pending capture.
    ///
    /// Documents without one are not touched. Signed documents are marked
    /// `already_signed` and their captures consumed; failed ones keep theirs
    /// so the user can retry.
    pub fn save(&mut self) -> Result<BatchReport, SignpadError> {
        let _ticket = self.gate.try_begin().ok_or(SignpadError::SaveInProgress)?;

        let jobs = self.documents.iter().filter_map(|doc| {
            self.pending.get(&doc.id).map(|pending| SigningJob {
                id: &doc.id,
                pdf: &doc.pdf,
                placements: &doc.placements,
                signature: &pending.signature,
                raster: &pending.raster,
            })
        });
        let report = sign_batch(jobs, &self.config);

        for doc in &mut self.documents {
            if report.results.contains_key(&doc.id) {
                doc.already_signed = true;
                self.pending.remove(&doc.id);
            }
        }
        info!(
            signed = report.results.len(),
            still_pending = self.pending.len(),
            "Session save complete"
        );
        Ok(report)
    }
}
