//! PDF page access using lopdf

use crate::error::SignpadError;
use crate::placement::PageUnitContext;
use crate::units::{sanitize_rotation, sanitize_user_unit};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Parent chains deeper than this are treated as malformed
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Wrapper around `lopdf::Document` exposing what the compositor needs
pub struct PdfDocument {
    doc: Document,
}

impl PdfDocument {
    /// Load a PDF from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignpadError> {
        let doc = Document::load_mem(bytes).map_err(|e| SignpadError::PdfParse(e.to_string()))?;
        Ok(Self { doc })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Page object ID for a 1-indexed page number
    pub fn page_id(&self, page_num: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&page_num).copied()
    }

    /// MediaBox, UserUnit and rotation of a page.
    ///
    /// MediaBox and Rotate are inherited through `/Parent`; MediaBox defaults
    /// to US Letter. A missing or unusable UserUnit is 1.0, never an error.
    pub fn page_unit_context(&self, page_num: u32) -> Result<PageUnitContext, SignpadError> {
        let page_id = self
            .page_id(page_num)
            .ok_or(SignpadError::PageNotFound(page_num))?;
        let page = self.page_dict(page_id)?;

        let user_unit = page
            .get(b"UserUnit")
            .ok()
            .and_then(|obj| self.extract_number(obj))
            .map(sanitize_user_unit)
            .unwrap_or(1.0);

        let rotation = self
            .inherited_attribute(page_id, b"Rotate")
            .and_then(|obj| self.extract_number(obj))
            .map(sanitize_rotation)
            .unwrap_or(0);

        let mut context = PageUnitContext {
            user_unit,
            rotation,
            ..PageUnitContext::default()
        };
        if let Some([x0, y0, x1, y1]) = self
            .inherited_attribute(page_id, b"MediaBox")
            .and_then(|obj| self.parse_rect(obj))
        {
            context.origin_x = x0.min(x1);
            context.origin_y = y0.min(y1);
            context.page_width_points = (x1 - x0).abs();
            context.page_height_points = (y1 - y0).abs();
        }
        Ok(context)
    }

    fn page_dict(&self, page_id: ObjectId) -> Result<&Dictionary, SignpadError> {
        self.doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| SignpadError::PdfParse(format!("Page object {:?}: {}", page_id, e)))
    }

    /// Look up an inheritable page attribute, walking the `/Parent` chain
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.doc.get_object(page_id).and_then(Object::as_dict).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Some(value);
            }
            let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
            current = self.doc.get_object(parent_id).and_then(Object::as_dict).ok()?;
        }
        None
    }

    /// Parse a PDF rectangle array into [x1, y1, x2, y2]
    fn parse_rect(&self, obj: &Object) -> Option<[f64; 4]> {
        let arr = match obj {
            Object::Array(a) => a,
            Object::Reference(id) => self.doc.get_object(*id).and_then(Object::as_array).ok()?,
            _ => return None,
        };
        if arr.len() != 4 {
            return None;
        }
        let mut values = [0.0f64; 4];
        for (slot, obj) in values.iter_mut().zip(arr) {
            *slot = self.extract_number(obj)?;
        }
        Some(values)
    }

    fn extract_number(&self, obj: &Object) -> Option<f64> {
        match obj {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            Object::Reference(id) => {
                let resolved = self.doc.get_object(*id).ok()?;
                // a reference chain back to itself would recurse forever
                match resolved {
                    Object::Reference(_) => None,
                    other => self.extract_number(other),
                }
            }
            _ => None,
        }
    }

    /// Append a content stream to a page.
    ///
    /// The page's existing content is bracketed by `q`/`Q` first so any
    /// graphics state it leaves behind cannot leak into the new stream.
    pub fn append_page_content(&mut self, page_num: u32, content: Vec<u8>) -> Result<(), SignpadError> {
        let page_id = self
            .page_id(page_num)
            .ok_or(SignpadError::PageNotFound(page_num))?;

        let existing = self.page_dict(page_id)?.get(b"Contents").ok().cloned();
        let mut contents = match existing {
            // an indirect array of streams is spliced in, never nested
            Some(Object::Reference(id)) => match self.doc.get_object(id) {
                Ok(Object::Array(refs)) => refs.clone(),
                _ => vec![Object::Reference(id)],
            },
            Some(Object::Array(refs)) => refs,
            // direct streams are not allowed on pages but some writers emit them
            Some(stream @ Object::Stream(_)) => vec![Object::Reference(self.doc.add_object(stream))],
            _ => Vec::new(),
        };

        if !contents.is_empty() {
            let save_id = self.add_stream(b"q\n".to_vec());
            let restore_id = self.add_stream(b"\nQ\n".to_vec());
            contents.insert(0, Object::Reference(save_id));
            contents.push(Object::Reference(restore_id));
        }
        let content_id = self.add_stream(content);
        contents.push(Object::Reference(content_id));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| SignpadError::PdfWrite(e.to_string()))?;
        page.set("Contents", Object::Array(contents));

        debug!(page = page_num, stream = ?content_id, "Appended page content");
        Ok(())
    }

    fn add_stream(&mut self, bytes: Vec<u8>) -> ObjectId {
        self.doc.add_object(Stream::new(Dictionary::new(), bytes))
    }

    /// Decoded content of a page, all streams concatenated
    pub fn page_content(&self, page_num: u32) -> Result<Vec<u8>, SignpadError> {
        let page_id = self
            .page_id(page_num)
            .ok_or(SignpadError::PageNotFound(page_num))?;
        self.doc
            .get_page_content(page_id)
            .map_err(|e| SignpadError::PdfParse(e.to_string()))
    }

    /// Flate-compress streams that are not yet compressed
    pub fn compress(&mut self) {
        self.doc.compress();
    }

    /// Serialize the document
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, SignpadError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| SignpadError::PdfWrite(e.to_string()))?;
        Ok(buffer)
    }
}
