//! Signature capture parsing
//!
//! The capture pad hands over SVG markup (a root `<svg>` with one `<path>` per
//! stroke) and a PNG snapshot as a data URI. This module turns the markup into
//! a [`CapturedSignature`]: a view box plus path descriptors, independent of
//! whatever pixel size the pad happened to render at.
//!
//! Bounding boxes are computed analytically from the path commands, including
//! curve extrema, so no layout engine is needed.

use crate::error::SignpadError;
use crate::payload::{encode_base64, DataUri, PNG_MIME};
use crate::style::{LineCap, StrokeColor, StrokeStyle};
use kurbo::{BezPath, PathEl, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, warn};

/// Bounding rectangle of the signature in its local coordinate space (y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    /// Parse an SVG `viewBox` attribute ("min-x min-y width height")
    pub fn parse(value: &str) -> Option<Self> {
        let numbers: Vec<f64> = value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match numbers.as_slice() {
            [x, y, w, h] if numbers.iter().all(|n| n.is_finite()) => Some(Self::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    /// A box with no area cannot be scaled into a placement
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

impl From<Rect> for ViewBox {
    fn from(rect: Rect) -> Self {
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }
}

/// One captured stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePath {
    /// SVG path data in signature-local coordinates
    pub data: String,
    pub stroke_color: StrokeColor,
    pub stroke_width: f64,
    pub stroke_line_cap: LineCap,
}

impl SignaturePath {
    pub fn bez_path(&self) -> Option<BezPath> {
        parse_path_data(&self.data)
    }
}

/// Canonical vector form of a signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedSignature {
    pub view_box: ViewBox,
    pub paths: Vec<SignaturePath>,
}

impl CapturedSignature {
    /// Parse capture markup with the built-in default stroke style.
    ///
    /// Returns `None` when the markup holds no drawable `<path>`; callers
    /// treat that as "nothing was signed".
    pub fn from_svg(markup: &str) -> Option<Self> {
        Self::from_svg_with_defaults(markup, &StrokeStyle::default())
    }

    /// Parse capture markup, filling missing stroke attributes from `defaults`
    pub fn from_svg_with_defaults(markup: &str, defaults: &StrokeStyle) -> Option<Self> {
        // exporters commonly prepend an SVG 1.1 DOCTYPE
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = match roxmltree::Document::parse_with_options(markup, options) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Signature markup is not well-formed");
                return None;
            }
        };

        let root = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case("svg"))?;

        let mut paths = Vec::new();
        let mut union: Option<Rect> = None;

        for node in root
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "path")
        {
            let Some(data) = node.attribute("d").map(str::trim).filter(|d| !d.is_empty()) else {
                continue;
            };
            let Some(bez) = parse_path_data(data) else {
                warn!(d = data, "Skipping unparseable signature path");
                continue;
            };
            if let Some(bounds) = path_bounds(&bez) {
                union = Some(union.map_or(bounds, |u| u.union(bounds)));
            }

            paths.push(SignaturePath {
                data: data.to_string(),
                stroke_color: presentation_value(node, "stroke")
                    .and_then(|v| StrokeColor::parse(&v))
                    .unwrap_or(defaults.color),
                stroke_width: presentation_value(node, "stroke-width")
                    .and_then(|v| parse_length(&v))
                    .unwrap_or(defaults.width),
                stroke_line_cap: presentation_value(node, "stroke-linecap")
                    .and_then(|v| LineCap::parse(&v))
                    .unwrap_or(defaults.line_cap),
            });
        }

        if paths.is_empty() {
            debug!("Signature markup contains no drawable paths");
            return None;
        }

        let view_box = root
            .attribute("viewBox")
            .and_then(ViewBox::parse)
            .or_else(|| union.map(ViewBox::from))
            .unwrap_or(ViewBox::new(0.0, 0.0, 0.0, 0.0));

        Some(Self { view_box, paths })
    }

    /// Union of the analytic bounds of every path, ignoring any declared view box
    pub fn measured_bounds(&self) -> Option<ViewBox> {
        self.paths
            .iter()
            .filter_map(|p| p.bez_path())
            .filter_map(|p| path_bounds(&p))
            .reduce(|a, b| a.union(b))
            .map(ViewBox::from)
    }

    /// Render as scale-free SVG: no fixed width or height, aspect-fit "meet"
    pub fn to_svg(&self) -> String {
        let vb = &self.view_box;
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}" preserveAspectRatio="xMidYMid meet">"#,
            vb.min_x, vb.min_y, vb.width, vb.height
        );
        for path in &self.paths {
            let cap = match path.stroke_line_cap {
                LineCap::Butt => "butt",
                LineCap::Round => "round",
                LineCap::Square => "square",
            };
            let _ = write!(
                svg,
                r#"<path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="{}"/>"#,
                escape_attribute(&path.data),
                path.stroke_color,
                path.stroke_width,
                cap
            );
        }
        svg.push_str("</svg>");
        svg
    }
}

/// Parse SVG path data, rejecting input that yields no drawing commands
pub fn parse_path_data(data: &str) -> Option<BezPath> {
    match BezPath::from_svg(data) {
        Ok(path) if !path.elements().is_empty() => Some(path),
        _ => None,
    }
}

/// Tight bounds of a path, including curve extrema.
///
/// A path made only of move-tos (a tap on the pad) has no segments; its
/// points still count so the union covers them.
pub fn path_bounds(path: &BezPath) -> Option<Rect> {
    use kurbo::ParamCurveExtrema;

    let from_segments = path
        .segments()
        .map(|seg| seg.bounding_box())
        .reduce(|a, b| a.union(b));
    if from_segments.is_some() {
        return from_segments;
    }

    path.elements()
        .iter()
        .filter_map(|el| match el {
            PathEl::MoveTo(p) => Some(*p),
            _ => None,
        })
        .map(|p: Point| Rect::from_points(p, p))
        .reduce(|a, b| a.union(b))
}

/// Look up a presentation property on the node or its ancestors, preferring
/// inline `style` declarations over attributes at each level.
fn presentation_value(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.ancestors().filter(|n| n.is_element()).find_map(|n| {
        let from_style = n.attribute("style").and_then(|style| {
            style.split(';').find_map(|decl| {
                let (key, value) = decl.split_once(':')?;
                (key.trim() == name).then(|| value.trim().to_string())
            })
        });
        from_style.or_else(|| n.attribute(name).map(|v| v.trim().to_string()))
    })
}

fn parse_length(value: &str) -> Option<f64> {
    let number = value.trim().trim_end_matches("px").trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w > 0.0)
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// PNG snapshot of the signature exactly as the pad rendered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRaster {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl SignatureRaster {
    /// Decode and validate a `data:image/png;base64,...` URI
    pub fn from_data_uri(uri: &str) -> Result<Self, SignpadError> {
        let data = DataUri::parse(uri).map_err(|e| SignpadError::InvalidRaster(e.to_string()))?;
        if data.mime_type != PNG_MIME {
            return Err(SignpadError::InvalidRaster(format!(
                "Expected {}, got {}",
                PNG_MIME, data.mime_type
            )));
        }
        Self::from_png_bytes(data.bytes)
    }

    /// Validate raw PNG bytes by reading the image header
    pub fn from_png_bytes(bytes: Vec<u8>) -> Result<Self, SignpadError> {
        let reader = png::Decoder::new(bytes.as_slice())
            .read_info()
            .map_err(|e| SignpadError::InvalidRaster(e.to_string()))?;
        let (width, height) = (reader.info().width, reader.info().height);
        drop(reader);
        Ok(Self {
            bytes,
            width,
            height,
        })
    }

    pub fn to_base64(&self) -> String {
        encode_base64(&self.bytes)
    }
}
