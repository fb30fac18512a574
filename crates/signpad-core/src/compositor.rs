//! Page compositing
//!
//! Draws a captured signature onto PDF pages as vector strokes. Each
//! placement becomes a `q ... Q` block that clips to the target box, sets the
//! stroke state and strokes every path, already mapped into page space.
//! Placements on the same page share one appended content stream, in order,
//! so later placements draw over earlier ones.

use crate::capture::{parse_path_data, CapturedSignature};
use crate::config::{OverlapPolicy, SignpadConfig};
use crate::document::PdfDocument;
use crate::error::SignpadError;
use crate::placement::{
    resolve, PlacementOutcome, PlacementTransform, SignaturePlacement, SkipReason, TargetBox,
};
use kurbo::{BezPath, PathEl, Point, QuadBez};
use lopdf::content::{Content, Operation};
use lopdf::Object;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Round line join (`j` operand)
const ROUND_JOIN: i64 = 1;

/// Composite `signature` at each placement.
///
/// An empty `placements` slice falls back to the configured default
/// placement. Invalid placements are skipped and reported, never fatal;
/// only failures to read or write the document itself are errors.
pub fn composite(
    doc: &mut PdfDocument,
    signature: &CapturedSignature,
    placements: &[SignaturePlacement],
    config: &SignpadConfig,
) -> Result<Vec<PlacementOutcome>, SignpadError> {
    let fallback = [config.default_placement];
    let placements = if placements.is_empty() {
        &fallback[..]
    } else {
        placements
    };

    let strokes = prepare_strokes(signature);
    let page_count = doc.page_count();

    let mut outcomes = Vec::with_capacity(placements.len());
    let mut applied: Vec<(usize, u32, TargetBox)> = Vec::new();
    let mut per_page: BTreeMap<u32, Vec<Operation>> = BTreeMap::new();

    for (index, placement) in placements.iter().enumerate() {
        let page = placement.page;
        let skip = |reason: SkipReason| {
            warn!(index, page, ?reason, "Skipping signature placement");
            PlacementOutcome::Skipped {
                index,
                page,
                reason,
            }
        };

        if page == 0 || page > page_count {
            outcomes.push(skip(SkipReason::PageOutOfRange { page, page_count }));
            continue;
        }

        let context = doc.page_unit_context(page)?;
        let transform = match resolve(placement, &signature.view_box, &context) {
            Ok(t) => t,
            Err(reason) => {
                outcomes.push(skip(reason));
                continue;
            }
        };

        if config.overlap_policy == OverlapPolicy::Reject {
            if let Some((other, _, _)) = applied
                .iter()
                .find(|(_, p, target)| *p == page && target.overlaps(&transform.target))
            {
                outcomes.push(skip(SkipReason::Overlaps { other: *other }));
                continue;
            }
        }

        debug!(
            index,
            page,
            scale = transform.scale,
            x = transform.target.x,
            y = transform.target.y,
            user_unit = context.user_unit,
            rotation = context.rotation,
            "Resolved signature placement"
        );

        per_page
            .entry(page)
            .or_default()
            .extend(placement_operations(&strokes, &transform));
        applied.push((index, page, transform.target));
        outcomes.push(PlacementOutcome::Applied {
            index,
            page,
            transform,
        });
    }

    for (page, operations) in per_page {
        let bytes = Content { operations }
            .encode()
            .map_err(|e| SignpadError::PdfWrite(e.to_string()))?;
        doc.append_page_content(page, bytes)?;
    }

    Ok(outcomes)
}

/// A signature path parsed once and reused for every placement
struct PreparedStroke {
    path: BezPath,
    rgb: [f32; 3],
    width: f64,
    cap: i64,
}

fn prepare_strokes(signature: &CapturedSignature) -> Vec<PreparedStroke> {
    signature
        .paths
        .iter()
        .filter_map(|p| match parse_path_data(&p.data) {
            Some(path) => Some(PreparedStroke {
                path,
                rgb: p.stroke_color.to_pdf_rgb(),
                width: p.stroke_width,
                cap: p.stroke_line_cap.pdf_code(),
            }),
            None => {
                warn!(d = %p.data, "Ignoring unparseable signature path");
                None
            }
        })
        .collect()
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn point_operands(p: Point) -> Vec<Object> {
    vec![real(p.x), real(p.y)]
}

/// Operators for one placement: save, clip to the target, stroke, restore
fn placement_operations(strokes: &[PreparedStroke], transform: &PlacementTransform) -> Vec<Operation> {
    let target = &transform.target;
    let affine = transform.affine();

    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "re",
            vec![real(target.x), real(target.y), real(target.width), real(target.height)],
        ),
        Operation::new("W", vec![]),
        Operation::new("n", vec![]),
    ];

    for stroke in strokes {
        let [r, g, b] = stroke.rgb;
        ops.push(Operation::new(
            "RG",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
        ops.push(Operation::new("w", vec![real(stroke.width * transform.scale)]));
        ops.push(Operation::new("J", vec![Object::Integer(stroke.cap)]));
        ops.push(Operation::new("j", vec![Object::Integer(ROUND_JOIN)]));

        let mut path = stroke.path.clone();
        path.apply_affine(affine);
        path_operations(&path, &mut ops);
        ops.push(Operation::new("S", vec![]));
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Translate path elements into construction operators.
///
/// Quadratic segments are raised to cubics. A subpath that never leaves its
/// start point gets a zero-length line so its caps still paint a dot.
fn path_operations(path: &BezPath, ops: &mut Vec<Operation>) {
    let mut current = Point::ORIGIN;
    let mut start = Point::ORIGIN;
    let mut pending_dot = false;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                if pending_dot {
                    ops.push(Operation::new("l", point_operands(current)));
                }
                ops.push(Operation::new("m", point_operands(p)));
                current = p;
                start = p;
                pending_dot = true;
            }
            PathEl::LineTo(p) => {
                ops.push(Operation::new("l", point_operands(p)));
                current = p;
                pending_dot = false;
            }
            PathEl::QuadTo(p1, p2) => {
                let cubic = QuadBez::new(current, p1, p2).raise();
                let mut operands = point_operands(cubic.p1);
                operands.extend(point_operands(cubic.p2));
                operands.extend(point_operands(cubic.p3));
                ops.push(Operation::new("c", operands));
                current = p2;
                pending_dot = false;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                let mut operands = point_operands(p1);
                operands.extend(point_operands(p2));
                operands.extend(point_operands(p3));
                ops.push(Operation::new("c", operands));
                current = p3;
                pending_dot = false;
            }
            PathEl::ClosePath => {
                ops.push(Operation::new("h", vec![]));
                current = start;
                pending_dot = false;
            }
        }
    }

    if pending_dot {
        ops.push(Operation::new("l", point_operands(current)));
    }
}
