//! Placement resolution
//!
//! A placement is a rectangle in centimeters measured from the top-left corner
//! of a page as displayed, so `/Rotate` is honored. Resolving it against a page
//! and a signature view box yields the target box in PDF user space and the
//! uniform scale plus centering offsets that fit the signature inside it
//! without distortion.

use crate::capture::ViewBox;
use crate::units::{cm_to_points, sanitize_rotation, sanitize_user_unit, DEFAULT_USER_UNIT};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// Where the signature goes, in centimeters from the page's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePlacement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// 1-indexed page number
    pub page: u32,
}

impl Default for SignaturePlacement {
    fn default() -> Self {
        Self {
            left: 5.0,
            top: 7.0,
            width: 8.0,
            height: 4.0,
            page: 1,
        }
    }
}

impl SignaturePlacement {
    /// All coordinates finite and the box has positive area
    pub fn has_valid_box(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Geometry of a page needed to convert placements into user space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUnitContext {
    pub page_width_points: f64,
    pub page_height_points: f64,
    /// Lower-left corner of the MediaBox
    pub origin_x: f64,
    pub origin_y: f64,
    pub user_unit: f64,
    /// Clockwise display rotation: 0, 90, 180 or 270
    #[serde(default)]
    pub rotation: u16,
}

impl Default for PageUnitContext {
    /// US Letter at `UserUnit 1`
    fn default() -> Self {
        Self {
            page_width_points: 612.0,
            page_height_points: 792.0,
            origin_x: 0.0,
            origin_y: 0.0,
            user_unit: DEFAULT_USER_UNIT,
            rotation: 0,
        }
    }
}

impl PageUnitContext {
    /// Width and height of the page as a viewer shows it
    pub fn display_size(&self) -> (f64, f64) {
        match sanitize_rotation(f64::from(self.rotation)) {
            90 | 270 => (self.page_height_points, self.page_width_points),
            _ => (self.page_width_points, self.page_height_points),
        }
    }

    /// Map displayed coordinates (origin at the displayed lower-left, y up)
    /// into the page's user space.
    pub fn display_to_user(&self) -> Affine {
        let (w, h) = (self.page_width_points, self.page_height_points);
        let (ox, oy) = (self.origin_x, self.origin_y);
        match sanitize_rotation(f64::from(self.rotation)) {
            90 => Affine::new([0.0, 1.0, -1.0, 0.0, ox + w, oy]),
            180 => Affine::new([-1.0, 0.0, 0.0, -1.0, ox + w, oy + h]),
            270 => Affine::new([0.0, -1.0, 1.0, 0.0, ox, oy + h]),
            _ => Affine::translate((ox, oy)),
        }
    }
}

/// Rectangle in page user space (y up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl TargetBox {
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// True when the boxes share a region of positive area
    pub fn overlaps(&self, other: &TargetBox) -> bool {
        let shared = self.to_rect().intersect(other.to_rect());
        shared.width() > 0.0 && shared.height() > 0.0
    }
}

/// Resolved geometry for one placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementTransform {
    pub page: u32,
    /// Target box in user space; the clip rectangle
    pub target: TargetBox,
    pub scale: f64,
    /// Centering offsets inside the target, along the displayed axes
    pub offset_x: f64,
    pub offset_y: f64,
    pub view_box: ViewBox,
    /// Page rotation the placement was resolved against
    #[serde(default)]
    pub rotation: u16,
    /// Signature-to-user-space matrix `[a b c d e f]`
    pub matrix: [f64; 6],
}

impl PlacementTransform {
    pub fn scaled_width(&self) -> f64 {
        self.view_box.width * self.scale
    }

    pub fn scaled_height(&self) -> f64 {
        self.view_box.height * self.scale
    }

    /// Map signature-local coordinates (y down) into page user space (y up).
    ///
    /// On an unrotated page this is
    /// `x' = x0 + ox + (x - min_x)s`, `y' = y0 + h - oy - (y - min_y)s`.
    pub fn affine(&self) -> Affine {
        Affine::new(self.matrix)
    }

    pub fn map_point(&self, point: Point) -> Point {
        self.affine() * point
    }
}

/// Why a placement was not drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SkipReason {
    /// Non-finite coordinates or a box without positive area
    InvalidBox,
    #[serde(rename_all = "camelCase")]
    PageOutOfRange { page: u32, page_count: u32 },
    DegenerateSignature { width: f64, height: f64 },
    /// Intersects the applied placement at index `other`
    Overlaps { other: usize },
}

/// Result of compositing one placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PlacementOutcome {
    Applied {
        index: usize,
        page: u32,
        transform: PlacementTransform,
    },
    Skipped {
        index: usize,
        page: u32,
        reason: SkipReason,
    },
}

impl PlacementOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PlacementOutcome::Applied { .. })
    }

    pub fn index(&self) -> usize {
        match self {
            PlacementOutcome::Applied { index, .. } | PlacementOutcome::Skipped { index, .. } => {
                *index
            }
        }
    }
}

/// Fit `view_box` into the placement's target box on a page.
///
/// Page range is not checked here; the caller knows the page count.
pub fn resolve(
    placement: &SignaturePlacement,
    view_box: &ViewBox,
    page: &PageUnitContext,
) -> Result<PlacementTransform, SkipReason> {
    if !placement.has_valid_box() {
        return Err(SkipReason::InvalidBox);
    }
    if view_box.is_degenerate() {
        return Err(SkipReason::DegenerateSignature {
            width: view_box.width,
            height: view_box.height,
        });
    }

    let unit = sanitize_user_unit(page.user_unit);
    let left = cm_to_points(placement.left, unit);
    let top = cm_to_points(placement.top, unit);
    let width = cm_to_points(placement.width, unit);
    let height = cm_to_points(placement.height, unit);

    let scale = (width / view_box.width).min(height / view_box.height);
    // subnormal view box sizes overflow the scale
    if !scale.is_finite() || scale <= 0.0 {
        return Err(SkipReason::DegenerateSignature {
            width: view_box.width,
            height: view_box.height,
        });
    }

    // box in displayed space, y up from the displayed bottom edge
    let (_, display_height) = page.display_size();
    let shown = Rect::new(left, display_height - top - height, left + width, display_height - top);

    let offset_x = (width - view_box.width * scale) / 2.0;
    let offset_y = (height - view_box.height * scale) / 2.0;

    let to_user = page.display_to_user();
    let fitted = Affine::new([
        scale,
        0.0,
        0.0,
        -scale,
        shown.x0 + offset_x - view_box.min_x * scale,
        shown.y1 - offset_y + view_box.min_y * scale,
    ]);
    let user_box = to_user.transform_rect_bbox(shown);

    Ok(PlacementTransform {
        page: placement.page,
        target: TargetBox {
            x: user_box.x0,
            y: user_box.y0,
            width: user_box.width(),
            height: user_box.height(),
        },
        scale,
        offset_x,
        offset_y,
        view_box: *view_box,
        rotation: sanitize_rotation(f64::from(page.rotation)),
        matrix: (to_user * fitted).as_coeffs(),
    })
}
