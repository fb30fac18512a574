//! Stroke styling for signature paths
//!
//! Capture tools emit CSS-style colors ("#1b2a4a", "rgb(0, 0, 128)", "navy").
//! They are normalized here into RGB components ready for the `RG` operator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dark navy used when the capture markup carries no stroke color
pub const DEFAULT_STROKE_COLOR: StrokeColor = StrokeColor {
    r: 0x1b,
    g: 0x2a,
    b: 0x4a,
};

/// Stroke width (in signature-local units) used when markup omits one
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// 8-bit RGB stroke color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StrokeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl StrokeColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a CSS color value. Returns `None` for `none`, `transparent`,
    /// gradients and anything else that is not a plain color.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = value.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgb(")
            .or_else(|| lower.strip_prefix("rgba("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_args(args);
        }
        named_color(&lower)
    }

    /// Components in the 0-1 range used by PDF color operators
    pub fn to_pdf_rgb(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl Default for StrokeColor {
    fn default() -> Self {
        DEFAULT_STROKE_COLOR
    }
}

impl fmt::Display for StrokeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<StrokeColor> for String {
    fn from(color: StrokeColor) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for StrokeColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StrokeColor::parse(&value).ok_or_else(|| format!("Unsupported color: {}", value))
    }
}

fn parse_hex(hex: &str) -> Option<StrokeColor> {
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        // #rgb and #rgba shorthand
        3 | 4 => {
            let mut it = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
            Some(StrokeColor::new(it.next()??, it.next()??, it.next()??))
        }
        // alpha in #rrggbbaa is ignored
        6 | 8 => Some(StrokeColor::new(
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        )),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<StrokeColor> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c.is_whitespace() || c == '/')
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        if let Some(pct) = s.strip_suffix('%') {
            let v: f64 = pct.parse().ok()?;
            Some((v.clamp(0.0, 100.0) * 255.0 / 100.0).round() as u8)
        } else {
            let v: f64 = s.parse().ok()?;
            Some(v.clamp(0.0, 255.0).round() as u8)
        }
    };
    Some(StrokeColor::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
    ))
}

fn named_color(name: &str) -> Option<StrokeColor> {
    let color = match name {
        "black" => StrokeColor::new(0, 0, 0),
        "white" => StrokeColor::new(255, 255, 255),
        "navy" => StrokeColor::new(0, 0, 128),
        "blue" => StrokeColor::new(0, 0, 255),
        "darkblue" => StrokeColor::new(0, 0, 139),
        "midnightblue" => StrokeColor::new(25, 25, 112),
        "red" => StrokeColor::new(255, 0, 0),
        "darkred" => StrokeColor::new(139, 0, 0),
        "green" => StrokeColor::new(0, 128, 0),
        "gray" | "grey" => StrokeColor::new(128, 128, 128),
        "dimgray" | "dimgrey" => StrokeColor::new(105, 105, 105),
        _ => return None,
    };
    Some(color)
}

/// Shape drawn at the open ends of a stroke
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

impl LineCap {
    /// Parse an SVG `stroke-linecap` value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "butt" => Some(LineCap::Butt),
            "round" => Some(LineCap::Round),
            "square" => Some(LineCap::Square),
            _ => None,
        }
    }

    /// Operand for the PDF `J` operator
    pub fn pdf_code(self) -> i64 {
        match self {
            LineCap::Butt => 0,
            LineCap::Round => 1,
            LineCap::Square => 2,
        }
    }
}

/// Color, width and cap applied to every signature stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrokeStyle {
    pub color: StrokeColor,
    pub width: f64,
    pub line_cap: LineCap,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_STROKE_COLOR,
            width: DEFAULT_STROKE_WIDTH,
            line_cap: LineCap::Round,
        }
    }
}
