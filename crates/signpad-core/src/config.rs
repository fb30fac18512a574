//! Configuration for the signing pipeline
//!
//! Hosts pass a camelCase JSON object; every field is optional and falls back
//! to the defaults below.
//!
//! ```
//! use signpad_core::config::{OverlapPolicy, SignpadConfig};
//!
//! let config = SignpadConfig::from_json(r#"{"overlapPolicy":"reject"}"#).unwrap();
//! assert_eq!(config.overlap_policy, OverlapPolicy::Reject);
//! assert!(config.compress_output);
//! ```

use crate::error::SignpadError;
use crate::placement::SignaturePlacement;
use crate::style::StrokeStyle;
use serde::{Deserialize, Serialize};

/// What to do when two placements on one page intersect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlapPolicy {
    /// Draw both; the later placement paints over the earlier one
    #[default]
    DrawOver,
    /// Skip any placement that intersects one already drawn
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignpadConfig {
    /// Used when a document arrives without placements
    pub default_placement: SignaturePlacement,
    /// Applied to captured paths that carry no stroke styling
    pub default_stroke: StrokeStyle,
    pub overlap_policy: OverlapPolicy,
    /// Flate-compress streams in the signed output
    pub compress_output: bool,
}

impl Default for SignpadConfig {
    fn default() -> Self {
        Self {
            default_placement: SignaturePlacement::default(),
            default_stroke: StrokeStyle::default(),
            overlap_policy: OverlapPolicy::default(),
            compress_output: true,
        }
    }
}

impl SignpadConfig {
    /// Parse and validate a JSON configuration
    ///
    /// # Errors
    ///
    /// Returns [`SignpadError::InvalidConfig`] if the JSON is malformed or a
    /// value is out of range.
    pub fn from_json(json: &str) -> Result<Self, SignpadError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SignpadError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject defaults that could never produce a drawable placement
    pub fn validate(&self) -> Result<(), SignpadError> {
        if !self.default_placement.has_valid_box() {
            return Err(SignpadError::InvalidConfig(
                "defaultPlacement must have finite coordinates and a positive size".to_string(),
            ));
        }
        if self.default_placement.page == 0 {
            return Err(SignpadError::InvalidConfig(
                "defaultPlacement.page is 1-indexed".to_string(),
            ));
        }
        let width = self.default_stroke.width;
        if !(width.is_finite() && width > 0.0) {
            return Err(SignpadError::InvalidConfig(format!(
                "defaultStroke.width must be positive, got {}",
                width
            )));
        }
        Ok(())
    }
}
