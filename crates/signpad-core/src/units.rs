//! Conversion between centimeters and PDF points
//!
//! PDF user space is measured in points (1/72 inch) multiplied by the page's
//! `/UserUnit`. A page with `UserUnit 2` therefore needs half as many points
//! to cover the same physical distance.

/// Centimeters per inch
pub const CM_PER_INCH: f64 = 2.54;

/// PDF base resolution
pub const POINTS_PER_INCH: f64 = 72.0;

/// Points per centimeter at `UserUnit 1` (~28.3465)
pub const POINTS_PER_CM: f64 = POINTS_PER_INCH / CM_PER_INCH;

/// Fallback when a page declares no usable `/UserUnit`
pub const DEFAULT_USER_UNIT: f64 = 1.0;

/// Substitute the default for zero, negative, NaN or infinite user units.
pub fn sanitize_user_unit(user_unit: f64) -> f64 {
    if user_unit.is_finite() && user_unit > 0.0 {
        user_unit
    } else {
        DEFAULT_USER_UNIT
    }
}

/// Normalize a `/Rotate` value to 0, 90, 180 or 270.
///
/// Values that are not a multiple of 90 are invalid in PDF and read as 0.
pub fn sanitize_rotation(degrees: f64) -> u16 {
    if !degrees.is_finite() || degrees.fract() != 0.0 {
        return 0;
    }
    let turned = (degrees as i64).rem_euclid(360);
    if turned % 90 == 0 {
        turned as u16
    } else {
        0
    }
}

/// Convert centimeters to page-space points for a page with the given `/UserUnit`
pub fn cm_to_points(cm: f64, user_unit: f64) -> f64 {
    cm * POINTS_PER_CM / sanitize_user_unit(user_unit)
}

/// Convert page-space points back to centimeters
pub fn points_to_cm(points: f64, user_unit: f64) -> f64 {
    points * sanitize_user_unit(user_unit) / POINTS_PER_CM
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: points_to_cm inverts cm_to_points for any positive value and unit
        #[test]
        fn cm_points_roundtrip(cm in 0.001f64..10_000.0, unit in 0.01f64..1000.0) {
            let back = points_to_cm(cm_to_points(cm, unit), unit);
            prop_assert!(
                (back - cm).abs() <= cm * 1e-12,
                "roundtrip failed: {} -> {}", cm, back
            );
        }

        /// Property: conversion is linear in the centimeter value
        #[test]
        fn conversion_is_linear(cm in 0.0f64..500.0, unit in 0.1f64..10.0) {
            let single = cm_to_points(cm, unit);
            let double = cm_to_points(cm * 2.0, unit);
            prop_assert!((double - 2.0 * single).abs() < 1e-9);
        }

        /// Property: a larger user unit never yields more points
        #[test]
        fn larger_unit_fewer_points(cm in 0.1f64..500.0, unit in 1.0f64..100.0) {
            prop_assert!(cm_to_points(cm, unit) <= cm_to_points(cm, 1.0) + 1e-9);
        }
    }
}
