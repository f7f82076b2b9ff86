//! Math utilities and types
//!
//! Provides the fixed-size vector and matrix types used by the transform,
//! projection and lighting code, together with the scalar helpers they share.
//!
//! ## Precision normalisation
//!
//! Every component written into a vector or matrix is passed through [`clean`],
//! which rounds it to [`DECIMAL_PLACES`] decimal places. Repeated composition
//! (hierarchical transforms, per-frame animation accumulation) would otherwise
//! accumulate floating point noise such as `cos(90°) = -4.37e-8`.

pub mod matrix;
pub mod vector;

pub use matrix::{Matrix2, Matrix3, Matrix4};
pub use vector::{Vector2, Vector3, Vector4};

/// Number of decimal places every stored component is rounded to
pub const DECIMAL_PLACES: i32 = 5;

/// Scale factor matching [`DECIMAL_PLACES`]
const PRECISION_SCALE: f64 = 100_000.0;

/// Round a value to [`DECIMAL_PLACES`] decimal places
///
/// Non-finite values pass through untouched and negative zero is folded into
/// positive zero so that cleaned values compare and hash consistently.
#[allow(clippy::cast_possible_truncation)]
pub fn clean(value: f32) -> f32 {
    if !value.is_finite() {
        return value;
    }

    let rounded = ((f64::from(value) * PRECISION_SCALE).round() / PRECISION_SCALE) as f32;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Convert degrees to radians
pub fn radian(degrees: f32) -> f32 {
    clean(degrees * constants::DEG_TO_RAD)
}

/// Convert radians to degrees
pub fn degree(radians: f32) -> f32 {
    clean(radians * constants::RAD_TO_DEG)
}

/// Cotangent of an angle given in radians
///
/// `cot(π/2)` evaluates to zero after cleaning rather than a tiny residue,
/// which the oblique orthographic projection relies on for its default tilt.
pub fn cot(radians: f32) -> f32 {
    clean(1.0 / radians.tan())
}

/// Clamp a value between min and max
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    clean(value.max(min).min(max))
}

/// Linear interpolation between `min` and `max`
pub fn lerp(min: f32, max: f32, time: f32) -> f32 {
    clean(min + time * (max - min))
}

/// Position of `value` within `[min, max]` as a fraction
pub fn inverse_lerp(min: f32, max: f32, value: f32) -> f32 {
    clean((value - min) / (max - min))
}

/// Map `value` from the input range onto the output range
pub fn remap(input_min: f32, input_max: f32, output_min: f32, output_max: f32, value: f32) -> f32 {
    lerp(output_min, output_max, inverse_lerp(input_min, input_max, value))
}

/// Whether `value` is a power of two (zero excluded)
pub const fn is_power_of_two(value: u32) -> bool {
    value != 0 && (value & (value - 1)) == 0
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_rounds_to_decimal_places() {
        assert_eq!(clean(1.234_567), 1.234_57);
        assert_eq!(clean(-4.37e-8), 0.0);
        assert!(clean(-4.37e-8).is_sign_positive());
        assert_eq!(clean(f32::INFINITY), f32::INFINITY);
    }

    #[test]
    fn test_radian_and_degree() {
        assert_eq!(radian(180.0), clean(std::f32::consts::PI));
        assert_eq!(degree(std::f32::consts::FRAC_PI_2), 90.0);
    }

    #[test]
    fn test_cot_of_right_angle_is_zero() {
        assert_eq!(cot(radian(90.0)), 0.0);
        assert_eq!(cot(radian(45.0)), 1.0);
    }

    #[test]
    fn test_interpolation_helpers() {
        assert_eq!(lerp(0.0, 10.0, 0.25), 2.5);
        assert_eq!(inverse_lerp(0.0, 10.0, 2.5), 0.25);
        assert_eq!(remap(0.0, 1.0, 0.0, 100.0, 0.5), 50.0);
        assert_eq!(clamp(270.0, 0.0, 180.0), 180.0);
    }

    #[test]
    fn test_is_power_of_two() {
        assert!(is_power_of_two(256));
        assert!(!is_power_of_two(300));
        assert!(!is_power_of_two(0));
    }
}
