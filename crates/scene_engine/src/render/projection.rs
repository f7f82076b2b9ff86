//! Projection and view matrix derivation
//!
//! Pure functions from camera parameters to 4x4 matrices. All matrices follow
//! the engine's column-vector convention (`clip = P * V * M * v`) with a
//! right-handed view space looking down `-Z`, mapping depth to the `[-1, 1]`
//! clip range.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{clean, cot, radian, Matrix4, Vector3};

/// Extents of the near plane (perspective) or view volume (orthographic)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrustumBounds {
    /// Left edge
    pub left: f32,
    /// Right edge
    pub right: f32,
    /// Top edge
    pub top: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl FrustumBounds {
    /// Create bounds from the four edges
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self { left, right, top, bottom }
    }

    /// Horizontal extent
    pub fn width(&self) -> f32 {
        clean(self.right - self.left)
    }

    /// Vertical extent
    pub fn height(&self) -> f32 {
        clean(self.top - self.bottom)
    }
}

impl Default for FrustumBounds {
    fn default() -> Self {
        Self::new(-10.0, 10.0, 10.0, -10.0)
    }
}

/// Near-plane bounds of a symmetric perspective frustum
///
/// `fov_degrees` is the full vertical field of view, so the top edge sits at
/// `near * tan(fov / 2)`.
pub fn perspective_bounds(near: f32, fov_degrees: f32, aspect: f32) -> FrustumBounds {
    let top = clean(near * (radian(fov_degrees) / 2.0).tan());
    let right = clean(top * aspect);
    FrustumBounds::new(-right, right, top, -top)
}

/// Perspective projection matrix
///
/// ```text
/// | 2n/w   0     (r+l)/w    0        |
/// | 0      2n/h  (t+b)/h    0        |
/// | 0      0     -(f+n)/d   -2fn/d   |
/// | 0      0     -1         0        |
/// ```
///
/// where `w`, `h` are the near-plane extents and `d = f - n`.
pub fn perspective(near: f32, far: f32, fov_degrees: f32, aspect: f32) -> Matrix4 {
    let FrustumBounds { left, right, top, bottom } = perspective_bounds(near, fov_degrees, aspect);
    let width = right - left;
    let height = top - bottom;
    let depth = far - near;

    Matrix4::from_rows([
        [2.0 * near / width, 0.0, (right + left) / width, 0.0],
        [0.0, 2.0 * near / height, (top + bottom) / height, 0.0],
        [0.0, 0.0, -(far + near) / depth, -2.0 * far * near / depth],
        [0.0, 0.0, -1.0, 0.0],
    ])
}

/// Oblique orthographic projection matrix
///
/// `theta_degrees` and `phi_degrees` tilt the projection direction away from
/// the view axis horizontally and vertically. At 90° both cotangents vanish
/// and the result is the ordinary axis-aligned orthographic matrix; smaller
/// angles shift the bounds by `near * cot(angle)` and shear depth into x/y.
pub fn orthographic(bounds: FrustumBounds, near: f32, far: f32, theta_degrees: f32, phi_degrees: f32) -> Matrix4 {
    let theta = cot(radian(theta_degrees));
    let phi = cot(radian(phi_degrees));

    let left = bounds.left - near * theta;
    let right = bounds.right - near * theta;
    let top = bounds.top - near * phi;
    let bottom = bounds.bottom - near * phi;

    let width = right - left;
    let height = top - bottom;
    let depth = far - near;

    Matrix4::from_rows([
        [2.0 / width, 0.0, theta, -(left + right) / width],
        [0.0, 2.0 / height, phi, -(top + bottom) / height],
        [0.0, 0.0, -2.0 / depth, -(far + near) / depth],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// View matrix placing the eye at `position` looking towards `target`
///
/// Builds the camera basis `right = unit(forward × up)`,
/// `up' = right × forward` and inverts the camera-to-world matrix whose
/// columns are `[right, up', -forward, position]`. A degenerate basis
/// (target on the eye, or `up` parallel to the view direction) is singular
/// and comes back uninverted.
pub fn look_at(position: Vector3, target: Vector3, up: Vector3) -> Matrix4 {
    let forward = (target - position).normalized();
    let right = forward.cross(up).normalized();
    let true_up = right.cross(forward);

    let camera_to_world = Matrix4::from_rows([
        [right.x(), true_up.x(), -forward.x(), position.x()],
        [right.y(), true_up.y(), -forward.y(), position.y()],
        [right.z(), true_up.z(), -forward.z(), position.z()],
        [0.0, 0.0, 0.0, 1.0],
    ]);
    camera_to_world.inverse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_right_angle_fov() {
        let bounds = perspective_bounds(1.0, 90.0, 1.0);
        assert_eq!(bounds.top, 1.0);
        assert_eq!(bounds.right, 1.0);

        let matrix = perspective(1.0, 100.0, 90.0, 1.0);
        assert_eq!(matrix.get(1, 1), 2.0 * 1.0 / bounds.height());
        assert_eq!(matrix.get(1, 1), 1.0);
        assert_eq!(matrix.get(3, 2), -1.0);
        assert_eq!(matrix.get(3, 3), 0.0);
        assert_relative_eq!(matrix.get(2, 2), -101.0 / 99.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_maps_near_plane_to_minus_one() {
        let matrix = perspective(1.0, 100.0, 60.0, 1.5);
        let clip = matrix * Vector3::new(0.0, 0.0, -1.0).extend(1.0);
        assert_relative_eq!(clip.z() / clip.w(), -1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_orthographic_without_tilt_is_axis_aligned() {
        let matrix = orthographic(FrustumBounds::default(), 1.0, 101.0, 90.0, 90.0);
        assert_eq!(matrix.get(0, 0), 0.1);
        assert_eq!(matrix.get(0, 2), 0.0);
        assert_eq!(matrix.get(2, 2), -0.02);
        assert_eq!(matrix.get(2, 3), -1.02);
    }

    #[test]
    fn test_orthographic_tilt_shears_depth() {
        let matrix = orthographic(FrustumBounds::default(), 1.0, 101.0, 45.0, 90.0);
        assert_eq!(matrix.get(0, 2), 1.0);
        assert_eq!(matrix.get(0, 3), 0.1);
        assert_eq!(matrix.get(1, 2), 0.0);
    }

    #[test]
    fn test_look_at_down_negative_z() {
        let view = look_at(Vector3::new(0.0, 0.0, 5.0), Vector3::ZERO, Vector3::UNIT_Y);
        assert_eq!(view.transform_point(Vector3::ZERO), Vector3::new(0.0, 0.0, -5.0));
        assert_eq!(view.get(0, 0), 1.0);
        assert_eq!(view.get(1, 1), 1.0);
    }
}
