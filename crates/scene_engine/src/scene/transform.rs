//! Per-object transform
//!
//! A [`Transform`] is plain data: position, Euler rotation in degrees, scale
//! and shear angles in degrees. The matrices built from it are consumed by
//! [`ModelView`](super::model_view::ModelView), which fixes the composition
//! order.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{radian, Matrix4, Vector3};

/// Position, rotation, scale and shear of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Translation relative to the parent
    pub position: Vector3,
    /// Rotation about the X, Y and Z axes in degrees
    pub rotation: Vector3,
    /// Multiplicative scale per axis
    pub scale: Vector3,
    /// Shear angles in degrees
    pub shear: Vector3,
}

impl Transform {
    /// World up axis
    pub const UP: Vector3 = Vector3::UNIT_Y;

    /// World forward axis
    pub const FORWARD: Vector3 = Vector3::UNIT_Z;

    /// World right axis
    pub const RIGHT: Vector3 = Vector3::UNIT_X;

    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Vector3::ZERO,
        rotation: Vector3::ZERO,
        scale: Vector3::ONE,
        shear: Vector3::ZERO,
    };

    /// Create an identity transform
    pub fn new() -> Self {
        Self::IDENTITY
    }

    /// Create a transform with only a translation
    pub fn from_position(position: Vector3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    /// Builder pattern: Set position
    #[must_use]
    pub fn with_position(mut self, position: Vector3) -> Self {
        self.position = position;
        self
    }

    /// Builder pattern: Set rotation (degrees)
    #[must_use]
    pub fn with_rotation(mut self, rotation: Vector3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder pattern: Set scale
    #[must_use]
    pub fn with_scale(mut self, scale: Vector3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder pattern: Set shear (degrees)
    #[must_use]
    pub fn with_shear(mut self, shear: Vector3) -> Self {
        self.shear = shear;
        self
    }

    /// Translation matrix
    pub fn translation_matrix(&self) -> Matrix4 {
        Matrix4::from_translation(self.position)
    }

    /// Rotation matrix `Rz · Ry · Rx`
    ///
    /// Under the column-vector convention the X rotation is applied to a
    /// point first, then Y, then Z.
    #[rustfmt::skip]
    pub fn rotation_matrix(&self) -> Matrix4 {
        let (sx, cx) = radian(self.rotation.x()).sin_cos();
        let (sy, cy) = radian(self.rotation.y()).sin_cos();
        let (sz, cz) = radian(self.rotation.z()).sin_cos();

        let rx = Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, cx,  -sx, 0.0,
            0.0, sx,  cx,  0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let ry = Matrix4::new(
            cy,  0.0, sy,  0.0,
            0.0, 1.0, 0.0, 0.0,
            -sy, 0.0, cy,  0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let rz = Matrix4::new(
            cz,  -sz, 0.0, 0.0,
            sz,  cz,  0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rz * ry * rx
    }

    /// Scale matrix
    #[rustfmt::skip]
    pub fn scale_matrix(&self) -> Matrix4 {
        Matrix4::new(
            self.scale.x(), 0.0,            0.0,            0.0,
            0.0,            self.scale.y(), 0.0,            0.0,
            0.0,            0.0,            self.scale.z(), 0.0,
            0.0,            0.0,            0.0,            1.0,
        )
    }

    /// Shear matrix
    ///
    /// `shear.x` (φ) shears y by x, `shear.y` (θ) shears z by y and
    /// `shear.z` (ρ) shears x by z.
    #[rustfmt::skip]
    pub fn shear_matrix(&self) -> Matrix4 {
        let phi = radian(self.shear.x()).tan();
        let theta = radian(self.shear.y()).tan();
        let rho = radian(self.shear.z()).tan();

        Matrix4::new(
            1.0, 0.0,   rho, 0.0,
            phi, 1.0,   0.0, 0.0,
            0.0, theta, 1.0, 0.0,
            0.0, 0.0,   0.0, 1.0,
        )
    }

    /// Local matrix `T · R · S · H` relative to the parent
    pub fn local_matrix(&self) -> Matrix4 {
        self.translation_matrix() * self.rotation_matrix() * self.scale_matrix() * self.shear_matrix()
    }

    /// [`Transform::UP`] rotated by this transform
    pub fn up(&self) -> Vector3 {
        self.rotate_axis(Self::UP)
    }

    /// [`Transform::FORWARD`] rotated by this transform
    pub fn forward(&self) -> Vector3 {
        self.rotate_axis(Self::FORWARD)
    }

    /// [`Transform::RIGHT`] rotated by this transform
    pub fn right(&self) -> Vector3 {
        self.rotate_axis(Self::RIGHT)
    }

    fn rotate_axis(&self, axis: Vector3) -> Vector3 {
        (self.rotation_matrix() * axis.extend(0.0)).truncate()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
