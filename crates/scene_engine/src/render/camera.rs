//! # Camera
//!
//! Holds the projection parameters and the eye placement the renderer reads
//! once per frame. Input handling is expected to update the camera between
//! frames; the renderer never writes to it.
//!
//! Two projection modes are supported:
//! - **Perspective**: symmetric frustum from field of view and aspect ratio
//! - **Orthographic**: box view volume, optionally tilted into an oblique
//!   projection with the horizontal and vertical tilt angles

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Matrix4, Vector3};
use crate::render::projection::{self, FrustumBounds};

/// Projection mode of a [`Camera`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    /// Perspective projection
    #[default]
    Perspective,
    /// Orthographic projection (oblique when tilted)
    Orthographic,
}

/// Scene camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    /// Projection mode
    pub mode: ViewMode,
    /// Eye position in world space
    pub position: Vector3,
    /// Point the camera looks at in world space
    pub target: Vector3,
    /// Up direction used to orient the view
    pub up: Vector3,
    /// Vertical field of view in degrees (perspective)
    pub field_of_view: f32,
    /// Width over height of the render target
    pub aspect_ratio: f32,
    /// Distance to the near clipping plane
    pub near_clipping: f32,
    /// Distance to the far clipping plane
    pub far_clipping: f32,
    /// View volume edges (orthographic)
    pub bounds: FrustumBounds,
    /// Horizontal tilt in degrees; 90 is no tilt (orthographic)
    pub horizontal_tilt: f32,
    /// Vertical tilt in degrees; 90 is no tilt (orthographic)
    pub vertical_tilt: f32,
}

impl Camera {
    /// Create a perspective camera at `position` looking at the origin
    pub fn perspective(position: Vector3, field_of_view: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            mode: ViewMode::Perspective,
            position,
            field_of_view,
            aspect_ratio,
            near_clipping: near,
            far_clipping: far,
            ..Self::default()
        }
    }

    /// Create an orthographic camera at `position` looking at the origin
    pub fn orthographic(position: Vector3, bounds: FrustumBounds, near: f32, far: f32) -> Self {
        Self {
            mode: ViewMode::Orthographic,
            position,
            bounds,
            near_clipping: near,
            far_clipping: far,
            ..Self::default()
        }
    }

    /// Tilt the orthographic projection
    #[must_use]
    pub fn with_tilt(mut self, horizontal: f32, vertical: f32) -> Self {
        self.horizontal_tilt = horizontal;
        self.vertical_tilt = vertical;
        self
    }

    /// Point the camera at `target`
    pub fn look_at(&mut self, target: Vector3, up: Vector3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera looking at {target} with up {up}");
    }

    /// Update the aspect ratio from the render target size
    ///
    /// A zero height leaves the aspect ratio unchanged.
    #[allow(clippy::cast_precision_loss)]
    pub fn update_viewport(&mut self, width: u32, height: u32) {
        if height == 0 {
            log::debug!("Ignoring viewport update with zero height ({width}x{height})");
            return;
        }

        let aspect = width as f32 / height as f32;
        if (self.aspect_ratio - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect_ratio, aspect);
        }
        self.aspect_ratio = aspect;
    }

    /// Projection matrix for the current mode
    pub fn projection_matrix(&self) -> Matrix4 {
        match self.mode {
            ViewMode::Perspective => projection::perspective(
                self.near_clipping,
                self.far_clipping,
                self.field_of_view,
                self.aspect_ratio,
            ),
            ViewMode::Orthographic => projection::orthographic(
                self.bounds,
                self.near_clipping,
                self.far_clipping,
                self.horizontal_tilt,
                self.vertical_tilt,
            ),
        }
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Matrix4 {
        projection::look_at(self.position, self.target, self.up)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            mode: ViewMode::Perspective,
            position: Vector3::new(0.0, 0.0, 10.0),
            target: Vector3::ZERO,
            up: Vector3::UNIT_Y,
            field_of_view: 35.0,
            aspect_ratio: 16.0 / 9.0,
            near_clipping: 0.001,
            far_clipping: 10_000.0,
            bounds: FrustumBounds::default(),
            horizontal_tilt: 90.0,
            vertical_tilt: 90.0,
        }
    }
}
