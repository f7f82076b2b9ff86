//! RGBA colours
//!
//! Components are nominally in `0.0..=1.0` but are not clamped: animation
//! deltas may push a channel outside the range and the shader decides what to
//! do with it. Every write is precision-cleaned like the math types.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{clean, Vector3, Vector4};

/// RGBA colour with `f32` channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Colour4 {
    rgba: [f32; 4],
}

impl Colour4 {
    /// Opaque black
    pub const BLACK: Self = Self { rgba: [0.0, 0.0, 0.0, 1.0] };

    /// Opaque white
    pub const WHITE: Self = Self { rgba: [1.0, 1.0, 1.0, 1.0] };

    /// Fully transparent black
    pub const TRANSPARENT: Self = Self { rgba: [0.0; 4] };

    /// Create a colour from its four channels
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::from([r, g, b, a])
    }

    /// Create an opaque colour
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Red channel
    pub const fn r(&self) -> f32 {
        self.rgba[0]
    }

    /// Green channel
    pub const fn g(&self) -> f32 {
        self.rgba[1]
    }

    /// Blue channel
    pub const fn b(&self) -> f32 {
        self.rgba[2]
    }

    /// Alpha channel
    pub const fn a(&self) -> f32 {
        self.rgba[3]
    }

    /// Replace the alpha channel
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.rgba[3] = clean(alpha);
        self
    }

    /// Whether the alpha channel is fully opaque
    pub fn is_opaque(&self) -> bool {
        self.rgba[3] >= 1.0
    }

    /// Add `delta * factor` to every channel
    pub fn offset(&mut self, delta: [f32; 4], factor: f32) -> &mut Self {
        for (channel, step) in self.rgba.iter_mut().zip(delta) {
            *channel = clean(*channel + step * factor);
        }
        self
    }

    /// Channels as an array
    pub const fn to_array(self) -> [f32; 4] {
        self.rgba
    }

    /// Red, green and blue as a vector
    pub fn rgb_vector(self) -> Vector3 {
        Vector3::new(self.rgba[0], self.rgba[1], self.rgba[2])
    }
}

impl Default for Colour4 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Colour4 {
    fn from(rgba: [f32; 4]) -> Self {
        Self { rgba: rgba.map(clean) }
    }
}

impl From<Colour4> for [f32; 4] {
    fn from(colour: Colour4) -> Self {
        colour.rgba
    }
}

impl From<Colour4> for Vector4 {
    fn from(colour: Colour4) -> Self {
        Self::from_array(colour.rgba)
    }
}

impl From<Vector4> for Colour4 {
    fn from(vector: Vector4) -> Self {
        Self::from(vector.to_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opacity() {
        assert!(Colour4::WHITE.is_opaque());
        assert!(!Colour4::WHITE.with_alpha(0.5).is_opaque());
    }

    #[test]
    fn test_offset_accumulates_scaled_delta() {
        let mut colour = Colour4::BLACK;
        colour.offset([0.001, 0.0, -0.0005, 0.0], 250.0);
        assert_eq!(colour, Colour4::new(0.25, 0.0, -0.125, 1.0));
    }
}
