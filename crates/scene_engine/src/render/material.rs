//! Material system for rendering
//!
//! A [`Material`] pairs surface colours with the shader that draws them and
//! up to three texture maps. Textures are bound to fixed units: the image map
//! to unit 0, the bump map to unit 1 and the specular map to unit 2.

use crate::render::colour::Colour4;
use crate::render::device::{GraphicsDevice, TextureHandle};
use crate::render::resources::{ShaderId, TextureId};
use crate::render::{BackendResult, RenderError};

/// Texture unit of the image map
pub const IMAGE_UNIT: u32 = 0;
/// Texture unit of the bump map
pub const BUMP_UNIT: u32 = 1;
/// Texture unit of the specular map
pub const SPECULAR_UNIT: u32 = 2;

/// Surface properties for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Ambient colour
    pub ambient: Colour4,
    /// Diffuse colour; animations tint this
    pub diffuse: Colour4,
    /// Specular colour
    pub specular: Colour4,
    /// Specular exponent
    pub shininess: f32,
    /// Opacity; anything below 1.0 is drawn blended
    pub alpha: f32,
    /// Shader that draws this material
    pub shader: Option<ShaderId>,
    /// Colour texture (unit 0)
    pub image_map: Option<TextureId>,
    /// Normal perturbation texture (unit 1)
    pub bump_map: Option<TextureId>,
    /// Specular intensity texture (unit 2)
    pub specular_map: Option<TextureId>,
}

impl Material {
    /// Create a material with default properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: Colour4::new(0.5, 0.5, 0.5, 1.0),
            diffuse: Colour4::new(0.75, 0.75, 0.75, 1.0),
            specular: Colour4::WHITE,
            shininess: 5.0,
            alpha: 1.0,
            shader: None,
            image_map: None,
            bump_map: None,
            specular_map: None,
        }
    }

    /// Set the shader
    #[must_use]
    pub fn with_shader(mut self, shader: ShaderId) -> Self {
        self.shader = Some(shader);
        self
    }

    /// Set the diffuse colour
    #[must_use]
    pub fn with_diffuse(mut self, colour: Colour4) -> Self {
        self.diffuse = colour;
        self
    }

    /// Set the ambient colour
    #[must_use]
    pub fn with_ambient(mut self, colour: Colour4) -> Self {
        self.ambient = colour;
        self
    }

    /// Set the specular colour and exponent
    #[must_use]
    pub fn with_specular(mut self, colour: Colour4, shininess: f32) -> Self {
        self.specular = colour;
        self.shininess = shininess;
        self
    }

    /// Set the alpha/transparency
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Set the image map
    #[must_use]
    pub fn with_image_map(mut self, texture: TextureId) -> Self {
        self.image_map = Some(texture);
        self
    }

    /// Set the bump map
    #[must_use]
    pub fn with_bump_map(mut self, texture: TextureId) -> Self {
        self.bump_map = Some(texture);
        self
    }

    /// Set the specular map
    #[must_use]
    pub fn with_specular_map(mut self, texture: TextureId) -> Self {
        self.specular_map = Some(texture);
        self
    }

    /// Whether the material needs blending
    pub fn is_transparent(&self) -> bool {
        self.alpha < 1.0
    }

    /// Texture maps with their units
    pub fn texture_units(&self) -> [(u32, Option<TextureId>); 3] {
        [
            (IMAGE_UNIT, self.image_map),
            (BUMP_UNIT, self.bump_map),
            (SPECULAR_UNIT, self.specular_map),
        ]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default")
    }
}

/// RGBA8 image plus its device texture once uploaded
#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    handle: Option<TextureHandle>,
}

impl Texture {
    /// Create a texture from tightly packed RGBA8 pixels
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> BackendResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(RenderError::ResourceCreationFailed(format!(
                "texture {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels, handle: None })
    }

    /// 1x1 texture of a single colour
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn solid(colour: Colour4) -> Self {
        let pixels = colour.to_array().map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8);
        Self { width: 1, height: 1, pixels: pixels.to_vec(), handle: None }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Device texture, if uploaded
    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    /// Create the device texture; does nothing when already uploaded
    pub fn upload(&mut self, device: &mut dyn GraphicsDevice) -> BackendResult<()> {
        if self.handle.is_none() {
            self.handle = Some(device.create_texture(self.width, self.height, &self.pixels)?);
        }
        Ok(())
    }

    /// Delete the device texture, if any
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(handle) = self.handle.take() {
            device.delete_texture(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::RecordingDevice;

    #[test]
    fn test_transparency() {
        assert!(!Material::default().is_transparent());
        assert!(Material::default().with_alpha(0.4).is_transparent());
        assert_eq!(Material::default().with_alpha(3.0).alpha, 1.0);
    }

    #[test]
    fn test_texture_size_validation() {
        assert!(Texture::new(2, 1, vec![0; 8]).is_ok());
        assert!(Texture::new(2, 1, vec![0; 7]).is_err());
        assert!(Texture::new(0, 0, Vec::new()).is_err());
    }

    #[test]
    fn test_solid_texture_upload_and_release() {
        let mut device = RecordingDevice::new();
        let mut texture = Texture::solid(Colour4::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!(texture.pixels(), &[255, 128, 0, 255]);

        texture.upload(&mut device).unwrap();
        texture.upload(&mut device).unwrap();
        assert_eq!(device.live_textures(), 1);

        texture.release(&mut device);
        assert_eq!(device.live_textures(), 0);
        assert!(texture.handle().is_none());
    }
}
