//! Render resource library
//!
//! [`Resources`] owns every mesh, material, shader and texture in slot maps
//! keyed by generational ids. Scene objects refer to resources by id only, so
//! a removed resource turns into a dangling id that the renderer skips rather
//! than a dangling reference.

use slotmap::{new_key_type, SlotMap};

use crate::render::device::GraphicsDevice;
use crate::render::material::{Material, Texture};
use crate::render::mesh::Mesh;
use crate::render::shader::Shader;
use crate::render::RenderError;

new_key_type! {
    /// Id of a [`Mesh`] in [`Resources`]
    pub struct MeshId;
    /// Id of a [`Material`] in [`Resources`]
    pub struct MaterialId;
    /// Id of a [`Shader`] in [`Resources`]
    pub struct ShaderId;
    /// Id of a [`Texture`] in [`Resources`]
    pub struct TextureId;
}

/// Library of render resources
#[derive(Debug, Default)]
pub struct Resources {
    meshes: SlotMap<MeshId, Mesh>,
    materials: SlotMap<MaterialId, Material>,
    shaders: SlotMap<ShaderId, Shader>,
    textures: SlotMap<TextureId, Texture>,
}

impl Resources {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(mesh)
    }

    /// Look up a mesh
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    /// Look up a mesh mutably
    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id)
    }

    /// Remove a mesh, deleting its device buffers
    pub fn remove_mesh(&mut self, id: MeshId, device: &mut dyn GraphicsDevice) -> Option<Mesh> {
        let mut mesh = self.meshes.remove(id)?;
        mesh.release(device);
        Some(mesh)
    }

    /// Add a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    /// Look up a material
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Look up a material mutably
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Remove a material
    pub fn remove_material(&mut self, id: MaterialId) -> Option<Material> {
        self.materials.remove(id)
    }

    /// Add a shader
    pub fn add_shader(&mut self, shader: Shader) -> ShaderId {
        self.shaders.insert(shader)
    }

    /// Look up a shader
    pub fn shader(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id)
    }

    /// Look up a shader mutably
    pub fn shader_mut(&mut self, id: ShaderId) -> Option<&mut Shader> {
        self.shaders.get_mut(id)
    }

    /// Remove a shader, deleting its program
    pub fn remove_shader(&mut self, id: ShaderId, device: &mut dyn GraphicsDevice) -> Option<Shader> {
        let mut shader = self.shaders.remove(id)?;
        shader.release(device);
        Some(shader)
    }

    /// Add a texture
    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.insert(texture)
    }

    /// Look up a texture
    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    /// Remove a texture, deleting its device texture
    pub fn remove_texture(&mut self, id: TextureId, device: &mut dyn GraphicsDevice) -> Option<Texture> {
        let mut texture = self.textures.remove(id)?;
        texture.release(device);
        Some(texture)
    }

    /// All shaders with their ids
    pub fn shaders(&self) -> impl Iterator<Item = (ShaderId, &Shader)> {
        self.shaders.iter()
    }

    /// Number of meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Build every shader that has no program yet and upload every mesh and
    /// texture that has no device resource yet
    ///
    /// Failures are logged and collected; one bad resource does not stop
    /// the others from being prepared.
    pub fn prepare(&mut self, device: &mut dyn GraphicsDevice) -> Vec<RenderError> {
        let mut errors = Vec::new();

        for (_, shader) in self.shaders.iter_mut().filter(|(_, shader)| shader.program().is_none()) {
            if let Err(error) = shader.build(device) {
                errors.push(error);
            }
        }
        for (_, mesh) in &mut self.meshes {
            if let Err(error) = mesh.upload(device) {
                log::error!("Failed to upload mesh '{}': {error}", mesh.name());
                errors.push(error);
            }
        }
        for (_, texture) in &mut self.textures {
            if let Err(error) = texture.upload(device) {
                log::error!("Failed to upload texture: {error}");
                errors.push(error);
            }
        }

        log::debug!(
            "Prepared {} shaders, {} meshes, {} textures ({} errors)",
            self.shaders.len(),
            self.meshes.len(),
            self.textures.len(),
            errors.len()
        );
        errors
    }

    /// Delete every device resource, keeping the CPU-side data
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) {
        for (_, shader) in &mut self.shaders {
            shader.release(device);
        }
        for (_, mesh) in &mut self.meshes {
            mesh.release(device);
        }
        for (_, texture) in &mut self.textures {
            texture.release(device);
        }
        log::info!("Released all device resources");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::colour::Colour4;
    use crate::render::device::RecordingDevice;
    use crate::render::shader::ShaderSource;

    #[test]
    fn test_prepare_collects_failures_and_continues() {
        let mut device = RecordingDevice::new();
        let mut resources = Resources::new();
        resources.add_shader(Shader::new("broken", ShaderSource::new("", "")));
        let good = resources.add_shader(Shader::new(
            "ok",
            ShaderSource::new("attribute vec3 A_Position; void main() {}", "void main() {}"),
        ));
        let mesh = resources.add_mesh(Mesh::cube());
        resources.add_texture(Texture::solid(Colour4::WHITE));

        let errors = resources.prepare(&mut device);
        assert_eq!(errors.len(), 1);
        assert!(resources.shader(good).unwrap().is_usable());
        assert!(resources.mesh(mesh).unwrap().is_uploaded());
        assert_eq!(device.live_textures(), 1);

        resources.release_all(&mut device);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_removed_mesh_id_dangles() {
        let mut device = RecordingDevice::new();
        let mut resources = Resources::new();
        let id = resources.add_mesh(Mesh::cube());
        resources.mesh_mut(id).unwrap().upload(&mut device).unwrap();

        assert!(resources.remove_mesh(id, &mut device).is_some());
        assert!(resources.mesh(id).is_none());
        assert_eq!(device.live_buffers(), 0);
    }
}
