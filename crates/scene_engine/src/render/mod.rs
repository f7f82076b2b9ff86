//! # Rendering System
//!
//! Everything between the scene graph and the graphics device:
//!
//! - **Device**: the [`GraphicsDevice`](device::GraphicsDevice) seam the renderer issues calls through
//! - **Resources**: meshes, materials, shaders and textures owned by id
//! - **Camera/Projection**: view and projection matrix derivation
//! - **Lighting**: the bounded light registry bound as shader uniforms
//! - **Renderer**: per-frame traversal and draw dispatch
//!
//! ## Failure policy
//!
//! Rendering degrades instead of halting. Shader build failures surface as
//! [`RenderError::ShaderBuild`] from the build call and leave that shader
//! unusable; objects whose mesh, material or shader is missing or unusable
//! are skipped for the frame.

use thiserror::Error;

pub mod camera;
pub mod colour;
pub mod device;
pub mod lighting;
pub mod material;
pub mod mesh;
pub mod projection;
pub mod renderer;
pub mod resources;
pub mod shader;

pub use camera::{Camera, ViewMode};
pub use colour::Colour4;
pub use device::{GraphicsDevice, RecordingDevice};
pub use lighting::{AmbientLight, DirectionalLight, Light, LightHandle, LightKind, LightRegistry, PointLight};
pub use material::{Material, Texture};
pub use mesh::{Mesh, MeshData};
pub use renderer::{FrameStats, RenderContext, RenderPhase, Renderer};
pub use resources::{MaterialId, MeshId, Resources, ShaderId, TextureId};
pub use shader::{Shader, ShaderSource};

/// High-level rendering error types
///
/// Represents errors raised while creating render resources, abstracted from
/// the graphics API behind [`GraphicsDevice`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A shader failed to compile or link
    ///
    /// Carries the shader name and the device diagnostic. The shader stays
    /// unusable; the rest of the engine keeps running.
    #[error("Shader build failed: {0}")]
    ShaderBuild(String),

    /// Resource creation or management failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Mesh arrays do not match their documented strides
    #[error("Invalid mesh data: {0}")]
    InvalidMeshData(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for operations against the graphics device
pub type BackendResult<T> = Result<T, RenderError>;
