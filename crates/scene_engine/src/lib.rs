//! # Scene Engine
//!
//! A hierarchical 3D scene engine: objects arranged in a tree, composed into
//! per-object matrices, lit by a bounded set of lights, moved by keyframe
//! animations and drawn through shader programs on a pluggable graphics
//! device.
//!
//! ## Features
//!
//! - **Precision-normalised math**: fixed-size vectors and matrices with
//!   closed-form determinant and inverse
//! - **Transform stack**: parent-relative composition in a fixed
//!   translate, rotate, scale, shear order
//! - **Bounded lighting**: one ambient, three directional and eight point
//!   light slots
//! - **Draw dispatch**: attribute and uniform discovery per shader,
//!   transparent objects drawn back to front
//! - **Keyframe animation**: cyclic segments with carry-over between them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let mut engine = Engine::new(ApplicationConfig::default())?;
//!     let mut device = RecordingDevice::new();
//!
//!     let mesh = engine.resources.add_mesh(Mesh::cube());
//!     let shader = engine.resources.add_shader(Shader::new(
//!         "flat",
//!         ShaderSource::new("attribute vec3 A_Position; void main() {}", "void main() {}"),
//!     ));
//!     let material = engine.resources.add_material(Material::new("grey").with_shader(shader));
//!     engine.scene.add(SceneObject::new("cube").with_mesh(mesh).with_material(material));
//!     engine.prepare(&mut device);
//!
//!     engine.advance_animations(16.0);
//!     let stats = engine.render_frame(&mut device);
//!     assert_eq!(stats.draw_calls, 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod animation;
pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        animation::{Animation, AnimationState, Keyframe},
        config::Config,
        core::config::{ApplicationConfig, EngineConfig, RendererConfig},
        foundation::{
            math::{Matrix3, Matrix4, Vector2, Vector3, Vector4},
            time::FrameTimer,
        },
        render::{
            AmbientLight, Camera, Colour4, DirectionalLight, FrameStats, GraphicsDevice, Material, Mesh, MeshData,
            PointLight, RecordingDevice, Shader, ShaderSource, Texture,
        },
        scene::{ObjectId, Scene, SceneObject, Transform},
        Engine, EngineError,
    };
}
