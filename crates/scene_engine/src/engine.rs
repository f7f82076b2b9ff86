//! Core engine implementation
//!
//! [`Engine`] owns one scene with everything it needs to be drawn: the
//! object tree, the resource library, the lights, the camera and the
//! renderer. The host calls [`Engine::advance_animations`] and then
//! [`Engine::render_frame`] once per display refresh.

use thiserror::Error;

use crate::animation::{Animation, AnimationError, AnimationId, Keyframe};
use crate::config::ConfigError;
use crate::core::config::ApplicationConfig;
use crate::render::camera::Camera;
use crate::render::device::GraphicsDevice;
use crate::render::lighting::LightRegistry;
use crate::render::renderer::{FrameStats, RenderContext, Renderer};
use crate::render::resources::Resources;
use crate::render::RenderError;
use crate::scene::{ObjectId, Scene, SceneError};

/// Main engine struct
///
/// Scene, resources, lights and camera are public so the application can
/// edit them freely between frames.
#[derive(Debug)]
pub struct Engine {
    /// Object tree and animations
    pub scene: Scene,

    /// Meshes, materials, shaders and textures
    pub resources: Resources,

    /// Registered lights
    pub lights: LightRegistry,

    /// Viewer
    pub camera: Camera,

    renderer: Renderer,

    /// Engine configuration
    config: ApplicationConfig,

    /// Milliseconds of animation time since start
    elapsed_ms: f32,
}

impl Engine {
    /// Create a new engine instance
    pub fn new(config: ApplicationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");

        let mut camera = config.camera.clone();
        camera.update_viewport(config.renderer.viewport_width, config.renderer.viewport_height);
        let renderer = Renderer::new(config.renderer.clone());

        Ok(Self {
            scene: Scene::new(),
            resources: Resources::new(),
            lights: LightRegistry::new(),
            camera,
            renderer,
            config,
            elapsed_ms: 0.0,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// The renderer
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// The renderer, mutably
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Milliseconds of animation time since start
    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed_ms
    }

    /// Build pending shaders and upload pending meshes and textures
    ///
    /// Failures are logged and returned; the engine stays usable and
    /// objects depending on a failed resource are skipped when drawing.
    pub fn prepare(&mut self, device: &mut dyn GraphicsDevice) -> Vec<RenderError> {
        let errors = self.resources.prepare(device);
        if !errors.is_empty() {
            log::warn!("{} resources failed to prepare", errors.len());
        }
        errors
    }

    /// Create an animation of `target` and attach it
    pub fn animate(
        &mut self,
        name: &str,
        target: ObjectId,
        keyframes: &[Keyframe],
        looping: bool,
    ) -> Result<AnimationId, EngineError> {
        let animation = Animation::new(name, target, keyframes, looping)?;
        Ok(self.scene.add_animation(animation)?)
    }

    /// Tick every animation by `elapsed_ms`
    pub fn advance_animations(&mut self, elapsed_ms: f32) {
        self.elapsed_ms += elapsed_ms;
        self.scene.advance_animations(elapsed_ms, &mut self.resources);
    }

    /// Draw the scene once
    pub fn render_frame(&mut self, device: &mut dyn GraphicsDevice) -> FrameStats {
        let context = RenderContext {
            scene: &self.scene,
            resources: &self.resources,
            lights: &self.lights,
            camera: &self.camera,
            time_ms: self.elapsed_ms,
        };
        self.renderer.render(&context, device)
    }

    /// Resize the render target and update the camera aspect ratio
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {width}x{height}");
            return;
        }
        self.renderer.set_viewport(width, height);
        self.camera.update_viewport(width, height);
        log::info!("Viewport resized to {width}x{height}");
    }

    /// Release every device resource and empty the scene
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        self.resources.release_all(device);
        self.scene.clear();
        self.lights.clear();
        log::info!("Engine shutdown complete");
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A scene edit was rejected
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// An animation could not be built
    #[error("Animation error: {0}")]
    Animation(#[from] AnimationError),

    /// A render resource could not be created
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}
