//! Scene demo application
//!
//! Builds a small animated scene (a spinning cube carrying an orbiting,
//! half-transparent child) and renders it headlessly against a recording
//! device, logging per-frame statistics.
//!
//! ```text
//! scene_demo [config.toml|config.ron] [frames]
//! ```

use std::time::Duration;

use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use scene_engine::render::device::DeviceCommand;
use thiserror::Error;

const VERTEX_SHADER: &str = "
    attribute vec3 A_Position;
    attribute vec3 A_Normal;
    attribute vec2 A_UV;
    uniform mat4 U_Matrix.Projection;
    uniform mat4 U_Matrix.View;
    uniform mat4 U_Matrix.ModelView;
    uniform mat3 U_Matrix.Normal;
    uniform float U_Global.Time;
    void main() {}
";

const FRAGMENT_SHADER: &str = "
    uniform vec4 U_Material.DiffuseColour;
    uniform float U_Material.Alpha;
    uniform sampler2D U_Sampler.Image;
    uniform vec4 U_Ambient.Colour;
    uniform float U_Ambient.Intensity;
    uniform DirectionalLight U_Directional[3];
    uniform PointLight U_Point[8];
    uniform int U_Global.DirectionalCount;
    uniform int U_Global.PointCount;
    uniform float u_pulse;
    void main() {}
";

/// Simulated wall-clock step between timer ticks
const TICK: Duration = Duration::from_millis(4);

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] scene_engine::config::ConfigError),

    #[error("Invalid frame count '{0}'")]
    FrameCount(String),
}

struct DemoApp {
    engine: Engine,
    device: RecordingDevice,
    timer: FrameTimer,
}

impl DemoApp {
    fn new(config: ApplicationConfig) -> Result<Self, DemoError> {
        let timer = FrameTimer::new(config.engine.render_rate_hz);
        let mut engine = Engine::new(config)?;
        let mut device = RecordingDevice::new();

        Self::build_scene(&mut engine)?;
        for error in engine.prepare(&mut device) {
            log::warn!("Continuing without resource: {error}");
        }

        Ok(Self { engine, device, timer })
    }

    fn build_scene(engine: &mut Engine) -> Result<(), DemoError> {
        let resources = &mut engine.resources;
        let shader = resources.add_shader(
            Shader::new("lit", ShaderSource::new(VERTEX_SHADER, FRAGMENT_SHADER)).with_size(1280, 720),
        );
        let cube = resources.add_mesh(Mesh::cube());
        let checker = resources.add_texture(Texture::solid(Colour4::rgb(0.8, 0.8, 0.8)));

        let solid = resources.add_material(
            Material::new("solid")
                .with_shader(shader)
                .with_diffuse(Colour4::rgb(0.9, 0.3, 0.2))
                .with_image_map(checker),
        );
        let glass = resources.add_material(
            Material::new("glass")
                .with_shader(shader)
                .with_diffuse(Colour4::rgb(0.2, 0.5, 0.9))
                .with_alpha(0.4),
        );

        let body = engine.scene.add(SceneObject::new("body").with_mesh(cube).with_material(solid));
        let moon = engine.scene.add_under(
            body,
            SceneObject::new("moon")
                .with_mesh(cube)
                .with_material(glass)
                .with_transform(Transform::from_position(Vector3::new(2.5, 0.0, 0.0)).with_scale(Vector3::splat(0.4))),
        ).map_err(EngineError::from)?;

        let spin = [
            Keyframe::new(2.0),
            Keyframe::new(2.0).with_rotation(Vector3::new(0.0, 180.0, 0.0)),
        ];
        engine.animate("spin", body, &spin, true)?;

        let bob = [
            Keyframe::new(1.0)
                .with_position(Vector3::new(2.5, 0.0, 0.0))
                .with_scale(Vector3::splat(0.4))
                .with_colour(Colour4::rgb(0.2, 0.5, 0.9)),
            Keyframe::new(1.0)
                .with_position(Vector3::new(2.5, 1.0, 0.0))
                .with_scale(Vector3::splat(0.6))
                .with_colour(Colour4::rgb(0.9, 0.9, 0.2)),
        ];
        engine.animate("bob", moon, &bob, true)?;

        engine.lights.add(AmbientLight::new(Colour4::WHITE, 0.15));
        engine
            .lights
            .add(DirectionalLight::new(Colour4::WHITE, 0.8, Vector3::new(-0.5, -1.0, -0.3)));
        engine
            .lights
            .add(PointLight::new(Colour4::rgb(1.0, 0.9, 0.7), 1.0, Vector3::new(0.0, 3.0, 3.0)).with_radius(10.0));

        log::info!("Scene built with {} objects", engine.scene.len());
        Ok(())
    }

    fn run(&mut self, frames: u64) {
        log::info!("Rendering {frames} frames at {:.2} ms per frame", self.timer.period_ms());

        while self.timer.frame_count() < frames {
            self.timer.advance(TICK);
            let Some(elapsed_ms) = self.timer.take_frame() else {
                continue;
            };

            self.engine.advance_animations(elapsed_ms);
            let stats = self.engine.render_frame(&mut self.device);
            let commands = self.device.take_commands();
            let uniform_writes = commands
                .iter()
                .filter(|command| matches!(command, DeviceCommand::SetUniform { .. }))
                .count();

            log::debug!(
                "Frame {}: {:.1} ms, {} draws ({} transparent), {} skipped, {} uniform writes",
                self.timer.frame_count(),
                elapsed_ms,
                stats.draw_calls,
                stats.transparent_draws,
                stats.skipped,
                uniform_writes
            );
        }

        if let Some(body) = self.engine.scene.find("body") {
            if let Some(object) = self.engine.scene.object(body) {
                log::info!("Final body rotation: {}", object.transform.rotation);
            }
        }
    }

    fn shutdown(mut self) {
        self.engine.shutdown(&mut self.device);
    }
}

fn main() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ApplicationConfig::load_from_file(path)?,
        None => ApplicationConfig::default(),
    };
    let frames = match args.next() {
        Some(text) => text.parse().map_err(|_| DemoError::FrameCount(text))?,
        None => 120,
    };

    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting scene demo");

    let mut app = DemoApp::new(config)?;
    app.run(frames);
    app.shutdown();

    log::info!("Scene demo finished");
    Ok(())
}
