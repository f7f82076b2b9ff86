//! Per-frame scene traversal and draw dispatch
//!
//! A frame runs through the phases of [`RenderPhase`]:
//!
//! ```text
//! Idle -> ClearBuffers -> BindGlobalUniforms -> Traversing -> Idle
//! ```
//!
//! Traversal is depth-first from each root in insertion order. An object's
//! transform is pushed onto the [`ModelView`] stack, its children are
//! traversed, then the object itself is drawn and the transform popped.
//!
//! Opaque objects are drawn in place. Objects whose material alpha is below
//! one are queued and drawn after every root has been traversed, farthest
//! from the camera first, with blending on and depth testing off.

use crate::core::config::RendererConfig;
use crate::foundation::math::{Matrix3, Matrix4, Vector3};
use crate::render::camera::Camera;
use crate::render::device::{AttributeLocation, Capability, GraphicsDevice, ProgramHandle, UniformLocation, UniformValue};
use crate::render::lighting::LightRegistry;
use crate::render::material::Material;
use crate::render::mesh::{self, Mesh, MeshBuffers};
use crate::render::resources::Resources;
use crate::render::shader::{BaseUniforms, Shader};
use crate::scene::{ModelView, ObjectId, Scene, SceneObject};

/// Stage of the frame the renderer is in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderPhase {
    /// Between frames
    #[default]
    Idle,
    /// Clearing the render target
    ClearBuffers,
    /// Writing camera, light and global uniforms to every usable shader
    BindGlobalUniforms,
    /// Walking the object tree and drawing
    Traversing,
}

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Objects reached by traversal
    pub objects_visited: usize,
    /// Draw calls issued
    pub draw_calls: usize,
    /// Objects with a mesh or material that could not be drawn
    pub skipped: usize,
    /// Draw calls issued with blending enabled
    pub transparent_draws: usize,
}

/// Everything a frame reads
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Object tree to draw
    pub scene: &'a Scene,
    /// Meshes, materials, shaders and textures referenced by the scene
    pub resources: &'a Resources,
    /// Lights bound as global uniforms
    pub lights: &'a LightRegistry,
    /// Viewer
    pub camera: &'a Camera,
    /// Milliseconds since the engine started
    pub time_ms: f32,
}

/// Resolved resources of one drawable object
#[derive(Clone, Copy)]
struct Drawable<'a> {
    mesh: &'a Mesh,
    buffers: MeshBuffers,
    material: &'a Material,
    shader: &'a Shader,
    program: ProgramHandle,
}

/// Transparent draw deferred until traversal ends
struct QueuedDraw<'a> {
    drawable: Drawable<'a>,
    model_view: Matrix4,
    object_index: i32,
    distance: f32,
}

#[derive(Default)]
struct FrameState<'a> {
    stats: FrameStats,
    next_index: i32,
    transparent: Vec<QueuedDraw<'a>>,
}

/// Scene renderer
///
/// Owns the transform stack and the frame settings. Everything else it
/// needs arrives through [`RenderContext`] each frame.
#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    phase: RenderPhase,
    stack: ModelView,
    last_stats: FrameStats,
}

impl Renderer {
    /// Create a renderer
    pub fn new(config: RendererConfig) -> Self {
        log::info!(
            "Creating renderer ({}x{}, transparent sorting {})",
            config.viewport_width,
            config.viewport_height,
            if config.sort_transparent { "on" } else { "off" }
        );
        Self {
            config,
            phase: RenderPhase::Idle,
            stack: ModelView::with_capacity(16),
            last_stats: FrameStats::default(),
        }
    }

    /// Renderer settings
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Current phase
    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Statistics of the last completed frame
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Resize the render target
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
    }

    /// Enable or disable deferred back-to-front drawing of transparent objects
    pub fn set_transparent_sorting(&mut self, enabled: bool) {
        self.config.sort_transparent = enabled;
    }

    /// Draw one frame
    pub fn render(&mut self, context: &RenderContext<'_>, device: &mut dyn GraphicsDevice) -> FrameStats {
        self.enter(RenderPhase::ClearBuffers);
        device.viewport(self.config.viewport_width, self.config.viewport_height);
        device.clear(self.config.clear_colour);
        device.set_capability(Capability::DepthTest, true);
        device.set_capability(Capability::Blend, false);

        self.enter(RenderPhase::BindGlobalUniforms);
        bind_global_uniforms(context, device);

        self.enter(RenderPhase::Traversing);
        self.stack.clear();
        let mut frame = FrameState::default();
        for &root in context.scene.roots() {
            self.traverse(root, context, device, &mut frame);
        }
        if !self.stack.is_empty() {
            log::warn!("Transform stack unbalanced after traversal (depth {})", self.stack.depth());
            self.stack.clear();
        }

        // Stable sort keeps traversal order for equal distances
        frame.transparent.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        for queued in &frame.transparent {
            draw(&queued.drawable, &queued.model_view, queued.object_index, context.resources, device, &mut frame.stats);
        }

        self.enter(RenderPhase::Idle);
        log::debug!(
            "Frame: {} objects, {} draws ({} transparent), {} skipped",
            frame.stats.objects_visited,
            frame.stats.draw_calls,
            frame.stats.transparent_draws,
            frame.stats.skipped
        );
        self.last_stats = frame.stats;
        frame.stats
    }

    fn enter(&mut self, phase: RenderPhase) {
        log::trace!("Render phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn traverse<'a>(
        &mut self,
        id: ObjectId,
        context: &RenderContext<'a>,
        device: &mut dyn GraphicsDevice,
        frame: &mut FrameState<'a>,
    ) {
        let Some(object) = context.scene.object(id) else {
            log::trace!("Object {id:?} vanished during traversal");
            return;
        };

        frame.stats.objects_visited += 1;
        let object_index = frame.next_index;
        frame.next_index += 1;

        let model_view = self.stack.push(&object.transform);

        for &child in object.children() {
            self.traverse(child, context, device, frame);
        }

        if object.mesh.is_some() || object.material.is_some() {
            match resolve(object, context.resources) {
                Some(drawable) if drawable.material.is_transparent() && self.config.sort_transparent => {
                    let position = model_view.translation().truncate();
                    frame.transparent.push(QueuedDraw {
                        drawable,
                        model_view,
                        object_index,
                        distance: position.distance(context.camera.position),
                    });
                }
                Some(drawable) => {
                    draw(&drawable, &model_view, object_index, context.resources, device, &mut frame.stats);
                }
                None => frame.stats.skipped += 1,
            }
        }

        self.stack.pop();
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

/// Look up everything needed to draw `object`
fn resolve<'a>(object: &SceneObject, resources: &'a Resources) -> Option<Drawable<'a>> {
    let Some(mesh) = object.mesh.and_then(|id| resources.mesh(id)) else {
        log::trace!("Skipping '{}': no mesh", object.name);
        return None;
    };
    let Some(buffers) = mesh.buffers().copied() else {
        log::trace!("Skipping '{}': mesh '{}' not uploaded", object.name, mesh.name());
        return None;
    };
    let Some(material) = object.material.and_then(|id| resources.material(id)) else {
        log::trace!("Skipping '{}': no material", object.name);
        return None;
    };
    let Some(shader) = material.shader.and_then(|id| resources.shader(id)) else {
        log::trace!("Skipping '{}': material '{}' has no shader", object.name, material.name);
        return None;
    };
    let (true, Some(program)) = (shader.is_usable(), shader.program()) else {
        log::trace!("Skipping '{}': shader '{}' is not usable", object.name, shader.name());
        return None;
    };

    Some(Drawable { mesh, buffers, material, shader, program })
}

fn set_uniform(device: &mut dyn GraphicsDevice, location: Option<UniformLocation>, value: UniformValue) {
    if let Some(location) = location {
        device.set_uniform(location, value);
    }
}

fn count_value(count: usize) -> UniformValue {
    UniformValue::Int(i32::try_from(count).unwrap_or(i32::MAX))
}

fn vec3(vector: Vector3) -> UniformValue {
    UniformValue::Vec3(vector.to_array())
}

/// Write camera, light and global uniforms to every usable shader
#[allow(clippy::cast_precision_loss)]
fn bind_global_uniforms(context: &RenderContext<'_>, device: &mut dyn GraphicsDevice) {
    let projection = context.camera.projection_matrix().to_cols_array();
    let view = context.camera.view_matrix().to_cols_array();
    let lights = context.lights;

    for (_, shader) in context.resources.shaders() {
        let (true, Some(program)) = (shader.is_usable(), shader.program()) else {
            continue;
        };
        let uniforms: &BaseUniforms = shader.base_uniforms();
        device.use_program(Some(program));

        set_uniform(device, uniforms.projection, UniformValue::Mat4(projection));
        set_uniform(device, uniforms.view, UniformValue::Mat4(view));

        if let Some(ambient) = lights.ambient() {
            set_uniform(device, uniforms.ambient_colour, UniformValue::Vec4(ambient.colour.to_array()));
            set_uniform(device, uniforms.ambient_intensity, UniformValue::Float(ambient.intensity));
        } else {
            set_uniform(device, uniforms.ambient_intensity, UniformValue::Float(0.0));
        }

        let mut directional_count = 0;
        for (light, slots) in lights.directional_lights().zip(&uniforms.directional_lights) {
            set_uniform(device, slots.colour, UniformValue::Vec4(light.colour.to_array()));
            set_uniform(device, slots.intensity, UniformValue::Float(light.intensity));
            set_uniform(device, slots.direction, vec3(light.direction));
            directional_count += 1;
        }

        let mut point_count = 0;
        for (light, slots) in lights.point_lights().zip(&uniforms.point_lights) {
            set_uniform(device, slots.colour, UniformValue::Vec4(light.colour.to_array()));
            set_uniform(device, slots.intensity, UniformValue::Float(light.intensity));
            set_uniform(device, slots.position, vec3(light.position));
            set_uniform(device, slots.radius, UniformValue::Float(light.radius));
            set_uniform(device, slots.angle, UniformValue::Float(light.angle()));
            set_uniform(device, slots.shininess, UniformValue::Float(light.shininess));
            point_count += 1;
        }

        set_uniform(device, uniforms.directional_count, count_value(directional_count));
        set_uniform(device, uniforms.point_count, count_value(point_count));
        set_uniform(device, uniforms.time, UniformValue::Float(context.time_ms));
        set_uniform(
            device,
            uniforms.resolution,
            UniformValue::Vec2([shader.width() as f32, shader.height() as f32]),
        );
        set_uniform(device, uniforms.near_clip, UniformValue::Float(context.camera.near_clipping));
        set_uniform(device, uniforms.far_clip, UniformValue::Float(context.camera.far_clipping));
        set_uniform(device, uniforms.object_count, count_value(context.scene.len()));
    }

    device.use_program(None);
}

/// Bind one object's resources and issue its draw call
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn draw(
    drawable: &Drawable<'_>,
    model_view: &Matrix4,
    object_index: i32,
    resources: &Resources,
    device: &mut dyn GraphicsDevice,
    stats: &mut FrameStats,
) {
    let Drawable { mesh, buffers, material, shader, program } = *drawable;
    device.use_program(Some(program));

    // Only attributes the program declares and the mesh supplies
    let locations = shader.attributes();
    let attributes = [
        (locations.position, Some(buffers.position), mesh::POSITION_STRIDE),
        (locations.normal, buffers.normal, mesh::NORMAL_STRIDE),
        (locations.colour, buffers.colour, mesh::COLOUR_STRIDE),
        (locations.uv, buffers.uv, mesh::UV_STRIDE),
    ];
    let mut enabled: Vec<AttributeLocation> = Vec::with_capacity(attributes.len());
    for (location, buffer, stride) in attributes {
        if let (Some(location), Some(buffer)) = (location, buffer) {
            device.enable_attribute(location, buffer, stride as u32);
            enabled.push(location);
        }
    }
    device.bind_index_buffer(Some(buffers.index));

    let uniforms = shader.base_uniforms();
    let normal = Matrix3::from(*model_view).inverse().transposed();
    set_uniform(device, uniforms.model_view, UniformValue::Mat4(model_view.to_cols_array()));
    set_uniform(device, uniforms.normal, UniformValue::Mat3(normal.to_cols_array()));

    let block = &uniforms.material;
    set_uniform(device, block.ambient, UniformValue::Vec4(material.ambient.to_array()));
    set_uniform(device, block.diffuse, UniformValue::Vec4(material.diffuse.to_array()));
    set_uniform(device, block.specular, UniformValue::Vec4(material.specular.to_array()));
    set_uniform(device, block.shininess, UniformValue::Float(material.shininess));
    set_uniform(device, block.alpha, UniformValue::Float(material.alpha));

    let samplers = [block.image_sampler, block.bump_sampler, block.specular_sampler];
    for ((unit, texture), sampler) in material.texture_units().into_iter().zip(samplers) {
        let handle = texture.and_then(|id| resources.texture(id)).and_then(|texture| texture.handle());
        device.bind_texture(unit, handle);
        if handle.is_some() {
            set_uniform(device, sampler, UniformValue::Int(unit as i32));
        }
    }

    set_uniform(device, uniforms.object_id, UniformValue::Int(object_index));

    let transparent = material.is_transparent();
    if transparent {
        device.set_capability(Capability::Blend, true);
        device.set_capability(Capability::DepthTest, false);
    }

    device.draw_triangles(mesh.vertex_count());
    log::trace!("Drew '{}' with '{}' ({} indices)", mesh.name(), shader.name(), mesh.vertex_count());
    stats.draw_calls += 1;

    if transparent {
        device.set_capability(Capability::Blend, false);
        device.set_capability(Capability::DepthTest, true);
        stats.transparent_draws += 1;
    }

    for location in enabled {
        device.disable_attribute(location);
    }
    device.bind_index_buffer(None);
    device.use_program(None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::{DeviceCommand, RecordingDevice};
    use crate::render::mesh::Mesh;
    use crate::render::shader::ShaderSource;
    use crate::scene::Transform;

    const VERTEX: &str = "
        attribute vec3 A_Position;
        attribute vec3 A_Normal;
        uniform mat4 U_Matrix.ModelView;
        uniform mat3 U_Matrix.Normal;
        void main() {}
    ";
    const FRAGMENT: &str = "uniform float U_Material.Alpha; void main() {}";

    fn setup() -> (RecordingDevice, Resources, Scene, ObjectId) {
        let mut device = RecordingDevice::new();
        let mut resources = Resources::new();
        let shader = resources.add_shader(Shader::new("lit", ShaderSource::new(VERTEX, FRAGMENT)));
        let mesh = resources.add_mesh(Mesh::cube());
        let material = resources.add_material(Material::new("grey").with_shader(shader));
        assert!(resources.prepare(&mut device).is_empty());

        let mut scene = Scene::new();
        let id = scene.add(SceneObject::new("cube").with_mesh(mesh).with_material(material));
        device.take_commands();
        (device, resources, scene, id)
    }

    fn render(renderer: &mut Renderer, device: &mut RecordingDevice, resources: &Resources, scene: &Scene) -> FrameStats {
        let lights = LightRegistry::new();
        let camera = Camera::default();
        let context = RenderContext { scene, resources, lights: &lights, camera: &camera, time_ms: 0.0 };
        renderer.render(&context, device)
    }

    #[test]
    fn test_frame_ends_idle_with_one_draw() {
        let (mut device, resources, scene, _) = setup();
        let mut renderer = Renderer::default();

        let stats = render(&mut renderer, &mut device, &resources, &scene);
        assert_eq!(renderer.phase(), RenderPhase::Idle);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.objects_visited, 1);
        assert_eq!(device.draw_calls(), vec![36]);
        assert_eq!(renderer.last_stats(), stats);
    }

    #[test]
    fn test_only_declared_attributes_are_enabled() {
        let (mut device, resources, scene, _) = setup();
        render(&mut Renderer::default(), &mut device, &resources, &scene);

        let enabled = device
            .commands()
            .iter()
            .filter(|command| matches!(command, DeviceCommand::EnableAttribute { .. }))
            .count();
        let disabled = device
            .commands()
            .iter()
            .filter(|command| matches!(command, DeviceCommand::DisableAttribute { .. }))
            .count();
        // Position and normal; the cube also has colours and UVs
        assert_eq!(enabled, 2);
        assert_eq!(disabled, 2);
    }

    #[test]
    fn test_missing_material_is_skipped() {
        let (mut device, resources, mut scene, id) = setup();
        scene.object_mut(id).unwrap().material = None;

        let stats = render(&mut Renderer::default(), &mut device, &resources, &scene);
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_group_object_is_not_counted_as_skipped() {
        let (mut device, resources, mut scene, id) = setup();
        let group = scene.add(SceneObject::new("group").with_transform(Transform::from_position(Vector3::UNIT_X)));
        scene.add_child(group, id).unwrap();

        let stats = render(&mut Renderer::default(), &mut device, &resources, &scene);
        assert_eq!(stats.objects_visited, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.draw_calls, 1);
    }
}
