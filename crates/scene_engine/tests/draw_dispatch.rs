//! Integration tests for whole frames rendered against a recording device.

use approx::assert_relative_eq;
use scene_engine::prelude::*;
use scene_engine::render::device::{Capability, DeviceCommand, UniformValue};
use scene_engine::render::{MaterialId, MeshId, ShaderId};

const LIT_VERTEX: &str = "
    attribute vec3 A_Position;
    attribute vec3 A_Normal;
    uniform mat4 U_Matrix.Projection;
    uniform mat4 U_Matrix.ModelView;
    uniform mat3 U_Matrix.Normal;
    void main() {}
";

const LIT_FRAGMENT: &str = "
    uniform vec4 U_Material.DiffuseColour;
    uniform float U_Material.Alpha;
    uniform sampler2D U_Sampler.Image;
    uniform vec4 U_Ambient.Colour;
    uniform float U_Ambient.Intensity;
    uniform PointLight U_Point[8];
    uniform int U_Global.PointCount;
    uniform int U_Global.ObjectID;
    void main() {}
";

struct Fixture {
    engine: Engine,
    device: RecordingDevice,
    shader: ShaderId,
    cube: MeshId,
}

impl Fixture {
    fn new() -> Self {
        let mut engine = Engine::new(ApplicationConfig::default()).unwrap();
        let shader = engine
            .resources
            .add_shader(Shader::new("lit", ShaderSource::new(LIT_VERTEX, LIT_FRAGMENT)));
        let cube = engine.resources.add_mesh(Mesh::cube());
        Self { engine, device: RecordingDevice::new(), shader, cube }
    }

    fn material(&mut self, alpha: f32) -> MaterialId {
        self.engine
            .resources
            .add_material(Material::new("m").with_shader(self.shader).with_alpha(alpha))
    }

    fn mesh_with_indices(&mut self, triangles: u32) -> MeshId {
        let vertices = triangles * 3;
        let data = MeshData {
            positions: vec![0.0; vertices as usize * 3],
            indices: (0..vertices).collect(),
            ..MeshData::default()
        };
        self.engine.resources.add_mesh(Mesh::new("strip", data).unwrap())
    }

    fn object_at(&mut self, name: &str, mesh: MeshId, material: MaterialId, z: f32) -> ObjectId {
        self.engine.scene.add(
            SceneObject::new(name)
                .with_mesh(mesh)
                .with_material(material)
                .with_transform(Transform::from_position(Vector3::new(0.0, 0.0, z))),
        )
    }

    fn render(&mut self) -> FrameStats {
        assert!(self.engine.prepare(&mut self.device).is_empty());
        self.device.take_commands();
        self.engine.render_frame(&mut self.device)
    }

    fn program(&self) -> scene_engine::render::device::ProgramHandle {
        self.engine.resources.shader(self.shader).unwrap().program().unwrap()
    }
}

#[test]
fn test_only_declared_attributes_are_bound() {
    let mut fixture = Fixture::new();
    let material = fixture.material(1.0);
    let cube = fixture.cube;
    fixture.object_at("cube", cube, material, 0.0);

    let stats = fixture.render();
    assert_eq!(stats.draw_calls, 1);

    let components: Vec<u32> = fixture
        .device
        .commands()
        .iter()
        .filter_map(|command| match command {
            DeviceCommand::EnableAttribute { components, .. } => Some(*components),
            _ => None,
        })
        .collect();
    assert_eq!(components, vec![3, 3]);
    assert_eq!(fixture.device.draw_calls(), vec![36]);
}

#[test]
fn test_global_light_uniforms() {
    let mut fixture = Fixture::new();
    let material = fixture.material(1.0);
    let cube = fixture.cube;
    fixture.object_at("cube", cube, material, 0.0);
    fixture.engine.lights.add(AmbientLight::new(Colour4::WHITE, 0.2)).unwrap();
    fixture.engine.lights.add(PointLight::default()).unwrap();
    fixture
        .engine
        .lights
        .add(PointLight::new(Colour4::WHITE, 1.0, Vector3::ONE).with_radius(12.0))
        .unwrap();

    fixture.render();
    let program = fixture.program();
    assert_eq!(fixture.device.uniform_writes(program, "U_Global.PointCount"), vec![UniformValue::Int(2)]);
    assert_eq!(fixture.device.uniform_writes(program, "U_Point[1].Radius"), vec![UniformValue::Float(12.0)]);
    assert_eq!(fixture.device.uniform_writes(program, "U_Ambient.Intensity"), vec![UniformValue::Float(0.2)]);
    assert_eq!(fixture.device.uniform_writes(program, "U_Global.ObjectID"), vec![UniformValue::Int(0)]);
    assert_eq!(fixture.device.uniform_writes(program, "U_Matrix.Projection").len(), 1);
}

#[test]
fn test_normal_matrix_handles_non_uniform_scale() {
    let mut fixture = Fixture::new();
    let material = fixture.material(1.0);
    let cube = fixture.cube;
    fixture.engine.scene.add(
        SceneObject::new("stretched")
            .with_mesh(cube)
            .with_material(material)
            .with_transform(Transform::new().with_scale(Vector3::new(2.0, 1.0, 1.0))),
    );

    fixture.render();
    let program = fixture.program();
    assert_eq!(
        fixture.device.uniform_writes(program, "U_Matrix.Normal"),
        vec![UniformValue::Mat3([0.5, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])]
    );
}

#[test]
fn test_normal_matrix_of_scaled_down_object() {
    let mut fixture = Fixture::new();
    let material = fixture.material(1.0);
    let cube = fixture.cube;
    fixture.engine.scene.add(
        SceneObject::new("pebble")
            .with_mesh(cube)
            .with_material(material)
            .with_transform(Transform::new().with_scale(Vector3::splat(0.01))),
    );

    fixture.render();
    let program = fixture.program();
    let writes = fixture.device.uniform_writes(program, "U_Matrix.Normal");
    let [UniformValue::Mat3(normal)] = writes.as_slice() else {
        panic!("expected one normal matrix write, got {writes:?}");
    };
    let expected = [100.0, 0.0, 0.0, 0.0, 100.0, 0.0, 0.0, 0.0, 100.0];
    for (value, expected) in normal.iter().zip(expected) {
        assert_relative_eq!(*value, expected, epsilon = 1e-2);
    }
}

#[test]
fn test_transparent_draw_toggles_blend_and_depth() {
    let mut fixture = Fixture::new();
    let material = fixture.material(0.5);
    let cube = fixture.cube;
    fixture.object_at("glass", cube, material, 0.0);

    let stats = fixture.render();
    assert_eq!(stats.transparent_draws, 1);

    let commands = fixture.device.commands();
    let draw = commands
        .iter()
        .position(|command| matches!(command, DeviceCommand::DrawTriangles(_)))
        .unwrap();
    assert_eq!(
        commands[draw - 2..draw],
        [
            DeviceCommand::SetCapability { capability: Capability::Blend, enabled: true },
            DeviceCommand::SetCapability { capability: Capability::DepthTest, enabled: false },
        ]
    );
    assert_eq!(
        commands[draw + 1..draw + 3],
        [
            DeviceCommand::SetCapability { capability: Capability::Blend, enabled: false },
            DeviceCommand::SetCapability { capability: Capability::DepthTest, enabled: true },
        ]
    );
}

#[test]
fn test_transparent_objects_draw_back_to_front_after_opaque() {
    let mut fixture = Fixture::new();
    let opaque = fixture.material(1.0);
    let glass = fixture.material(0.5);
    let near = fixture.mesh_with_indices(1);
    let far = fixture.mesh_with_indices(2);
    let cube = fixture.cube;

    fixture.object_at("near", near, glass, 0.0);
    fixture.object_at("solid", cube, opaque, 0.0);
    fixture.object_at("far", far, glass, -5.0);

    fixture.render();
    assert_eq!(fixture.device.draw_calls(), vec![36, 6, 3]);

    fixture.engine.renderer_mut().set_transparent_sorting(false);
    fixture.render();
    assert_eq!(fixture.device.draw_calls(), vec![3, 36, 6]);
}

#[test]
fn test_children_draw_before_parent() {
    let mut fixture = Fixture::new();
    let material = fixture.material(1.0);
    let parent_mesh = fixture.mesh_with_indices(2);
    let child_mesh = fixture.mesh_with_indices(1);

    let parent = fixture.object_at("parent", parent_mesh, material, 0.0);
    fixture
        .engine
        .scene
        .add_under(parent, SceneObject::new("child").with_mesh(child_mesh).with_material(material))
        .unwrap();

    let stats = fixture.render();
    assert_eq!(stats.objects_visited, 2);
    assert_eq!(fixture.device.draw_calls(), vec![3, 6]);
}

#[test]
fn test_broken_shader_does_not_stop_the_frame() {
    let mut fixture = Fixture::new();
    let broken = fixture
        .engine
        .resources
        .add_shader(Shader::new("broken", ShaderSource::new("attribute vec3 A_Position;", "void main() {}")));
    let good = fixture.material(1.0);
    let bad = fixture
        .engine
        .resources
        .add_material(Material::new("bad").with_shader(broken));
    let cube = fixture.cube;
    fixture.object_at("good", cube, good, 0.0);
    fixture.object_at("bad", cube, bad, 0.0);

    let errors = fixture.engine.prepare(&mut fixture.device);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], scene_engine::render::RenderError::ShaderBuild(_)));

    fixture.device.take_commands();
    let stats = fixture.engine.render_frame(&mut fixture.device);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.skipped, 1);
}

#[test]
fn test_texture_units_are_bound_or_cleared() {
    let mut fixture = Fixture::new();
    let texture = fixture.engine.resources.add_texture(Texture::solid(Colour4::WHITE));
    let material = fixture.engine.resources.add_material(
        Material::new("textured")
            .with_shader(fixture.shader)
            .with_image_map(texture),
    );
    let cube = fixture.cube;
    fixture.object_at("crate", cube, material, 0.0);

    fixture.render();
    let bound: Vec<(u32, bool)> = fixture
        .device
        .commands()
        .iter()
        .filter_map(|command| match command {
            DeviceCommand::BindTexture { unit, texture } => Some((*unit, texture.is_some())),
            _ => None,
        })
        .collect();
    assert_eq!(bound, vec![(0, true), (1, false), (2, false)]);

    let program = fixture.program();
    assert_eq!(fixture.device.uniform_writes(program, "U_Sampler.Image"), vec![UniformValue::Int(0)]);
}

#[test]
fn test_removed_mesh_skips_object() {
    let mut fixture = Fixture::new();
    let material = fixture.material(1.0);
    let cube = fixture.cube;
    fixture.object_at("cube", cube, material, 0.0);
    fixture.engine.prepare(&mut fixture.device);
    fixture.engine.resources.remove_mesh(cube, &mut fixture.device);

    let stats = fixture.engine.render_frame(&mut fixture.device);
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.skipped, 1);
}
