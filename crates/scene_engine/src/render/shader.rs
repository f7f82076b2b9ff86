//! Shader programs
//!
//! A [`Shader`] owns a vertex/fragment source pair and, once built, the device
//! program plus every location the renderer needs:
//!
//! - the vertex attributes the program declares ([`AttributeMask`]); only
//!   these are ever enabled at draw time
//! - the engine's base uniforms (matrices, material, lights, globals), looked
//!   up once per build
//! - user uniforms discovered by scanning the sources for plain
//!   `uniform <type> <name>;` declarations
//!
//! A failed build leaves the shader without a program. Objects using it are
//! skipped until it is rebuilt successfully.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::render::colour::Colour4;
use crate::render::device::{AttributeLocation, GraphicsDevice, ProgramHandle, UniformLocation};
use crate::render::lighting::{MAX_DIRECTIONAL, MAX_POINT};
use crate::render::{BackendResult, RenderError};

/// Vertex attribute names
pub mod attribute {
    /// Vertex position, 3 floats (required)
    pub const POSITION: &str = "A_Position";
    /// Vertex normal, 3 floats
    pub const NORMAL: &str = "A_Normal";
    /// Vertex colour, 4 floats
    pub const COLOUR: &str = "A_Colour";
    /// Texture coordinate, 2 floats
    pub const UV: &str = "A_UV";
}

bitflags! {
    /// Vertex attributes a program declares
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttributeMask: u8 {
        /// `A_Position`
        const POSITION = 1 << 0;
        /// `A_Normal`
        const NORMAL = 1 << 1;
        /// `A_Colour`
        const COLOUR = 1 << 2;
        /// `A_UV`
        const UV = 1 << 3;
    }
}

/// Attribute locations of a built program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeLocations {
    /// `A_Position`
    pub position: Option<AttributeLocation>,
    /// `A_Normal`
    pub normal: Option<AttributeLocation>,
    /// `A_Colour`
    pub colour: Option<AttributeLocation>,
    /// `A_UV`
    pub uv: Option<AttributeLocation>,
}

impl AttributeLocations {
    fn resolve(device: &mut dyn GraphicsDevice, program: ProgramHandle) -> Self {
        Self {
            position: device.attribute_location(program, attribute::POSITION),
            normal: device.attribute_location(program, attribute::NORMAL),
            colour: device.attribute_location(program, attribute::COLOUR),
            uv: device.attribute_location(program, attribute::UV),
        }
    }

    /// Which attributes are present
    pub fn mask(&self) -> AttributeMask {
        let mut mask = AttributeMask::empty();
        mask.set(AttributeMask::POSITION, self.position.is_some());
        mask.set(AttributeMask::NORMAL, self.normal.is_some());
        mask.set(AttributeMask::COLOUR, self.colour.is_some());
        mask.set(AttributeMask::UV, self.uv.is_some());
        mask
    }
}

/// Material uniform locations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MaterialUniforms {
    pub ambient: Option<UniformLocation>,
    pub diffuse: Option<UniformLocation>,
    pub specular: Option<UniformLocation>,
    pub shininess: Option<UniformLocation>,
    pub alpha: Option<UniformLocation>,
    pub image_sampler: Option<UniformLocation>,
    pub bump_sampler: Option<UniformLocation>,
    pub specular_sampler: Option<UniformLocation>,
}

/// Uniform locations of one directional light array element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct DirectionalLightUniforms {
    pub colour: Option<UniformLocation>,
    pub intensity: Option<UniformLocation>,
    pub direction: Option<UniformLocation>,
}

/// Uniform locations of one point light array element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PointLightUniforms {
    pub colour: Option<UniformLocation>,
    pub intensity: Option<UniformLocation>,
    pub position: Option<UniformLocation>,
    pub radius: Option<UniformLocation>,
    pub angle: Option<UniformLocation>,
    pub shininess: Option<UniformLocation>,
}

/// Locations of every uniform the engine writes
///
/// A `None` location means the program does not use that uniform and the
/// write is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct BaseUniforms {
    pub projection: Option<UniformLocation>,
    pub view: Option<UniformLocation>,
    pub model_view: Option<UniformLocation>,
    pub normal: Option<UniformLocation>,
    pub material: MaterialUniforms,
    pub ambient_colour: Option<UniformLocation>,
    pub ambient_intensity: Option<UniformLocation>,
    pub directional_lights: [DirectionalLightUniforms; MAX_DIRECTIONAL],
    pub point_lights: [PointLightUniforms; MAX_POINT],
    pub directional_count: Option<UniformLocation>,
    pub point_count: Option<UniformLocation>,
    pub time: Option<UniformLocation>,
    pub resolution: Option<UniformLocation>,
    pub near_clip: Option<UniformLocation>,
    pub far_clip: Option<UniformLocation>,
    pub object_count: Option<UniformLocation>,
    pub object_id: Option<UniformLocation>,
}

/// Base uniform names as declared in engine shaders
pub mod uniform {
    /// Projection matrix
    pub const PROJECTION: &str = "U_Matrix.Projection";
    /// View (look-at) matrix
    pub const VIEW: &str = "U_Matrix.View";
    /// Model-view matrix
    pub const MODEL_VIEW: &str = "U_Matrix.ModelView";
    /// Normal matrix
    pub const NORMAL: &str = "U_Matrix.Normal";

    /// Material ambient colour
    pub const MATERIAL_AMBIENT: &str = "U_Material.AmbientColour";
    /// Material diffuse colour
    pub const MATERIAL_DIFFUSE: &str = "U_Material.DiffuseColour";
    /// Material specular colour
    pub const MATERIAL_SPECULAR: &str = "U_Material.SpecularColour";
    /// Material shininess
    pub const MATERIAL_SHININESS: &str = "U_Material.Shininess";
    /// Material alpha
    pub const MATERIAL_ALPHA: &str = "U_Material.Alpha";
    /// Image map sampler (texture unit 0)
    pub const IMAGE_SAMPLER: &str = "U_Sampler.Image";
    /// Bump map sampler (texture unit 1)
    pub const BUMP_SAMPLER: &str = "U_Sampler.Bump";
    /// Specular map sampler (texture unit 2)
    pub const SPECULAR_SAMPLER: &str = "U_Sampler.Specular";

    /// Ambient light colour
    pub const AMBIENT_COLOUR: &str = "U_Ambient.Colour";
    /// Ambient light intensity
    pub const AMBIENT_INTENSITY: &str = "U_Ambient.Intensity";
    /// Directional light array
    pub const DIRECTIONAL_LIGHTS: &str = "U_Directional";
    /// Point light array
    pub const POINT_LIGHTS: &str = "U_Point";

    /// Number of active directional lights
    pub const DIRECTIONAL_COUNT: &str = "U_Global.DirectionalCount";
    /// Number of active point lights
    pub const POINT_COUNT: &str = "U_Global.PointCount";
    /// Milliseconds since the engine started
    pub const TIME: &str = "U_Global.Time";
    /// Render target size
    pub const RESOLUTION: &str = "U_Global.Resolution";
    /// Near clipping distance
    pub const NEAR_CLIP: &str = "U_Global.NearClip";
    /// Far clipping distance
    pub const FAR_CLIP: &str = "U_Global.FarClip";
    /// Number of objects in the scene
    pub const OBJECT_COUNT: &str = "U_Global.ObjectCount";
    /// Index of the object being drawn
    pub const OBJECT_ID: &str = "U_Global.ObjectID";

    /// Name of a member of an element of a light array
    pub fn light_member(array: &str, index: usize, member: &str) -> String {
        format!("{array}[{index}].{member}")
    }
}

impl BaseUniforms {
    fn resolve(device: &mut dyn GraphicsDevice, program: ProgramHandle) -> Self {
        let mut lookup = |name: &str| device.uniform_location(program, name);

        let material = MaterialUniforms {
            ambient: lookup(uniform::MATERIAL_AMBIENT),
            diffuse: lookup(uniform::MATERIAL_DIFFUSE),
            specular: lookup(uniform::MATERIAL_SPECULAR),
            shininess: lookup(uniform::MATERIAL_SHININESS),
            alpha: lookup(uniform::MATERIAL_ALPHA),
            image_sampler: lookup(uniform::IMAGE_SAMPLER),
            bump_sampler: lookup(uniform::BUMP_SAMPLER),
            specular_sampler: lookup(uniform::SPECULAR_SAMPLER),
        };

        let directional_lights = std::array::from_fn(|i| {
            let member = |name: &str| uniform::light_member(uniform::DIRECTIONAL_LIGHTS, i, name);
            DirectionalLightUniforms {
                colour: lookup(&member("Colour")),
                intensity: lookup(&member("Intensity")),
                direction: lookup(&member("Direction")),
            }
        });

        let point_lights = std::array::from_fn(|i| {
            let member = |name: &str| uniform::light_member(uniform::POINT_LIGHTS, i, name);
            PointLightUniforms {
                colour: lookup(&member("Colour")),
                intensity: lookup(&member("Intensity")),
                position: lookup(&member("Position")),
                radius: lookup(&member("Radius")),
                angle: lookup(&member("Angle")),
                shininess: lookup(&member("Shininess")),
            }
        });

        Self {
            projection: lookup(uniform::PROJECTION),
            view: lookup(uniform::VIEW),
            model_view: lookup(uniform::MODEL_VIEW),
            normal: lookup(uniform::NORMAL),
            material,
            ambient_colour: lookup(uniform::AMBIENT_COLOUR),
            ambient_intensity: lookup(uniform::AMBIENT_INTENSITY),
            directional_lights,
            point_lights,
            directional_count: lookup(uniform::DIRECTIONAL_COUNT),
            point_count: lookup(uniform::POINT_COUNT),
            time: lookup(uniform::TIME),
            resolution: lookup(uniform::RESOLUTION),
            near_clip: lookup(uniform::NEAR_CLIP),
            far_clip: lookup(uniform::FAR_CLIP),
            object_count: lookup(uniform::OBJECT_COUNT),
            object_id: lookup(uniform::OBJECT_ID),
        }
    }
}

/// A uniform found by scanning the shader sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUniform {
    /// GLSL type as written (`float`, `vec3`, `mat4`, ...)
    pub glsl_type: String,
    /// Location in the built program
    pub location: Option<UniformLocation>,
}

fn is_plain_uniform_type(glsl_type: &str) -> bool {
    if matches!(glsl_type, "bool" | "int" | "float") {
        return true;
    }

    let Some(size) = glsl_type.chars().last().filter(|c| ('2'..='4').contains(c)) else {
        return false;
    };
    let stem = &glsl_type[..glsl_type.len() - size.len_utf8()];
    matches!(stem, "vec" | "bvec" | "ivec" | "uvec" | "mat")
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

/// Every `uniform <type> <name>;` declaration with a scalar, vector or matrix
/// type, in source order with duplicates removed
///
/// Struct and array uniforms are not reported.
pub fn parse_user_uniforms(sources: &[&str]) -> Vec<(String, String)> {
    let mut found: Vec<(String, String)> = Vec::new();
    for source in sources {
        for statement in source.split(';') {
            let tokens: Vec<&str> = statement.split_whitespace().collect();
            let Some(start) = tokens.iter().position(|token| *token == "uniform") else {
                continue;
            };
            let declaration: Vec<&str> = tokens[start + 1..]
                .iter()
                .copied()
                .filter(|token| !PRECISION_QUALIFIERS.contains(token))
                .collect();
            let &[glsl_type, name] = declaration.as_slice() else {
                continue;
            };

            if is_plain_uniform_type(glsl_type)
                && is_identifier(name)
                && !found.iter().any(|(existing, _)| existing == name)
            {
                found.push((name.to_string(), glsl_type.to_string()));
            }
        }
    }
    found
}

/// Vertex and fragment source pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Vertex stage source
    pub vertex: String,
    /// Fragment stage source
    pub fragment: String,
}

impl ShaderSource {
    /// Create a source pair
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self { vertex: vertex.into(), fragment: fragment.into() }
    }
}

/// A shader program and its resolved locations
#[derive(Debug, Clone)]
pub struct Shader {
    name: String,
    source: ShaderSource,
    width: u32,
    height: u32,
    clear_colour: Colour4,
    program: Option<ProgramHandle>,
    attributes: AttributeLocations,
    base_uniforms: BaseUniforms,
    user_uniforms: BTreeMap<String, UserUniform>,
}

impl Shader {
    /// Create an unbuilt shader with a 1920x1080 target cleared to black
    pub fn new(name: impl Into<String>, source: ShaderSource) -> Self {
        Self {
            name: name.into(),
            source,
            width: 1920,
            height: 1080,
            clear_colour: Colour4::BLACK,
            program: None,
            attributes: AttributeLocations::default(),
            base_uniforms: BaseUniforms::default(),
            user_uniforms: BTreeMap::new(),
        }
    }

    /// Set the render target size
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the clear colour
    #[must_use]
    pub fn with_clear_colour(mut self, colour: Colour4) -> Self {
        self.clear_colour = colour;
        self
    }

    /// Compile and link the program and resolve every location
    ///
    /// Any previous program is deleted first. On failure the shader is left
    /// without a program and the diagnostic is returned (and logged).
    pub fn build(&mut self, device: &mut dyn GraphicsDevice) -> BackendResult<()> {
        self.release(device);

        let program = match device.create_program(&self.source.vertex, &self.source.fragment) {
            Ok(program) => program,
            Err(diagnostic) => {
                log::error!("Shader '{}' failed to build: {diagnostic}", self.name);
                return Err(RenderError::ShaderBuild(format!("{}: {diagnostic}", self.name)));
            }
        };

        self.attributes = AttributeLocations::resolve(device, program);
        if self.attributes.position.is_none() {
            log::warn!("Shader '{}' does not declare {}; nothing will draw with it", self.name, attribute::POSITION);
        }
        self.base_uniforms = BaseUniforms::resolve(device, program);
        self.user_uniforms = parse_user_uniforms(&[&self.source.vertex, &self.source.fragment])
            .into_iter()
            .map(|(name, glsl_type)| {
                let location = device.uniform_location(program, &name);
                (name, UserUniform { glsl_type, location })
            })
            .collect();
        self.program = Some(program);

        log::info!(
            "Built shader '{}' (attributes {:?}, {} user uniforms)",
            self.name,
            self.attributes.mask(),
            self.user_uniforms.len()
        );
        Ok(())
    }

    /// Replace the sources and rebuild
    pub fn set_source(&mut self, device: &mut dyn GraphicsDevice, source: ShaderSource) -> BackendResult<()> {
        self.source = source;
        self.build(device)
    }

    /// Delete the program, if any
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(program) = self.program.take() {
            device.delete_program(program);
            self.attributes = AttributeLocations::default();
            self.base_uniforms = BaseUniforms::default();
            self.user_uniforms.clear();
        }
    }

    /// Whether the shader has a program that declares a position attribute
    pub fn is_usable(&self) -> bool {
        self.program.is_some() && self.attributes.position.is_some()
    }

    /// Shader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source pair
    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    /// Device program, if built
    pub fn program(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Render target width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Render target height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Colour the target is cleared to
    pub fn clear_colour(&self) -> Colour4 {
        self.clear_colour
    }

    /// Attributes the program declares
    pub fn attribute_mask(&self) -> AttributeMask {
        self.attributes.mask()
    }

    /// Attribute locations
    pub fn attributes(&self) -> &AttributeLocations {
        &self.attributes
    }

    /// Base uniform locations
    pub fn base_uniforms(&self) -> &BaseUniforms {
        &self.base_uniforms
    }

    /// A discovered user uniform
    pub fn user_uniform(&self, name: &str) -> Option<&UserUniform> {
        self.user_uniforms.get(name)
    }

    /// All discovered user uniforms, by name
    pub fn user_uniforms(&self) -> impl Iterator<Item = (&str, &UserUniform)> {
        self.user_uniforms.iter().map(|(name, uniform)| (name.as_str(), uniform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::{DeviceCommand, RecordingDevice};

    const VERTEX: &str = "
        attribute vec3 A_Position;
        attribute vec3 A_Normal;
        uniform Matrix U_Matrix;
        uniform float u_wobble;
        uniform ivec2 u_grid;
        uniform PointLight U_Point[8];
        void main() { gl_Position = vec4(A_Position, 1.0); }
    ";
    const FRAGMENT: &str = "
        uniform Material U_Material;
        uniform float u_wobble;
        uniform mat3 u_tint;
        uniform sampler2D u_image;
        void main() {}
    ";

    #[test]
    fn test_parse_user_uniforms() {
        let uniforms = parse_user_uniforms(&[VERTEX, FRAGMENT]);
        let names: Vec<&str> = uniforms.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["u_wobble", "u_grid", "u_tint"]);
        assert_eq!(uniforms[1].1, "ivec2");
    }

    #[test]
    fn test_parse_user_uniforms_with_precision() {
        let source = "uniform highp float u_fade;\nuniform lowp vec4 u_tint;\nuniform mediump int u_steps;";
        let uniforms = parse_user_uniforms(&[source]);
        assert_eq!(
            uniforms,
            vec![
                ("u_fade".to_string(), "float".to_string()),
                ("u_tint".to_string(), "vec4".to_string()),
                ("u_steps".to_string(), "int".to_string()),
            ]
        );
    }

    #[test]
    fn test_plain_uniform_types() {
        for ty in ["bool", "int", "float", "vec2", "bvec3", "ivec4", "uvec2", "mat3"] {
            assert!(is_plain_uniform_type(ty), "{ty}");
        }
        for ty in ["vec5", "sampler2D", "mat", "dvec2"] {
            assert!(!is_plain_uniform_type(ty), "{ty}");
        }
    }

    #[test]
    fn test_build_resolves_declared_attributes_only() {
        let mut device = RecordingDevice::new();
        let mut shader = Shader::new("lit", ShaderSource::new(VERTEX, FRAGMENT));
        shader.build(&mut device).unwrap();

        assert!(shader.is_usable());
        assert_eq!(shader.attribute_mask(), AttributeMask::POSITION | AttributeMask::NORMAL);
        assert!(shader.base_uniforms().model_view.is_some());
        assert!(shader.base_uniforms().point_lights[7].radius.is_some());
        assert!(shader.base_uniforms().directional_lights[0].colour.is_none());
        assert!(shader.user_uniform("u_wobble").unwrap().location.is_some());
    }

    #[test]
    fn test_rebuild_deletes_previous_program() {
        let mut device = RecordingDevice::new();
        let mut shader = Shader::new("lit", ShaderSource::new(VERTEX, FRAGMENT));
        shader.build(&mut device).unwrap();
        let first = shader.program().unwrap();

        shader.set_source(&mut device, ShaderSource::new(VERTEX, FRAGMENT)).unwrap();
        assert!(device.commands().contains(&DeviceCommand::DeleteProgram(first)));
        assert_ne!(shader.program(), Some(first));
        assert_eq!(device.live_programs(), 1);
    }

    #[test]
    fn test_failed_build_leaves_shader_unusable() {
        let mut device = RecordingDevice::new();
        let mut shader = Shader::new("broken", ShaderSource::new("attribute vec3 A_Position;", FRAGMENT));
        let error = shader.build(&mut device).unwrap_err();

        assert!(matches!(error, RenderError::ShaderBuild(ref message) if message.starts_with("broken")));
        assert!(!shader.is_usable());
        assert_eq!(shader.program(), None);
    }
}
