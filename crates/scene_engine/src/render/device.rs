//! Graphics device abstraction
//!
//! The renderer talks to the GPU exclusively through [`GraphicsDevice`]: it
//! creates buffers, textures and programs, looks up attribute and uniform
//! locations, and issues bind and draw calls against opaque handles. How the
//! handles map onto a real API is up to the implementation.
//!
//! [`RecordingDevice`] is a headless implementation that logs every call as a
//! [`DeviceCommand`]. It backs the demo host and the integration tests.

use std::collections::HashMap;

use crate::render::colour::Colour4;
use crate::render::{BackendResult, RenderError};

/// Handle to a device buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Handle to a device texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Location of a vertex attribute within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLocation(pub u32);

/// Location of a uniform within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// What a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data
    Vertex,
    /// Triangle indices
    Index,
}

/// Fixed-function state the renderer toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Alpha blending
    Blend,
    /// Depth testing
    DepthTest,
}

/// Value written to a uniform
///
/// Matrices are column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `int`, `bool` or sampler unit
    Int(i32),
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat3`
    Mat3([f32; 9]),
    /// `mat4`
    Mat4([f32; 16]),
}

/// Operations the engine needs from a graphics API
pub trait GraphicsDevice {
    /// Upload bytes into a new buffer
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Release a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Upload tightly packed RGBA8 pixels into a new 2D texture
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle>;

    /// Release a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Compile and link a vertex/fragment program
    ///
    /// On failure the error is the compiler or linker diagnostic.
    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<ProgramHandle, String>;

    /// Release a program
    fn delete_program(&mut self, program: ProgramHandle);

    /// Location of an active vertex attribute, `None` when the program does
    /// not use it
    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<AttributeLocation>;

    /// Location of an active uniform, `None` when the program does not use it
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Make a program current, or unbind with `None`
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Clear colour and depth of the current target
    fn clear(&mut self, colour: Colour4);

    /// Set the viewport size
    fn viewport(&mut self, width: u32, height: u32);

    /// Enable or disable a capability
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Feed an attribute from a float buffer with `components` floats per
    /// vertex
    fn enable_attribute(&mut self, location: AttributeLocation, buffer: BufferHandle, components: u32);

    /// Stop feeding an attribute
    fn disable_attribute(&mut self, location: AttributeLocation);

    /// Bind the index buffer for the next draw
    fn bind_index_buffer(&mut self, buffer: Option<BufferHandle>);

    /// Bind a texture to a texture unit, or clear the unit with `None`
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    /// Write a uniform of the current program
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Draw `index_count` indices as a triangle list
    fn draw_triangles(&mut self, index_count: u32);
}

/// A call recorded by [`RecordingDevice`]
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum DeviceCommand {
    CreateBuffer { buffer: BufferHandle, target: BufferTarget, bytes: usize },
    DeleteBuffer(BufferHandle),
    CreateTexture { texture: TextureHandle, width: u32, height: u32 },
    DeleteTexture(TextureHandle),
    CreateProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    Clear(Colour4),
    Viewport { width: u32, height: u32 },
    SetCapability { capability: Capability, enabled: bool },
    EnableAttribute { location: AttributeLocation, buffer: BufferHandle, components: u32 },
    DisableAttribute(AttributeLocation),
    BindIndexBuffer(Option<BufferHandle>),
    BindTexture { unit: u32, texture: Option<TextureHandle> },
    SetUniform { location: UniformLocation, value: UniformValue },
    DrawTriangles(u32),
}

#[derive(Debug, Clone, Default)]
struct ProgramInfo {
    attributes: Vec<String>,
    uniforms: Vec<String>,
    locations: HashMap<String, u32>,
}

impl ProgramInfo {
    fn location(&mut self, name: &str) -> u32 {
        let next = u32::try_from(self.locations.len()).unwrap_or(u32::MAX);
        *self.locations.entry(name.to_string()).or_insert(next)
    }

    fn name_of(&self, location: u32) -> Option<&str> {
        self.locations
            .iter()
            .find(|(_, value)| **value == location)
            .map(|(name, _)| name.as_str())
    }
}

/// Headless device that records every call
///
/// Programs "compile" when both sources contain a `main` function. Attribute
/// and uniform locations resolve for names declared in the sources; array and
/// struct members such as `u_point_lights[2].position` resolve when the base
/// uniform `u_point_lights` is declared.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    programs: HashMap<ProgramHandle, ProgramInfo>,
    current_program: Option<ProgramHandle>,
    live_buffers: usize,
    live_textures: usize,
    next_handle: u32,
    allocation_failure: bool,
}

impl RecordingDevice {
    /// Create an empty recording device
    pub fn new() -> Self {
        Self::default()
    }

    /// Make buffer and texture creation fail with a backend error
    ///
    /// Stands in for a device that has run out of memory or been lost.
    pub fn set_allocation_failure(&mut self, fail: bool) {
        self.allocation_failure = fail;
    }

    /// Every call recorded so far
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Take the recorded calls, leaving the log empty
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Index counts of every recorded draw
    pub fn draw_calls(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::DrawTriangles(count) => Some(*count),
                _ => None,
            })
            .collect()
    }

    /// Number of buffers created and not yet deleted
    pub fn live_buffers(&self) -> usize {
        self.live_buffers
    }

    /// Number of textures created and not yet deleted
    pub fn live_textures(&self) -> usize {
        self.live_textures
    }

    /// Number of programs created and not yet deleted
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Name a uniform location was handed out for
    pub fn uniform_name(&self, program: ProgramHandle, location: UniformLocation) -> Option<&str> {
        self.programs.get(&program)?.name_of(location.0)
    }

    /// Values written to a named uniform of `program`, in call order
    pub fn uniform_writes(&self, program: ProgramHandle, name: &str) -> Vec<UniformValue> {
        let Some(location) = self.programs.get(&program).and_then(|info| info.locations.get(name)) else {
            return Vec::new();
        };

        let mut current = None;
        let mut writes = Vec::new();
        for command in &self.commands {
            match command {
                DeviceCommand::UseProgram(used) => current = *used,
                DeviceCommand::SetUniform { location: written, value }
                    if current == Some(program) && written.0 == *location =>
                {
                    writes.push(*value);
                }
                _ => {}
            }
        }
        writes
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn record(&mut self, command: DeviceCommand) {
        log::trace!("{command:?}");
        self.commands.push(command);
    }
}

/// Names declared as `<keyword> <type> <name>;` in a shader source
///
/// Array suffixes are stripped, so `uniform vec3 u_points[8];` yields
/// `u_points`.
pub fn declared_names(source: &str, keyword: &str) -> Vec<String> {
    source
        .split(';')
        .filter_map(|statement| {
            let tokens: Vec<&str> = statement.split_whitespace().collect();
            let position = tokens.iter().position(|token| *token == keyword)?;
            let name = tokens.get(position + 2..)?.last()?;
            let name = name.split('[').next().unwrap_or(name);
            Some(name.to_string())
        })
        .collect()
}

fn base_name(name: &str) -> &str {
    name.split(['[', '.']).next().unwrap_or(name)
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BackendResult<BufferHandle> {
        if self.allocation_failure {
            return Err(RenderError::BackendError(format!("out of memory allocating {} byte buffer", data.len())));
        }
        let buffer = BufferHandle(self.allocate());
        self.live_buffers += 1;
        self.record(DeviceCommand::CreateBuffer { buffer, target, bytes: data.len() });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.live_buffers = self.live_buffers.saturating_sub(1);
        self.record(DeviceCommand::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RenderError::ResourceCreationFailed(format!(
                "texture {width}x{height} needs {expected} bytes, got {}",
                rgba.len()
            )));
        }

        if self.allocation_failure {
            return Err(RenderError::BackendError(format!("out of memory allocating {width}x{height} texture")));
        }
        let texture = TextureHandle(self.allocate());
        self.live_textures += 1;
        self.record(DeviceCommand::CreateTexture { texture, width, height });
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.live_textures = self.live_textures.saturating_sub(1);
        self.record(DeviceCommand::DeleteTexture(texture));
    }

    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<ProgramHandle, String> {
        let mut errors = Vec::new();
        if !vertex_source.contains("void main") {
            errors.push("Vertex Shader: missing entry point `main`");
        }
        if !fragment_source.contains("void main") {
            errors.push("Fragment Shader: missing entry point `main`");
        }
        if !errors.is_empty() {
            return Err(errors.join("\n"));
        }

        let mut attributes = declared_names(vertex_source, "attribute");
        attributes.extend(declared_names(vertex_source, "in"));
        let mut uniforms = declared_names(vertex_source, "uniform");
        uniforms.extend(declared_names(fragment_source, "uniform"));

        let program = ProgramHandle(self.allocate());
        self.programs.insert(program, ProgramInfo { attributes, uniforms, ..ProgramInfo::default() });
        self.record(DeviceCommand::CreateProgram(program));
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.record(DeviceCommand::DeleteProgram(program));
    }

    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<AttributeLocation> {
        let info = self.programs.get_mut(&program)?;
        if !info.attributes.iter().any(|declared| declared == name) {
            return None;
        }
        Some(AttributeLocation(info.location(name)))
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let info = self.programs.get_mut(&program)?;
        let base = base_name(name);
        if !info.uniforms.iter().any(|declared| declared == name || declared == base) {
            return None;
        }
        Some(UniformLocation(info.location(name)))
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current_program = program;
        self.record(DeviceCommand::UseProgram(program));
    }

    fn clear(&mut self, colour: Colour4) {
        self.record(DeviceCommand::Clear(colour));
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.record(DeviceCommand::Viewport { width, height });
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        self.record(DeviceCommand::SetCapability { capability, enabled });
    }

    fn enable_attribute(&mut self, location: AttributeLocation, buffer: BufferHandle, components: u32) {
        self.record(DeviceCommand::EnableAttribute { location, buffer, components });
    }

    fn disable_attribute(&mut self, location: AttributeLocation) {
        self.record(DeviceCommand::DisableAttribute(location));
    }

    fn bind_index_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.record(DeviceCommand::BindIndexBuffer(buffer));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.record(DeviceCommand::BindTexture { unit, texture });
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.record(DeviceCommand::SetUniform { location, value });
    }

    fn draw_triangles(&mut self, index_count: u32) {
        self.record(DeviceCommand::DrawTriangles(index_count));
    }
}
