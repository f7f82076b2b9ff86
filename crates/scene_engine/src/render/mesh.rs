//! Mesh geometry
//!
//! Geometry arrives from asset importers as flat `f32` arrays with fixed
//! strides (position 3, normal 3, colour 4, uv 2) plus `u32` triangle
//! indices. [`Mesh::new`] validates the shape once; after that the arrays are
//! trusted. Uploading creates one device buffer per present array, cast to
//! bytes with `bytemuck`.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vector3;
use crate::render::device::{BufferHandle, BufferTarget, GraphicsDevice};
use crate::render::{BackendResult, RenderError};

/// Floats per position
pub const POSITION_STRIDE: usize = 3;
/// Floats per normal
pub const NORMAL_STRIDE: usize = 3;
/// Floats per colour
pub const COLOUR_STRIDE: usize = 4;
/// Floats per texture coordinate
pub const UV_STRIDE: usize = 2;

/// Raw mesh arrays as produced by an importer
///
/// Empty optional arrays mean the attribute is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshData {
    /// `x, y, z` per vertex
    pub positions: Vec<f32>,
    /// `x, y, z` per vertex
    pub normals: Vec<f32>,
    /// `r, g, b, a` per vertex
    pub colours: Vec<f32>,
    /// `u, v` per vertex
    pub uvs: Vec<f32>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
}

/// Device buffers of an uploaded mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    /// Position buffer
    pub position: BufferHandle,
    /// Normal buffer, when normals are present
    pub normal: Option<BufferHandle>,
    /// Colour buffer, when colours are present
    pub colour: Option<BufferHandle>,
    /// Texture coordinate buffer, when UVs are present
    pub uv: Option<BufferHandle>,
    /// Index buffer
    pub index: BufferHandle,
}

impl MeshBuffers {
    fn release(self, device: &mut dyn GraphicsDevice) {
        device.delete_buffer(self.position);
        for buffer in [self.normal, self.colour, self.uv].into_iter().flatten() {
            device.delete_buffer(buffer);
        }
        device.delete_buffer(self.index);
    }
}

/// Validated geometry plus its device buffers once uploaded
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    data: MeshData,
    buffers: Option<MeshBuffers>,
}

fn check_stride(name: &str, values: &[f32], stride: usize, vertices: usize, optional: bool) -> BackendResult<()> {
    if optional && values.is_empty() {
        return Ok(());
    }
    if values.len() % stride != 0 {
        return Err(RenderError::InvalidMeshData(format!(
            "{name} length {} is not a multiple of {stride}",
            values.len()
        )));
    }
    if values.len() / stride != vertices {
        return Err(RenderError::InvalidMeshData(format!(
            "{name} describe {} vertices, positions describe {vertices}",
            values.len() / stride
        )));
    }
    Ok(())
}

impl Mesh {
    /// Validate mesh arrays
    ///
    /// Fails with [`RenderError::InvalidMeshData`] when an array length is
    /// not a multiple of its stride, optional arrays disagree with the
    /// position count, the index count is not a multiple of three, or an
    /// index points past the last vertex.
    pub fn new(name: impl Into<String>, data: MeshData) -> BackendResult<Self> {
        let name = name.into();
        if data.positions.is_empty() {
            return Err(RenderError::InvalidMeshData(format!("mesh '{name}' has no positions")));
        }

        let vertices = data.positions.len() / POSITION_STRIDE;
        check_stride("positions", &data.positions, POSITION_STRIDE, vertices, false)?;
        check_stride("normals", &data.normals, NORMAL_STRIDE, vertices, true)?;
        check_stride("colours", &data.colours, COLOUR_STRIDE, vertices, true)?;
        check_stride("uvs", &data.uvs, UV_STRIDE, vertices, true)?;

        if data.indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMeshData(format!(
                "index count {} is not a multiple of 3",
                data.indices.len()
            )));
        }
        if let Some(index) = data.indices.iter().find(|index| **index as usize >= vertices) {
            return Err(RenderError::InvalidMeshData(format!(
                "index {index} out of range for {vertices} vertices"
            )));
        }

        log::debug!("Created mesh '{name}' with {vertices} vertices and {} indices", data.indices.len());
        Ok(Self { name, data, buffers: None })
    }

    /// Unit cube centred on the origin with normals, white colours and UVs
    pub fn cube() -> Self {
        const FACES: [([f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut data = MeshData::default();
        for (face, (normal, tangent)) in FACES.iter().enumerate() {
            let bitangent = Vector3::from(*normal).cross(Vector3::from(*tangent)).to_array();
            for (u, v) in CORNERS {
                for axis in 0..3 {
                    data.positions.push(0.5 * (normal[axis] + u * tangent[axis] + v * bitangent[axis]));
                }
                data.normals.extend_from_slice(normal);
                data.colours.extend_from_slice(&[1.0; 4]);
                data.uvs.extend_from_slice(&[(u + 1.0) / 2.0, (v + 1.0) / 2.0]);
            }

            #[allow(clippy::cast_possible_truncation)]
            let base = (face * CORNERS.len()) as u32;
            data.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { name: "cube".to_string(), data, buffers: None }
    }

    /// Mesh name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw arrays
    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Number of indices drawn per draw call
    #[allow(clippy::cast_possible_truncation)]
    pub fn vertex_count(&self) -> u32 {
        self.data.indices.len() as u32
    }

    /// Device buffers, if uploaded
    pub fn buffers(&self) -> Option<&MeshBuffers> {
        self.buffers.as_ref()
    }

    /// Whether the mesh has device buffers
    pub fn is_uploaded(&self) -> bool {
        self.buffers.is_some()
    }

    /// Create device buffers for every present array
    ///
    /// Uploading an already uploaded mesh does nothing. If any buffer fails
    /// to create, the ones already created are deleted again.
    pub fn upload(&mut self, device: &mut dyn GraphicsDevice) -> BackendResult<()> {
        if self.buffers.is_some() {
            return Ok(());
        }

        let mut created = Vec::new();
        let result = Self::create_buffers(&self.data, device, &mut created);
        match result {
            Ok(buffers) => {
                log::debug!("Uploaded mesh '{}' into {} buffers", self.name, created.len());
                self.buffers = Some(buffers);
                Ok(())
            }
            Err(error) => {
                for buffer in created {
                    device.delete_buffer(buffer);
                }
                Err(error)
            }
        }
    }

    fn create_buffers(
        data: &MeshData,
        device: &mut dyn GraphicsDevice,
        created: &mut Vec<BufferHandle>,
    ) -> BackendResult<MeshBuffers> {
        let mut vertex_buffer = |values: &[f32]| -> BackendResult<Option<BufferHandle>> {
            if values.is_empty() {
                return Ok(None);
            }
            let buffer = device.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(values))?;
            created.push(buffer);
            Ok(Some(buffer))
        };

        let position = vertex_buffer(&data.positions)?
            .ok_or_else(|| RenderError::InvalidMeshData("mesh has no positions".to_string()))?;
        let normal = vertex_buffer(&data.normals)?;
        let colour = vertex_buffer(&data.colours)?;
        let uv = vertex_buffer(&data.uvs)?;

        let index = device.create_buffer(BufferTarget::Index, bytemuck::cast_slice(data.indices.as_slice()))?;
        created.push(index);

        Ok(MeshBuffers { position, normal, colour, uv, index })
    }

    /// Delete the device buffers, if any
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(buffers) = self.buffers.take() {
            buffers.release(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::{DeviceCommand, RecordingDevice};

    fn triangle() -> MeshData {
        MeshData {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            uvs: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            ..MeshData::default()
        }
    }

    #[test]
    fn test_rejects_bad_stride() {
        let mut data = triangle();
        data.positions.pop();
        assert!(matches!(Mesh::new("bad", data), Err(RenderError::InvalidMeshData(_))));

        let mut data = triangle();
        data.colours = vec![1.0; 8];
        assert!(matches!(Mesh::new("bad", data), Err(RenderError::InvalidMeshData(_))));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let mut data = triangle();
        data.indices = vec![0, 1, 3];
        assert!(Mesh::new("bad", data).is_err());
    }

    #[test]
    fn test_upload_skips_absent_arrays() {
        let mut device = RecordingDevice::new();
        let mut mesh = Mesh::new("triangle", triangle()).unwrap();
        mesh.upload(&mut device).unwrap();

        let buffers = *mesh.buffers().unwrap();
        assert!(buffers.normal.is_none());
        assert!(buffers.uv.is_some());
        assert_eq!(device.live_buffers(), 3);
        assert!(device.commands().contains(&DeviceCommand::CreateBuffer {
            buffer: buffers.position,
            target: BufferTarget::Vertex,
            bytes: 36,
        }));

        mesh.upload(&mut device).unwrap();
        assert_eq!(device.live_buffers(), 3);

        mesh.release(&mut device);
        assert_eq!(device.live_buffers(), 0);
        assert!(!mesh.is_uploaded());
    }

    #[test]
    fn test_failed_upload_reports_backend_error() {
        let mut device = RecordingDevice::new();
        device.set_allocation_failure(true);
        let mut mesh = Mesh::new("triangle", triangle()).unwrap();

        assert!(matches!(mesh.upload(&mut device), Err(RenderError::BackendError(_))));
        assert!(!mesh.is_uploaded());
        assert_eq!(device.live_buffers(), 0);

        device.set_allocation_failure(false);
        mesh.upload(&mut device).unwrap();
        assert!(mesh.is_uploaded());
    }

    #[test]
    fn test_cube_shape() {
        let cube = Mesh::cube();
        assert_eq!(cube.data().positions.len(), 24 * POSITION_STRIDE);
        assert_eq!(cube.vertex_count(), 36);
        assert!(cube.data().positions.iter().all(|p| p.abs() == 0.5));
        assert!(Mesh::new("cube", cube.data().clone()).is_ok());
    }
}
