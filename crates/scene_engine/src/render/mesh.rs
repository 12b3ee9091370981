//! Mesh representation for 3D models
//!
//! [`MeshData`] is plain CPU-side geometry. [`RenderMesh`] pairs it with the
//! GPU buffers, which are uploaded on first draw.

use bytemuck::{Pod, Zeroable};

use crate::gpu::{GpuMesh, GraphicsDevice};
use crate::scene::ReleaseQueue;

/// 3D vertex data structure for rendering
///
/// Interleaved position, normal and texture coordinate: 8 floats, 32 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Indexed triangle list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex data
    pub vertices: Vec<Vertex>,

    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create a new mesh
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Whether every index refers to an existing vertex
    pub fn is_valid(&self) -> bool {
        !self.indices.is_empty()
            && self.indices.len() % 3 == 0
            && self
                .indices
                .iter()
                .all(|&i| (i as usize) < self.vertices.len())
    }

    /// Raw vertex bytes, as uploaded to a vertex buffer
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Geometry with lazily created GPU buffers
#[derive(Debug, Clone)]
pub struct RenderMesh {
    data: MeshData,
    gpu: Option<GpuMesh>,
    upload_failed: bool,
}

impl RenderMesh {
    /// Wrap CPU geometry. Nothing is uploaded yet.
    pub fn new(data: MeshData) -> Self {
        Self {
            data,
            gpu: None,
            upload_failed: false,
        }
    }

    /// CPU-side geometry
    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Uploaded buffers, if any
    pub fn gpu_mesh(&self) -> Option<GpuMesh> {
        self.gpu
    }

    /// Upload on first use and return the GPU mesh.
    ///
    /// A failed upload is logged once and the mesh stops drawing.
    pub fn ensure_uploaded(&mut self, device: &mut dyn GraphicsDevice) -> Option<GpuMesh> {
        if self.gpu.is_none() && !self.upload_failed {
            match device.create_mesh(&self.data.vertices, &self.data.indices) {
                Ok(mesh) => {
                    log::debug!(
                        "Uploaded mesh: {} vertices, {} indices",
                        self.data.vertices.len(),
                        mesh.index_count
                    );
                    self.gpu = Some(mesh);
                }
                Err(e) => {
                    log::error!("Mesh upload failed: {}", e);
                    self.upload_failed = true;
                }
            }
        }
        self.gpu
    }

    /// Hand the GPU buffers to the release queue
    pub fn release(&mut self, queue: &mut ReleaseQueue) {
        if let Some(mesh) = self.gpu.take() {
            queue.push_mesh(mesh.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    #[test]
    fn test_vertex_layout_is_eight_floats() {
        assert_eq!(std::mem::size_of::<Vertex>(), 8 * std::mem::size_of::<f32>());

        let mesh = MeshData::new(vec![Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.25])], vec![]);
        let floats: &[f32] = bytemuck::cast_slice(mesh.vertex_bytes());
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.5, 0.25]);
    }

    #[test]
    fn test_upload_happens_once_and_release_queues_handle() {
        let mut device = RecordingDevice::new();
        let mut mesh = RenderMesh::new(MeshData::new(vec![Vertex::default(); 3], vec![0, 1, 2]));
        assert!(mesh.gpu_mesh().is_none());

        let first = mesh.ensure_uploaded(&mut device).unwrap();
        let second = mesh.ensure_uploaded(&mut device).unwrap();
        assert_eq!(first, second);
        assert_eq!(device.live_meshes(), 1);

        let mut queue = ReleaseQueue::default();
        mesh.release(&mut queue);
        mesh.release(&mut queue);
        queue.flush_gpu(&mut device);
        assert_eq!(device.live_meshes(), 0);
    }

    #[test]
    fn test_index_validation() {
        let mesh = MeshData::new(vec![Vertex::default(); 3], vec![0, 1, 3]);
        assert!(!mesh.is_valid());
    }
}
