//! Cubemap skybox drawn behind the scene

use super::render_component::{RenderContext, DIFFUSE_UNIT};
use super::{MeshData, RenderMesh, Vertex};
use crate::foundation::math::{utils, Mat4};
use crate::gpu::{DepthFunc, TextureHandle};
use crate::scene::ReleaseQueue;

/// Program used for the skybox
pub const SKYBOX_SHADER: &str = "cubemap";

/// Inward-facing cube spanning -1..1, positions only
pub fn skybox_mesh() -> MeshData {
    const P: [[f32; 3]; 8] = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ];
    // Wound clockwise seen from outside so the inside faces survive culling
    const FACES: [[usize; 6]; 6] = [
        [0, 3, 2, 2, 1, 0],
        [4, 5, 6, 6, 7, 4],
        [0, 4, 7, 7, 3, 0],
        [1, 2, 6, 6, 5, 1],
        [3, 7, 6, 6, 2, 3],
        [0, 1, 5, 5, 4, 0],
    ];

    let vertices: Vec<Vertex> = FACES
        .iter()
        .flatten()
        .map(|&i| Vertex::new(P[i], [0.0; 3], [0.0; 2]))
        .collect();
    let indices = (0..vertices.len() as u32).collect();
    MeshData::new(vertices, indices)
}

/// Scene background.
///
/// Not an entity: the scene owns at most one and draws it between the shadow
/// and the main pass.
#[derive(Debug)]
pub struct Skybox {
    mesh: RenderMesh,
    cubemap: TextureHandle,
}

impl Skybox {
    /// Skybox sampling `cubemap`
    pub fn new(cubemap: TextureHandle) -> Self {
        Self {
            mesh: RenderMesh::new(skybox_mesh()),
            cubemap,
        }
    }

    /// Cubemap texture
    pub fn cubemap(&self) -> TextureHandle {
        self.cubemap
    }

    /// Draw with the view translation stripped and `LessEqual` depth test
    pub fn draw(&mut self, ctx: &mut RenderContext<'_>, view: &Mat4, projection: &Mat4) {
        let program = match ctx.shaders.get_or_build(ctx.device, SKYBOX_SHADER) {
            Ok(program) => program,
            Err(e) => {
                log::error!("Skybox skipped: {}", e);
                return;
            }
        };
        let Some(gpu) = self.mesh.ensure_uploaded(ctx.device) else {
            return;
        };

        let device = &mut *ctx.device;
        device.set_depth_func(DepthFunc::LessEqual);
        device.use_program(program);
        device.set_mat4("view", &utils::strip_translation(view));
        device.set_mat4("projection", projection);
        device.set_int("skybox", DIFFUSE_UNIT as i32);
        device.bind_texture(DIFFUSE_UNIT, self.cubemap);
        device.draw_indexed(&gpu);
        device.set_depth_func(DepthFunc::Less);
    }

    /// Hand the GPU buffers to the release queue
    pub fn release(&mut self, queue: &mut ReleaseQueue) {
        self.mesh.release(queue);
    }
}
