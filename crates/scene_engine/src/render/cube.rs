//! Unit cube renderer

use std::any::Any;

use super::render_component::{draw_depth_only, draw_lit, FrameContext, Material, RenderContext, Renderable, TextureRef};
use super::{MeshData, RenderMesh, Vertex};
use crate::foundation::math::{Mat4, Vec3};
use crate::gpu::TextureHandle;
use crate::scene::{Component, DestroyContext, ReleaseQueue};

/// Cube spanning -0.5..0.5 on each axis: 6 faces, 36 unshared vertices with
/// per-face normals and UVs.
pub fn cube_mesh() -> MeshData {
    // (normal, u axis, v axis) per face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    // Two counter-clockwise triangles in (u, v) space
    let corners: [[f32; 2]; 6] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];

    let mut vertices = Vec::with_capacity(36);
    for (normal, u_axis, v_axis) in faces {
        let n = Vec3::from(normal);
        let u = Vec3::from(u_axis);
        let v = Vec3::from(v_axis);
        for [cu, cv] in corners {
            let p = n * 0.5 + u * (cu - 0.5) + v * (cv - 0.5);
            vertices.push(Vertex::new([p.x, p.y, p.z], normal, [cu, cv]));
        }
    }
    let indices = (0..36).collect();
    MeshData::new(vertices, indices)
}

/// Renders a cube scaled by the owner's transform
#[derive(Debug)]
pub struct CubeRenderer {
    mesh: RenderMesh,
    material: Material,
    shader: String,
    casts_shadows: bool,
    receives_shadows: bool,
}

impl Default for CubeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CubeRenderer {
    /// White lit cube using the `standard` shader
    pub fn new() -> Self {
        Self {
            mesh: RenderMesh::new(cube_mesh()),
            material: Material::default(),
            shader: "standard".to_string(),
            casts_shadows: true,
            receives_shadows: true,
        }
    }

    /// Set the base color
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.material.color = color;
        self
    }

    /// Use a texture handle
    pub fn with_texture(mut self, texture: TextureHandle) -> Self {
        self.material.texture = TextureRef::Handle(texture);
        self
    }

    /// Use a texture registered by name
    pub fn with_texture_name(mut self, name: impl Into<String>) -> Self {
        self.material.texture = TextureRef::Named(name.into());
        self
    }

    /// Use another material shader
    pub fn with_shader(mut self, shader: impl Into<String>) -> Self {
        self.shader = shader.into();
        self
    }

    /// Toggle shadow casting
    pub fn with_shadow_casting(mut self, enabled: bool) -> Self {
        self.casts_shadows = enabled;
        self
    }

    /// Toggle shadow map sampling in the main pass
    pub fn with_shadow_receiving(mut self, enabled: bool) -> Self {
        self.receives_shadows = enabled;
        self
    }

    /// Material shader name
    pub fn shader(&self) -> &str {
        &self.shader
    }
}

impl Renderable for CubeRenderer {
    fn render_raw_geometry(&mut self, ctx: &mut RenderContext<'_>, model: &Mat4, light_space: &Mat4) {
        draw_depth_only(ctx, std::slice::from_mut(&mut self.mesh), model, light_space);
    }

    fn render_with_materials(&mut self, ctx: &mut RenderContext<'_>, frame: &FrameContext<'_>, model: &Mat4) {
        draw_lit(
            ctx,
            &self.shader,
            std::slice::from_mut(&mut self.mesh),
            &mut self.material,
            frame,
            model,
            self.receives_shadows,
        );
    }

    fn casts_shadows(&self) -> bool {
        self.casts_shadows
    }

    fn receives_shadows(&self) -> bool {
        self.receives_shadows
    }

    fn material(&self) -> &Material {
        &self.material
    }

    fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    fn release(&mut self, queue: &mut ReleaseQueue) {
        self.mesh.release(queue);
    }
}

impl Component for CubeRenderer {
    fn on_destroy(&mut self, ctx: &mut DestroyContext<'_>) {
        self.mesh.release(ctx.release_queue());
    }

    fn label(&self) -> &str {
        "CubeRenderer"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }

    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }
}
