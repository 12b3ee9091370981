//! UV sphere renderer

use std::any::Any;
use std::f32::consts::PI;

use super::render_component::{draw_depth_only, draw_lit, FrameContext, Material, RenderContext, Renderable, TextureRef};
use super::{MeshData, RenderMesh, Vertex};
use crate::foundation::math::{Mat4, Vec3};
use crate::gpu::TextureHandle;
use crate::scene::{Component, DestroyContext, ReleaseQueue};

/// Default number of longitudinal slices
pub const SPHERE_SECTORS: u32 = 36;
/// Default number of latitudinal bands
pub const SPHERE_STACKS: u32 = 18;

/// Stack/sector sphere around the origin.
///
/// The first and last stacks are fans around the poles, so the index count
/// is `6 * sectors * (stacks - 1)`.
pub fn sphere_mesh(radius: f32, sectors: u32, stacks: u32) -> MeshData {
    let sectors = sectors.max(3);
    let stacks = stacks.max(2);
    let sector_step = 2.0 * PI / sectors as f32;
    let stack_step = PI / stacks as f32;

    let mut vertices = Vec::with_capacity(((stacks + 1) * (sectors + 1)) as usize);
    for i in 0..=stacks {
        let stack_angle = PI / 2.0 - i as f32 * stack_step;
        let xy = radius * stack_angle.cos();
        let z = radius * stack_angle.sin();

        for j in 0..=sectors {
            let sector_angle = j as f32 * sector_step;
            let position = [xy * sector_angle.cos(), xy * sector_angle.sin(), z];
            let normal = Vec3::from(position)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vec3::z);
            let uv = [j as f32 / sectors as f32, i as f32 / stacks as f32];
            vertices.push(Vertex::new(position, [normal.x, normal.y, normal.z], uv));
        }
    }

    let mut indices = Vec::with_capacity((6 * sectors * (stacks - 1)) as usize);
    for i in 0..stacks {
        let mut k1 = i * (sectors + 1);
        let mut k2 = k1 + sectors + 1;
        for _ in 0..sectors {
            if i != 0 {
                indices.extend_from_slice(&[k1, k2, k1 + 1]);
            }
            if i != stacks - 1 {
                indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
            }
            k1 += 1;
            k2 += 1;
        }
    }

    MeshData::new(vertices, indices)
}

/// Renders a unit sphere scaled by the owner's transform
#[derive(Debug)]
pub struct SphereRenderer {
    mesh: RenderMesh,
    material: Material,
    shader: String,
    casts_shadows: bool,
    receives_shadows: bool,
}

impl Default for SphereRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SphereRenderer {
    /// White lit sphere of radius 1 using the `sphere` shader
    pub fn new() -> Self {
        Self {
            mesh: RenderMesh::new(sphere_mesh(1.0, SPHERE_SECTORS, SPHERE_STACKS)),
            material: Material::default(),
            shader: "sphere".to_string(),
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

    /// Index count of the generated geometry
    pub fn index_count(&self) -> usize {
        self.mesh.data().indices.len()
    }
}

impl Renderable for SphereRenderer {
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

impl Component for SphereRenderer {
    fn on_destroy(&mut self, ctx: &mut DestroyContext<'_>) {
        self.mesh.release(ctx.release_queue());
    }

    fn label(&self) -> &str {
        "SphereRenderer"
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
