//! Renderer for meshes loaded from OBJ files

use std::any::Any;
use std::path::Path;

use super::render_component::{draw_depth_only, draw_lit, FrameContext, Material, RenderContext, Renderable, TextureRef};
use super::{MeshData, RenderMesh};
use crate::assets::{ObjError, ObjLoader};
use crate::foundation::math::{Mat4, Vec3};
use crate::gpu::TextureHandle;
use crate::scene::{Component, DestroyContext, ReleaseQueue};

/// Draws every mesh of a model with one material
#[derive(Debug)]
pub struct ModelRenderer {
    meshes: Vec<RenderMesh>,
    material: Material,
    shader: String,
    casts_shadows: bool,
    receives_shadows: bool,
}

impl ModelRenderer {
    /// Load the meshes of an OBJ file
    pub fn from_obj(path: impl AsRef<Path>) -> Result<Self, ObjError> {
        let path = path.as_ref();
        let meshes = ObjLoader::load_obj(path)?;
        log::info!("Loaded model {} ({} meshes)", path.display(), meshes.len());
        Ok(Self::from_meshes(meshes))
    }

    /// Wrap already loaded meshes. Invalid meshes are dropped.
    pub fn from_meshes(meshes: Vec<MeshData>) -> Self {
        let meshes = meshes
            .into_iter()
            .filter(|mesh| {
                let valid = mesh.is_valid();
                if !valid {
                    log::warn!("Dropping mesh with out-of-range or incomplete indices");
                }
                valid
            })
            .map(RenderMesh::new)
            .collect();
        Self {
            meshes,
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

    /// Number of meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}

impl Renderable for ModelRenderer {
    fn render_raw_geometry(&mut self, ctx: &mut RenderContext<'_>, model: &Mat4, light_space: &Mat4) {
        draw_depth_only(ctx, &mut self.meshes, model, light_space);
    }

    fn render_with_materials(&mut self, ctx: &mut RenderContext<'_>, frame: &FrameContext<'_>, model: &Mat4) {
        draw_lit(
            ctx,
            &self.shader,
            &mut self.meshes,
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
        for mesh in &mut self.meshes {
            mesh.release(queue);
        }
    }
}

impl Component for ModelRenderer {
    fn on_destroy(&mut self, ctx: &mut DestroyContext<'_>) {
        self.release(ctx.release_queue());
    }

    fn label(&self) -> &str {
        "ModelRenderer"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;
    use crate::render::{ShaderManager, TextureManager};

    const TWO_GROUPS: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
o first
f 1 2 3
o second
f 1 3 4
";

    #[test]
    fn test_model_draws_each_mesh_in_both_passes() {
        let meshes = ObjLoader::parse(TWO_GROUPS.as_bytes()).unwrap();
        let mut model = ModelRenderer::from_meshes(meshes);
        assert_eq!(model.mesh_count(), 2);

        let mut device = RecordingDevice::new();
        let mut shaders = ShaderManager::with_builtin_shaders();
        let textures = TextureManager::new();
        let mut ctx = RenderContext {
            device: &mut device,
            shaders: &mut shaders,
            textures: &textures,
        };
        model.render_raw_geometry(&mut ctx, &Mat4::identity(), &Mat4::identity());

        let mut queue = ReleaseQueue::default();
        model.release(&mut queue);
        queue.flush_gpu(&mut device);

        assert_eq!(device.draws().len(), 2);
        assert!(device.draws().iter().all(|d| d.program == "shadow_depth"));
        assert_eq!(device.live_meshes(), 0);
    }

    #[test]
    fn test_missing_model_file_is_an_error() {
        assert!(matches!(
            ModelRenderer::from_obj("no/such/model.obj"),
            Err(ObjError::Io(_))
        ));
    }
}
