//! Two-phase draw contract shared by every renderable component
//!
//! The shadow pass calls [`Renderable::render_raw_geometry`] on casters with
//! the depth shader. The main pass calls
//! [`Renderable::render_with_materials`], which binds the variant's material
//! shader, the lights and, for receivers, the shadow map.

use crate::foundation::math::{Mat4, Vec3};
use crate::gpu::{GraphicsDevice, TextureHandle};
use crate::lighting::{Light, SHADOW_MAP_UNIT};
use crate::render::{RenderMesh, ShaderManager, TextureManager};
use crate::scene::ReleaseQueue;

/// Upper bound of the `lights` uniform array
pub const MAX_SHADER_LIGHTS: usize = 128;

/// Program used by the shadow pass
pub const DEPTH_SHADER: &str = "shadow_depth";

/// Texture unit of the diffuse texture
pub const DIFFUSE_UNIT: u32 = 0;

/// GPU services a draw call needs
pub struct RenderContext<'a> {
    /// Device receiving the commands
    pub device: &'a mut dyn GraphicsDevice,
    /// Program cache
    pub shaders: &'a mut ShaderManager,
    /// Texture registry for textures referenced by name
    pub textures: &'a TextureManager,
}

/// Per-frame data of the main pass
#[derive(Debug, Clone)]
pub struct FrameContext<'a> {
    /// World-to-view
    pub view: Mat4,
    /// View-to-clip
    pub projection: Mat4,
    /// Eye position
    pub camera_position: Vec3,
    /// Lights selected for this frame
    pub lights: &'a [&'a Light],
    /// Position of the shadow-casting light
    pub primary_light: Option<Vec3>,
    /// Matrix of the most recent shadow pass
    pub light_space_matrix: Mat4,
    /// Depth texture of the most recent shadow pass
    pub shadow_map: Option<TextureHandle>,
}

/// Texture reference of a material
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TextureRef {
    /// Untextured
    #[default]
    None,
    /// Texture handle
    Handle(TextureHandle),
    /// Name resolved through the [`TextureManager`] at draw time
    Named(String),
}

/// Surface appearance
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Base color, used when untextured
    pub color: Vec3,
    /// Diffuse texture
    pub texture: TextureRef,
    /// Unlit objects output their base color
    pub use_lighting: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 1.0, 1.0),
            texture: TextureRef::None,
            use_lighting: true,
        }
    }
}

impl Material {
    /// Flat colored material
    pub fn colored(color: Vec3) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Resolve the texture for this draw.
    ///
    /// A name that is not registered is logged once and dropped, so the
    /// object keeps rendering untextured.
    pub fn resolve_texture(&mut self, textures: &TextureManager) -> Option<TextureHandle> {
        match &self.texture {
            TextureRef::None => None,
            TextureRef::Handle(handle) => Some(*handle),
            TextureRef::Named(name) => match textures.get(name) {
                Some(handle) => Some(handle),
                None => {
                    log::warn!("Texture '{}' not found, rendering untextured", name);
                    self.texture = TextureRef::None;
                    None
                }
            },
        }
    }
}

/// Render capability of a component
pub trait Renderable {
    /// Depth-only draw for the shadow pass
    fn render_raw_geometry(&mut self, ctx: &mut RenderContext<'_>, model: &Mat4, light_space: &Mat4);

    /// Full material draw for the main pass
    fn render_with_materials(&mut self, ctx: &mut RenderContext<'_>, frame: &FrameContext<'_>, model: &Mat4);

    /// Whether the shadow pass draws this object
    fn casts_shadows(&self) -> bool {
        true
    }

    /// Whether the main pass samples the shadow map for this object
    fn receives_shadows(&self) -> bool {
        true
    }

    /// Surface appearance
    fn material(&self) -> &Material;

    /// Mutable surface appearance
    fn material_mut(&mut self) -> &mut Material;

    /// Hand GPU buffers to the release queue
    fn release(&mut self, queue: &mut ReleaseQueue);
}

/// Draw meshes with the depth shader
pub fn draw_depth_only(ctx: &mut RenderContext<'_>, meshes: &mut [RenderMesh], model: &Mat4, light_space: &Mat4) {
    let program = match ctx.shaders.get_or_build(ctx.device, DEPTH_SHADER) {
        Ok(program) => program,
        Err(e) => {
            log::error!("Shadow pass skipped an object: {}", e);
            return;
        }
    };
    ctx.device.use_program(program);
    ctx.device.set_mat4("lightSpaceMatrix", light_space);
    ctx.device.set_mat4("model", model);
    for mesh in meshes {
        if let Some(gpu) = mesh.ensure_uploaded(ctx.device) {
            ctx.device.draw_indexed(&gpu);
        }
    }
}

/// Draw meshes with a material shader, lights and optionally the shadow map
pub fn draw_lit(
    ctx: &mut RenderContext<'_>,
    shader: &str,
    meshes: &mut [RenderMesh],
    material: &mut Material,
    frame: &FrameContext<'_>,
    model: &Mat4,
    receive_shadows: bool,
) {
    let program = match ctx.shaders.get_or_build(ctx.device, shader) {
        Ok(program) => program,
        Err(e) => {
            log::error!("Main pass skipped an object: {}", e);
            return;
        }
    };
    let device = &mut *ctx.device;
    device.use_program(program);

    device.set_mat4("model", model);
    device.set_mat4("view", &frame.view);
    device.set_mat4("projection", &frame.projection);
    device.set_vec3("viewPos", &frame.camera_position);
    device.set_vec3("objectColor", &material.color);
    device.set_bool("useLighting", material.use_lighting);

    match material.resolve_texture(ctx.textures) {
        Some(texture) => {
            device.set_bool("useTexture", true);
            device.set_int("texture_diffuse1", DIFFUSE_UNIT as i32);
            device.bind_texture(DIFFUSE_UNIT, texture);
        }
        None => device.set_bool("useTexture", false),
    }

    upload_lights(device, frame.lights);
    if let Some(position) = frame.primary_light {
        device.set_vec3("lightPos", &position);
    }

    // Uniforms persist per program, so the flag is written on every draw
    match frame.shadow_map.filter(|_| receive_shadows) {
        Some(shadow_map) => {
            device.set_bool("receiveShadows", true);
            device.set_mat4("lightSpaceMatrix", &frame.light_space_matrix);
            device.set_int("shadowMap", SHADOW_MAP_UNIT as i32);
            device.bind_texture(SHADOW_MAP_UNIT, shadow_map);
        }
        None => device.set_bool("receiveShadows", false),
    }

    for mesh in meshes {
        if let Some(gpu) = mesh.ensure_uploaded(device) {
            device.draw_indexed(&gpu);
        }
    }
}

/// Set `numLights` and the `lights[i]` array
pub fn upload_lights(device: &mut dyn GraphicsDevice, lights: &[&Light]) {
    let count = lights.len().min(MAX_SHADER_LIGHTS);
    device.set_int("numLights", count as i32);
    for (i, light) in lights.iter().take(count).enumerate() {
        device.set_int(&format!("lights[{}].type", i), light.light_type.shader_index());
        device.set_vec3(&format!("lights[{}].position", i), &light.position);
        device.set_vec3(&format!("lights[{}].direction", i), &light.direction);
        device.set_vec3(&format!("lights[{}].color", i), &light.color);
        device.set_float(&format!("lights[{}].intensity", i), light.intensity);
    }
}
