//! Graphics device abstraction
//!
//! The renderer talks to the GPU only through [`GraphicsDevice`]. Uniforms are
//! set by name on the bound program; no persistent uniform locations are
//! assumed. [`RecordingDevice`] is a headless implementation that records
//! every command.

mod recording;

pub use recording::{DeviceCommand, DrawRecord, RecordingDevice, TextureKind};

use bitflags::bitflags;
use slotmap::new_key_type;
use thiserror::Error;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::Vertex;

new_key_type! {
    /// Linked shader program
    pub struct ProgramHandle;
    /// Vertex + index buffer pair
    pub struct MeshHandle;
    /// 2D texture, cubemap or depth texture
    pub struct TextureHandle;
    /// Off-screen framebuffer
    pub struct FramebufferHandle;
}

bitflags! {
    /// Buffers cleared by [`GraphicsDevice::clear`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u8 {
        /// Color attachment
        const COLOR = 0b01;
        /// Depth attachment
        const DEPTH = 0b10;
    }
}

/// Device errors
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Shader compilation or linking failed
    #[error("Shader program '{name}' failed to build: {log}")]
    CompileFailed {
        /// Program name
        name: String,
        /// Compiler output
        log: String,
    },

    /// Texture data does not match its declared size
    #[error("Invalid texture data: {0}")]
    InvalidTexture(String),

    /// Generic resource creation failure
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),
}

/// Vertex and fragment source of one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Program name, used in diagnostics
    pub name: String,
    /// Vertex stage source
    pub vertex: String,
    /// Fragment stage source
    pub fragment: String,
}

/// Value assigned to a named uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `int` / sampler unit
    Int(i32),
    /// `float`
    Float(f32),
    /// `vec3`
    Vec3(Vec3),
    /// `mat4`
    Mat4(Mat4),
    /// `bool`
    Bool(bool),
}

/// Uploaded mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuMesh {
    /// Buffer handle
    pub handle: MeshHandle,
    /// Number of indices to draw
    pub index_count: u32,
}

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Check that the pixel buffer matches the size
    pub fn validate(&self) -> Result<(), DeviceError> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.width == 0 || self.height == 0 || self.pixels.len() != expected {
            return Err(DeviceError::InvalidTexture(format!(
                "{}x{} needs {} bytes, got {}",
                self.width,
                self.height,
                expected,
                self.pixels.len()
            )));
        }
        Ok(())
    }
}

/// Depth-only render target used for shadow mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthTarget {
    /// Framebuffer with the depth texture attached
    pub framebuffer: FramebufferHandle,
    /// Depth texture, sampled by the main pass
    pub texture: TextureHandle,
    /// Square resolution in texels
    pub resolution: u32,
}

/// Viewport rectangle anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a viewport
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, 1.0 for degenerate sizes
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullFace {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    #[default]
    Back,
}

/// Depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthFunc {
    /// Pass when closer
    #[default]
    Less,
    /// Pass when closer or equal
    LessEqual,
}

/// GPU command interface used by the renderer
pub trait GraphicsDevice {
    /// Compile and link a program
    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramHandle, DeviceError>;

    /// Delete a program
    fn delete_program(&mut self, program: ProgramHandle);

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Assign a uniform of the current program by name
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Set an `int` uniform
    fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    /// Set a `float` uniform
    fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    /// Set a `vec3` uniform
    fn set_vec3(&mut self, name: &str, value: &Vec3) {
        self.set_uniform(name, UniformValue::Vec3(*value));
    }

    /// Set a `mat4` uniform
    fn set_mat4(&mut self, name: &str, value: &Mat4) {
        self.set_uniform(name, UniformValue::Mat4(*value));
    }

    /// Set a `bool` uniform
    fn set_bool(&mut self, name: &str, value: bool) {
        self.set_uniform(name, UniformValue::Bool(value));
    }

    /// Upload vertex and index buffers
    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<GpuMesh, DeviceError>;

    /// Delete a mesh
    fn delete_mesh(&mut self, mesh: MeshHandle);

    /// Draw a mesh with the current program and state
    fn draw_indexed(&mut self, mesh: &GpuMesh);

    /// Upload a 2D texture
    fn create_texture_2d(&mut self, data: &TextureData) -> Result<TextureHandle, DeviceError>;

    /// Upload a cubemap from faces in +X, -X, +Y, -Y, +Z, -Z order
    fn create_cubemap(&mut self, faces: &[TextureData; 6]) -> Result<TextureHandle, DeviceError>;

    /// Bind a texture to a sampler unit
    fn bind_texture(&mut self, slot: u32, texture: TextureHandle);

    /// Delete a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Create a depth-only framebuffer whose texture clamps to a white border
    fn create_depth_target(&mut self, resolution: u32) -> Result<DepthTarget, DeviceError>;

    /// Delete a depth target and its texture
    fn delete_depth_target(&mut self, target: DepthTarget);

    /// Bind an off-screen framebuffer, or the default one with `None`
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport);

    /// Clear the bound framebuffer
    fn clear(&mut self, flags: ClearFlags, color: [f32; 4]);

    /// Set face culling
    fn set_cull_face(&mut self, face: CullFace);

    /// Set the depth comparison
    fn set_depth_func(&mut self, func: DepthFunc);
}
