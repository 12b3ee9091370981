//! # Rendering System
//!
//! Forward renderer with a single shadow-mapped light, built on the
//! [`crate::gpu::GraphicsDevice`] abstraction.
//!
//! ## Architecture
//!
//! - **Camera**: perspective camera owned by the scene, driven by an optional
//!   [`CameraController`]
//! - **Renderables**: components implementing the two-phase [`Renderable`]
//!   contract (depth-only for the shadow pass, lit for the main pass)
//! - **Resources**: [`ShaderManager`] builds named programs from a manifest,
//!   [`TextureManager`] decodes and uploads images
//! - **Meshes**: CPU geometry uploaded lazily through [`RenderMesh`]

pub mod camera;
pub mod cube;
pub mod mesh;
pub mod model;
pub mod render_component;
pub mod shader_manager;
pub mod skybox;
pub mod sphere;
pub mod texture_manager;

pub use camera::{Camera, CameraController, FlyCamera};
pub use cube::{cube_mesh, CubeRenderer};
pub use mesh::{MeshData, RenderMesh, Vertex};
pub use model::ModelRenderer;
pub use render_component::{
    draw_depth_only, draw_lit, upload_lights, FrameContext, Material, RenderContext, Renderable, TextureRef,
    DEPTH_SHADER, MAX_SHADER_LIGHTS,
};
pub use shader_manager::{ShaderEntry, ShaderError, ShaderManager, ShaderManifest};
pub use skybox::{skybox_mesh, Skybox, SKYBOX_SHADER};
pub use sphere::{sphere_mesh, SphereRenderer, SPHERE_SECTORS, SPHERE_STACKS};
pub use texture_manager::{TextureError, TextureManager};
