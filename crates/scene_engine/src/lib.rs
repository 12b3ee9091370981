//! # Scene Engine
//!
//! A real-time 3D scene engine: game objects with attachable components,
//! rendered by a forward pipeline with one shadow-mapped light and kept in
//! sync with a rapier3d physics world.
//!
//! ## Features
//!
//! - **Scene runtime**: game objects, components, prefabs and a parent tree
//! - **Two-pass rendering**: depth-only shadow pass, skybox, lit main pass
//! - **Physics**: rigid bodies whose colliders follow the transform scale
//! - **Headless by default**: a recording GPU device and a scripted window
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         engine.spawn_prefab("WorldPrefab", Vec3::zeros());
//!         engine.spawn_prefab("DynamicCubePrefab", Vec3::zeros());
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = EngineConfig::default();
//!     config.frame.max_frames = Some(120);
//!     let mut engine = Engine::headless(config)?;
//!     engine.run(&mut MyApp)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod gpu;
pub mod input;
pub mod lighting;
pub mod physics;
pub mod platform;
pub mod render;
pub mod scene;

mod application;
mod engine;

pub use application::{AppError, AppEvent, Application};
pub use config::EngineConfig;
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig},
        foundation::{
            math::{Mat4, Quat, Vec3},
            time::Timer,
        },
        gpu::{GraphicsDevice, RecordingDevice, Viewport},
        input::{InputState, KeyCode, MouseButton},
        lighting::{Light, LightComponent, LightManager, LightType},
        physics::{BodyKind, PhysicsComponent, PhysicsMaterial, ShapeKind},
        platform::{HeadlessWindow, WindowBackend},
        render::{Camera, CameraController, CubeRenderer, FlyCamera, ModelRenderer, Skybox, SphereRenderer},
        scene::{
            Component, ComponentContext, GameObject, GameObjectId, PrefabDefinition, PrefabRegistry, Scene,
            Transform,
        },
        AppError, AppEvent, Application, Engine, EngineError,
    };
}
