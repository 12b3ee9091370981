//! Scene management system
//!
//! Game objects own a [`Transform`] and an ordered list of [`Component`]s.
//! A [`Scene`] owns the game objects together with the physics world, the
//! camera and the skybox, and drives the per-frame update and render.
//!
//! ## Architecture
//!
//! ```text
//! PrefabRegistry ──instantiate──> GameObject ──add_game_object──> Scene
//!                                                                   │
//!                         PhysicsWorld <── sync / step ─────────────┤
//!                         LightManager <── shadow pass, main pass ──┘
//! ```

mod builtin_prefabs;
mod component;
mod game_object;
mod prefab;
mod scene_manager;
mod transform;

#[cfg(test)]
mod tests;

pub use builtin_prefabs::{register_builtin_prefabs, DYNAMIC_CUBE, LIGHT_SPHERE, SPHERE, WORLD};
pub use component::{Component, ComponentContext, ComponentServices, DestroyContext, ReleaseQueue};
pub use game_object::{GameObject, GameObjectId};
pub use prefab::{PrefabDefinition, PrefabRegistry};
pub use scene_manager::{HierarchyEntry, RenderServices, Scene, SceneState, UpdateContext};
pub use transform::Transform;
