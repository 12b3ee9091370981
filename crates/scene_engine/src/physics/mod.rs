//! Rigid-body physics
//!
//! [`PhysicsWorld`] wraps a rapier3d simulation. [`PhysicsComponent`] binds a
//! game object's transform to one rigid body in that world.

mod component;
mod config;
mod error;
mod world;

pub use component::{
    BodyKind, PhysicsComponent, PhysicsHandle, PhysicsMaterial, PhysicsState, ShapeKind,
};
pub use config::PhysicsConfig;
pub use error::PhysicsError;
pub use world::{ColliderShape, PhysicsWorld, RaycastHit};

pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
