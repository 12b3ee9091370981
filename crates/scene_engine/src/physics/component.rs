//! Physics component binding a game object to a rigid body

use std::any::Any;

use serde::{Deserialize, Serialize};

use super::{ColliderShape, PhysicsError, PhysicsWorld, RigidBodyHandle};
use crate::foundation::math::Vec3;
use crate::scene::{Component, ComponentContext, DestroyContext, GameObjectId, Transform};

/// Rigid body behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves, infinite mass
    Static,
    /// Simulated under forces and contacts
    Dynamic,
}

/// Strategy deriving collision geometry from the transform scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Unit cube: half extents are half the scale
    Cube,
    /// Unit sphere: radius is the largest scale component
    Sphere,
}

impl ShapeKind {
    /// Collision geometry for an object of the given scale
    pub fn geometry(self, scale: &Vec3) -> ColliderShape {
        match self {
            Self::Cube => ColliderShape::Cuboid {
                half_extents: scale * 0.5,
            },
            Self::Sphere => ColliderShape::Ball {
                radius: scale.max(),
            },
        }
    }
}

/// Surface and density parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    /// Friction coefficient
    pub friction: f32,
    /// Restitution (bounciness)
    pub restitution: f32,
    /// Density used when no explicit mass is set
    pub density: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.2,
            density: 1.0,
        }
    }
}

/// Lifecycle state of a [`PhysicsComponent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsState {
    /// Constructed, no owner
    Detached,
    /// Owner set, no geometry yet
    Attached,
    /// Geometry computed, waiting for the scene to create the body
    Initialized,
    /// Body registered in a physics world
    Simulating,
}

/// Motion requested before the body exists
#[derive(Debug, Clone, Copy, Default)]
struct PendingMotion {
    linear_velocity: Option<Vec3>,
    angular_velocity: Option<Vec3>,
    force: Vec3,
    torque: Vec3,
}

/// Binds a game object's transform to one rigid body.
///
/// The body is created when the owning object is registered with a scene.
/// Each frame [`Component::update`] pulls the body pose back into the
/// transform; edits to the transform are pushed by the scene through
/// [`PhysicsComponent::push_pose`] and [`PhysicsComponent::apply_scale`].
#[derive(Debug)]
pub struct PhysicsComponent {
    body_kind: BodyKind,
    shape_kind: ShapeKind,
    material: PhysicsMaterial,
    mass: Option<f32>,
    owner: Option<GameObjectId>,
    geometry: Option<ColliderShape>,
    body: Option<RigidBodyHandle>,
    pending: PendingMotion,
    inert: bool,
}

impl PhysicsComponent {
    /// Create a component with the given body and shape kinds
    pub fn new(body_kind: BodyKind, shape_kind: ShapeKind) -> Self {
        Self {
            body_kind,
            shape_kind,
            material: PhysicsMaterial::default(),
            mass: None,
            owner: None,
            geometry: None,
            body: None,
            pending: PendingMotion::default(),
            inert: false,
        }
    }

    /// Box collider sized by the transform scale
    pub fn cube(body_kind: BodyKind) -> Self {
        Self::new(body_kind, ShapeKind::Cube)
    }

    /// Sphere collider sized by the transform scale
    pub fn sphere(body_kind: BodyKind) -> Self {
        Self::new(body_kind, ShapeKind::Sphere)
    }

    /// Set the surface material
    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    /// Set an explicit total mass
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> PhysicsState {
        if self.body.is_some() {
            PhysicsState::Simulating
        } else if self.geometry.is_some() {
            PhysicsState::Initialized
        } else if self.owner.is_some() {
            PhysicsState::Attached
        } else {
            PhysicsState::Detached
        }
    }

    /// Whether geometry or body creation failed
    pub fn is_inert(&self) -> bool {
        self.inert
    }

    /// Whether the scene still has to create the body
    pub fn needs_registration(&self) -> bool {
        !self.inert && self.state() == PhysicsState::Initialized
    }

    /// Body kind
    pub fn body_kind(&self) -> BodyKind {
        self.body_kind
    }

    /// Shape strategy
    pub fn shape_kind(&self) -> ShapeKind {
        self.shape_kind
    }

    /// Surface material
    pub fn material(&self) -> PhysicsMaterial {
        self.material
    }

    /// Explicit mass, if one was set
    pub fn mass(&self) -> Option<f32> {
        self.mass
    }

    /// Current collision geometry
    pub fn geometry(&self) -> Option<ColliderShape> {
        self.geometry
    }

    /// Rigid body handle while simulating
    pub fn body_handle(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    fn compute_geometry(&mut self, scale: &Vec3) -> Option<ColliderShape> {
        let geometry = self.shape_kind.geometry(scale);
        if geometry.is_valid() {
            Some(geometry)
        } else {
            log::warn!(
                "{:?} physics for {:?} has invalid geometry at scale {:?}, component is inert",
                self.shape_kind,
                self.owner,
                scale
            );
            self.inert = true;
            None
        }
    }

    fn user_data(&self) -> Result<u128, PhysicsError> {
        self.owner
            .map(|id| u128::from(id.raw()))
            .ok_or(PhysicsError::NotAttached)
    }

    /// Create the rigid body at the transform's pose.
    ///
    /// On failure the component becomes inert and later calls are no-ops.
    pub fn register(&mut self, world: &mut PhysicsWorld, transform: &Transform) -> Result<(), PhysicsError> {
        if self.inert || self.body.is_some() {
            return Ok(());
        }
        let Some(geometry) = self.geometry else {
            return Err(PhysicsError::NotAttached);
        };
        let user_data = self.user_data()?;

        let body = world.create_body(self.body_kind, transform.position(), transform.rotation_quaternion());
        if let Err(e) = world.attach_collider(body, geometry, self.material, self.mass, user_data) {
            world.remove_body(body);
            self.inert = true;
            return Err(e);
        }
        self.body = Some(body);

        let pending = std::mem::take(&mut self.pending);
        if let Some(velocity) = pending.linear_velocity {
            world.set_linear_velocity(body, velocity);
        }
        if let Some(velocity) = pending.angular_velocity {
            world.set_angular_velocity(body, velocity);
        }
        if pending.force != Vec3::zeros() {
            world.apply_force(body, pending.force);
        }
        if pending.torque != Vec3::zeros() {
            world.apply_torque(body, pending.torque);
        }

        log::debug!("Physics body {:?} registered for {:?}", body, self.owner);
        Ok(())
    }

    /// Push the transform pose to the body
    pub fn push_pose(&mut self, world: &mut PhysicsWorld, transform: &Transform) {
        let Some(body) = self.body else {
            log::debug!("push_pose on {:?} without a body ignored", self.owner);
            return;
        };
        world.set_body_pose(body, transform.position(), transform.rotation_quaternion());
    }

    /// Rebuild the collision geometry for a new scale.
    ///
    /// Every existing collider is removed first, so the body always ends up
    /// with exactly one collider sized for `scale`.
    pub fn apply_scale(&mut self, world: &mut PhysicsWorld, scale: &Vec3) {
        if self.inert {
            log::debug!("apply_scale on inert component of {:?} ignored", self.owner);
            return;
        }
        let Some(geometry) = self.compute_geometry(scale) else {
            if let Some(body) = self.body.take() {
                world.remove_body(body);
            }
            return;
        };
        self.geometry = Some(geometry);

        let Some(body) = self.body else {
            return;
        };
        let Ok(user_data) = self.user_data() else {
            return;
        };
        world.detach_colliders(body);
        if let Err(e) = world.attach_collider(body, geometry, self.material, self.mass, user_data) {
            log::error!("Failed to rebuild collider for {:?}: {}", self.owner, e);
            world.remove_body(body);
            self.body = None;
            self.inert = true;
            return;
        }
        if self.body_kind == BodyKind::Dynamic {
            world.recompute_mass_properties(body);
            world.wake_up(body);
        }
    }

    /// Set the total mass of the body
    pub fn set_mass(&mut self, world: Option<&mut PhysicsWorld>, mass: f32) {
        if !mass.is_finite() || mass <= 0.0 {
            log::warn!("Ignoring invalid mass {} for {:?}", mass, self.owner);
            return;
        }
        self.mass = Some(mass);
        if let (Some(world), Some(body)) = (world, self.body) {
            world.set_body_mass(body, mass);
        }
    }

    /// Remove the body from the world
    pub fn release(&mut self, world: &mut PhysicsWorld) {
        if let Some(body) = self.body.take() {
            world.remove_body(body);
            log::debug!("Physics body {:?} released for {:?}", body, self.owner);
        }
    }
}

impl Component for PhysicsComponent {
    fn on_attach(&mut self, owner: GameObjectId) {
        self.owner = Some(owner);
    }

    fn init(&mut self, ctx: &mut ComponentContext<'_>) {
        let scale = ctx.transform().scale();
        self.geometry = self.compute_geometry(&scale);
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, _delta_time: f32) {
        let Some(body) = self.body else {
            return;
        };
        if self.body_kind == BodyKind::Static {
            return;
        }
        let Some(pose) = ctx.physics().and_then(|world| world.body_pose(body)) else {
            return;
        };
        ctx.sync_from_physics(pose.0, pose.1);
    }

    fn on_destroy(&mut self, ctx: &mut DestroyContext<'_>) {
        if let Some(world) = ctx.physics_mut() {
            self.release(world);
        }
    }

    fn label(&self) -> &str {
        match self.shape_kind {
            ShapeKind::Cube => "CubePhysics",
            ShapeKind::Sphere => "SpherePhysics",
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Mutable access to a simulating body, returned by
/// [`crate::scene::Scene::physics_body`].
///
/// Motion requested before the body exists is buffered and applied at
/// registration.
pub struct PhysicsHandle<'a> {
    component: &'a mut PhysicsComponent,
    world: Option<&'a mut PhysicsWorld>,
}

impl<'a> PhysicsHandle<'a> {
    /// Combine a component with the world that hosts its body
    pub fn new(component: &'a mut PhysicsComponent, world: Option<&'a mut PhysicsWorld>) -> Self {
        Self { component, world }
    }

    fn live(&mut self) -> Option<(&mut PhysicsWorld, RigidBodyHandle)> {
        let body = self.component.body?;
        self.world.as_deref_mut().map(|world| (world, body))
    }

    /// The wrapped component
    pub fn component(&self) -> &PhysicsComponent {
        self.component
    }

    /// Set linear velocity
    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        match self.live() {
            Some((world, body)) => {
                world.set_linear_velocity(body, velocity);
            }
            None => self.component.pending.linear_velocity = Some(velocity),
        }
    }

    /// Linear velocity, zero before registration
    pub fn linear_velocity(&mut self) -> Vec3 {
        match self.live() {
            Some((world, body)) => world.linear_velocity(body).unwrap_or_else(Vec3::zeros),
            None => self.component.pending.linear_velocity.unwrap_or_else(Vec3::zeros),
        }
    }

    /// Set angular velocity
    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        match self.live() {
            Some((world, body)) => {
                world.set_angular_velocity(body, velocity);
            }
            None => self.component.pending.angular_velocity = Some(velocity),
        }
    }

    /// Angular velocity, zero before registration
    pub fn angular_velocity(&mut self) -> Vec3 {
        match self.live() {
            Some((world, body)) => world.angular_velocity(body).unwrap_or_else(Vec3::zeros),
            None => self.component.pending.angular_velocity.unwrap_or_else(Vec3::zeros),
        }
    }

    /// Apply a force for the next step
    pub fn apply_force(&mut self, force: Vec3) {
        match self.live() {
            Some((world, body)) => {
                world.apply_force(body, force);
            }
            None => self.component.pending.force += force,
        }
    }

    /// Apply a torque for the next step
    pub fn apply_torque(&mut self, torque: Vec3) {
        match self.live() {
            Some((world, body)) => {
                world.apply_torque(body, torque);
            }
            None => self.component.pending.torque += torque,
        }
    }

    /// Set the total mass
    pub fn set_mass(&mut self, mass: f32) {
        let world = self.world.as_deref_mut();
        self.component.set_mass(world, mass);
    }

    /// Total mass reported by the simulation, or the configured mass
    pub fn mass(&mut self) -> Option<f32> {
        match self.live() {
            Some((world, body)) => world.body_mass(body),
            None => self.component.mass,
        }
    }
}
