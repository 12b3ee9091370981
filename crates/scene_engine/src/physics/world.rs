//! Physics world - main simulation container

use std::num::NonZeroUsize;

use nalgebra::{Isometry3, Translation3};
use rapier3d::prelude as rapier;
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

use super::{BodyKind, PhysicsConfig, PhysicsError, PhysicsMaterial};
use crate::foundation::math::{Point3, Quat, Vec3};

/// Collision geometry in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    /// Box given by its half extents
    Cuboid {
        /// Half size along each axis
        half_extents: Vec3,
    },
    /// Sphere
    Ball {
        /// Sphere radius
        radius: f32,
    },
}

impl ColliderShape {
    /// Whether every dimension is finite and strictly positive
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Cuboid { half_extents } => half_extents.iter().all(|e| e.is_finite() && *e > 0.0),
            Self::Ball { radius } => radius.is_finite() && *radius > 0.0,
        }
    }

    fn builder(&self) -> rapier::ColliderBuilder {
        match *self {
            Self::Cuboid { half_extents } => {
                rapier::ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Self::Ball { radius } => rapier::ColliderBuilder::ball(radius),
        }
    }
}

/// Nearest blocking hit of a raycast
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at the hit, approximated by the reversed ray direction
    pub normal: Vec3,
    /// Distance along the ray
    pub distance: f32,
    /// Collider that was hit
    pub collider: ColliderHandle,
    /// User data stored on the collider
    pub user_data: u128,
}

/// The main physics world containing all simulation state
pub struct PhysicsWorld {
    config: PhysicsConfig,
    pipeline: rapier::PhysicsPipeline,
    gravity: rapier::Vector<f32>,
    integration_params: rapier::IntegrationParameters,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    query_pipeline: rapier::QueryPipeline,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,

    /// Accumulated time for fixed timestep
    accumulated_time: f32,

    /// Bodies with user forces that expire after the current step
    forced_bodies: Vec<RigidBodyHandle>,
}

impl PhysicsWorld {
    /// Create a new physics world
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;

        let gravity = rapier::Vector::new(config.gravity[0], config.gravity[1], config.gravity[2]);
        let mut integration_params = rapier::IntegrationParameters::default();
        integration_params.dt = config.timestep;
        if let Some(iterations) = NonZeroUsize::new(config.solver_iterations) {
            integration_params.num_solver_iterations = iterations;
        }

        log::info!(
            "Physics world created (gravity {:?}, {} step)",
            config.gravity,
            if config.fixed_timestep { "fixed" } else { "variable" }
        );

        Ok(Self {
            config,
            pipeline: rapier::PhysicsPipeline::new(),
            gravity,
            integration_params,
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            query_pipeline: rapier::QueryPipeline::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            accumulated_time: 0.0,
            forced_bodies: Vec::new(),
        })
    }

    /// Get the physics configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Set gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Get gravity
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    // ==================== Simulation ====================

    /// Advance the simulation by `delta_time` seconds.
    ///
    /// Blocks until the step completes. Forces applied since the previous
    /// call act for this call only.
    pub fn step(&mut self, delta_time: f32) {
        if !delta_time.is_finite() || delta_time <= 0.0 {
            log::trace!("Skipping physics step with dt {}", delta_time);
            return;
        }

        if self.config.fixed_timestep {
            self.accumulated_time += delta_time;
            let mut steps = 0;
            while self.accumulated_time >= self.config.timestep && steps < self.config.max_substeps {
                self.step_internal(self.config.timestep);
                self.accumulated_time -= self.config.timestep;
                steps += 1;
            }
            if steps == self.config.max_substeps {
                // Drop the backlog instead of spiralling
                self.accumulated_time = self.accumulated_time.min(self.config.timestep);
            }
        } else {
            self.step_internal(delta_time);
        }

        for handle in self.forced_bodies.drain(..) {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.reset_forces(false);
                body.reset_torques(false);
            }
        }

        self.query_pipeline.update(&self.colliders);
    }

    fn step_internal(&mut self, dt: f32) {
        self.integration_params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    /// Manually sync the query pipeline with current colliders.
    pub fn sync_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    // ==================== Rigid Bodies ====================

    /// Create a rigid body at the given pose
    pub fn create_body(&mut self, kind: BodyKind, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let builder = match kind {
            BodyKind::Static => rapier::RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => rapier::RigidBodyBuilder::dynamic(),
        };
        let handle = self
            .bodies
            .insert(builder.position(Isometry3::from_parts(Translation3::from(position), rotation)));
        log::debug!("Created {:?} body {:?} at {:?}", kind, handle, position);
        handle
    }

    /// Remove a rigid body together with its colliders
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        let removed = self
            .bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some();
        if removed {
            self.forced_bodies.retain(|h| *h != handle);
            self.query_pipeline.update(&self.colliders);
            log::debug!("Removed body {:?}", handle);
        }
        removed
    }

    /// Whether the handle refers to a live body
    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    // ==================== Colliders ====================

    /// Attach a collider to a body.
    ///
    /// With `mass` set the collider carries that total mass, otherwise mass
    /// follows from the material density and the shape volume.
    pub fn attach_collider(
        &mut self,
        body: RigidBodyHandle,
        shape: ColliderShape,
        material: PhysicsMaterial,
        mass: Option<f32>,
        user_data: u128,
    ) -> Result<ColliderHandle, PhysicsError> {
        if !self.bodies.contains(body) {
            return Err(PhysicsError::BodyNotFound(body));
        }
        if !shape.is_valid() {
            return Err(PhysicsError::ShapeCreationFailed(format!("{:?}", shape)));
        }

        let mut builder = shape
            .builder()
            .friction(material.friction)
            .restitution(material.restitution)
            .user_data(user_data);
        builder = match mass {
            Some(mass) => builder.mass(mass),
            None => builder.density(material.density),
        };

        let handle = self.colliders.insert_with_parent(builder, body, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        Ok(handle)
    }

    /// Remove every collider attached to a body
    pub fn detach_colliders(&mut self, body: RigidBodyHandle) -> usize {
        let handles = self.colliders_of(body);
        for handle in &handles {
            self.colliders.remove(*handle, &mut self.islands, &mut self.bodies, false);
        }
        self.query_pipeline.update(&self.colliders);
        handles.len()
    }

    /// Colliders attached to a body
    pub fn colliders_of(&self, body: RigidBodyHandle) -> Vec<ColliderHandle> {
        self.bodies
            .get(body)
            .map(|b| b.colliders().to_vec())
            .unwrap_or_default()
    }

    /// Geometry of a collider
    pub fn collider_shape(&self, handle: ColliderHandle) -> Option<ColliderShape> {
        let shape = self.colliders.get(handle)?.shape();
        if let Some(cuboid) = shape.as_cuboid() {
            Some(ColliderShape::Cuboid {
                half_extents: cuboid.half_extents,
            })
        } else {
            shape.as_ball().map(|ball| ColliderShape::Ball { radius: ball.radius })
        }
    }

    /// User data stored on a collider
    pub fn collider_user_data(&self, handle: ColliderHandle) -> Option<u128> {
        self.colliders.get(handle).map(|c| c.user_data)
    }

    // ==================== Pose & Motion ====================

    /// Position and rotation of a body
    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        self.bodies
            .get(handle)
            .map(|b| (*b.translation(), *b.rotation()))
    }

    /// Overwrite the pose of a body. The rotation is assigned as an absolute
    /// world-space orientation.
    pub fn set_body_pose(&mut self, handle: RigidBodyHandle, position: Vec3, rotation: Quat) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        body.set_position(Isometry3::from_parts(Translation3::from(position), rotation), true);

        // Colliders only follow their body during a step; move them now so
        // queries see the new pose before the next step
        let body_pose = *body.position();
        for &collider in body.colliders() {
            if let Some(collider) = self.colliders.get_mut(collider) {
                let offset = collider.position_wrt_parent().copied().unwrap_or_else(Isometry3::identity);
                collider.set_position(body_pose * offset);
            }
        }
        self.query_pipeline.update(&self.colliders);
        true
    }

    /// Apply a force that acts during the next step
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vec3) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        body.add_force(force, true);
        self.forced_bodies.push(handle);
        true
    }

    /// Apply a torque that acts during the next step
    pub fn apply_torque(&mut self, handle: RigidBodyHandle, torque: Vec3) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        body.add_torque(torque, true);
        self.forced_bodies.push(handle);
        true
    }

    /// Set linear velocity
    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) -> bool {
        self.bodies
            .get_mut(handle)
            .map(|b| b.set_linvel(velocity, true))
            .is_some()
    }

    /// Get linear velocity
    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| *b.linvel())
    }

    /// Set angular velocity
    pub fn set_angular_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) -> bool {
        self.bodies
            .get_mut(handle)
            .map(|b| b.set_angvel(velocity, true))
            .is_some()
    }

    /// Get angular velocity
    pub fn angular_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| *b.angvel())
    }

    /// Wake a sleeping body
    pub fn wake_up(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.wake_up(true);
        }
    }

    // ==================== Mass ====================

    /// Give a body an explicit total mass spread over its colliders, then
    /// recompute its inertia.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_body_mass(&mut self, handle: RigidBodyHandle, mass: f32) -> bool {
        let colliders = self.colliders_of(handle);
        if colliders.is_empty() || !mass.is_finite() || mass <= 0.0 {
            return false;
        }
        let share = mass / colliders.len() as f32;
        for collider in colliders {
            if let Some(collider) = self.colliders.get_mut(collider) {
                collider.set_mass(share);
            }
        }
        self.recompute_mass_properties(handle);
        true
    }

    /// Recompute mass and inertia from the attached colliders
    pub fn recompute_mass_properties(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.recompute_mass_properties_from_colliders(&self.colliders);
        }
    }

    /// Total mass of a body
    pub fn body_mass(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(rapier::RigidBody::mass)
    }

    // ==================== Queries ====================

    /// Cast a ray and return the nearest blocking hit. Sensors are ignored.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RaycastHit> {
        let length = direction.norm();
        if length <= f32::EPSILON || !length.is_finite() {
            return None;
        }
        let dir = direction / length;
        let ray = rapier::Ray::new(Point3::from(origin), dir);
        let filter = rapier::QueryFilter::new().exclude_sensors();

        self.query_pipeline
            .cast_ray(&self.bodies, &self.colliders, &ray, max_distance, true, filter)
            .and_then(|(handle, toi)| {
                let collider = self.colliders.get(handle)?;
                Some(RaycastHit {
                    point: ray.point_at(toi).coords,
                    normal: -dir,
                    distance: toi,
                    collider: handle,
                    user_data: collider.user_data,
                })
            })
    }

    // ==================== Debug ====================

    /// Get number of rigid bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Get number of colliders
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Remove every body and collider
    pub fn clear(&mut self) {
        let handles: Vec<_> = self.bodies.iter().map(|(handle, _)| handle).collect();
        for handle in handles {
            self.remove_body(handle);
        }
        log::info!("Physics world cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsConfig::default()).unwrap()
    }

    fn dynamic_ball(world: &mut PhysicsWorld, y: f32, user_data: u128) -> RigidBodyHandle {
        let body = world.create_body(BodyKind::Dynamic, Vec3::new(0.0, y, 0.0), Quat::identity());
        world
            .attach_collider(
                body,
                ColliderShape::Ball { radius: 1.0 },
                PhysicsMaterial::default(),
                None,
                user_data,
            )
            .unwrap();
        body
    }

    #[test]
    fn test_invalid_config_fails_creation() {
        let config = PhysicsConfig {
            solver_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(PhysicsWorld::new(config), Err(PhysicsError::InvalidConfig(_))));
    }

    #[test]
    fn test_gravity_fall() {
        let mut world = world();
        let body = dynamic_ball(&mut world, 10.0, 1);

        world.step(1.0 / 60.0);

        let (position, _) = world.body_pose(body).unwrap();
        assert!(position.y < 10.0, "Body should fall due to gravity");
    }

    #[test]
    fn test_fixed_step_runs_bounded_substeps() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default().with_fixed_timestep(0.01)).unwrap();
        let body = dynamic_ball(&mut world, 10.0, 1);

        // Less than one step accumulated: nothing moves
        world.step(0.005);
        let (position, _) = world.body_pose(body).unwrap();
        assert_relative_eq!(position.y, 10.0, epsilon = EPSILON);

        world.step(0.005);
        let (position, _) = world.body_pose(body).unwrap();
        assert!(position.y < 10.0);
    }

    #[test]
    fn test_force_acts_for_one_step() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default().with_gravity(0.0, 0.0, 0.0)).unwrap();
        let body = dynamic_ball(&mut world, 0.0, 1);

        assert!(world.apply_force(body, Vec3::new(100.0, 0.0, 0.0)));
        world.step(1.0 / 60.0);
        let after_push = world.linear_velocity(body).unwrap().x;
        assert!(after_push > 0.0);

        world.step(1.0 / 60.0);
        let coasting = world.linear_velocity(body).unwrap().x;
        assert_relative_eq!(coasting, after_push, epsilon = EPSILON);
    }

    #[test]
    fn test_set_pose_assigns_absolute_rotation() {
        let mut world = world();
        let body = dynamic_ball(&mut world, 0.0, 1);

        let first = Quat::from_axis_angle(&Vec3::y_axis(), 0.5);
        let second = Quat::from_axis_angle(&Vec3::x_axis(), 0.25);
        world.set_body_pose(body, Vec3::zeros(), first);
        world.set_body_pose(body, Vec3::zeros(), second);

        let (_, rotation) = world.body_pose(body).unwrap();
        assert!(rotation.angle_to(&second) < EPSILON);
    }

    #[test]
    fn test_set_pose_is_visible_to_raycasts_before_the_next_step() {
        let mut world = world();
        let body = dynamic_ball(&mut world, 0.0, 9);
        let down = Vec3::new(0.0, -1.0, 0.0);

        assert!(world.set_body_pose(body, Vec3::new(20.0, 0.0, 0.0), Quat::identity()));

        let hit = world.raycast(Vec3::new(20.0, 10.0, 0.0), down, 100.0).unwrap();
        assert_eq!(hit.user_data, 9);
        assert_relative_eq!(hit.distance, 9.0, epsilon = EPSILON);
        assert!(world.raycast(Vec3::new(0.0, 10.0, 0.0), down, 100.0).is_none());
    }

    #[test]
    fn test_explicit_mass_overrides_density() {
        let mut world = world();
        let body = dynamic_ball(&mut world, 0.0, 1);

        assert!(world.set_body_mass(body, 7.0));
        assert_relative_eq!(world.body_mass(body).unwrap(), 7.0, epsilon = EPSILON);
        assert!(!world.set_body_mass(body, -1.0));
    }

    #[test]
    fn test_raycast_reports_user_data_and_distance() {
        let mut world = world();
        dynamic_ball(&mut world, 0.0, 42);

        let hit = world
            .raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 100.0)
            .unwrap();
        assert_eq!(hit.user_data, 42);
        assert_relative_eq!(hit.distance, 9.0, epsilon = EPSILON);
        assert_relative_eq!(hit.point, Vec3::new(0.0, 1.0, 0.0), epsilon = EPSILON);

        assert!(world.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::y(), 100.0).is_none());
        assert!(world.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::zeros(), 100.0).is_none());
    }

    #[test]
    fn test_detach_and_remove() {
        let mut world = world();
        let body = dynamic_ball(&mut world, 0.0, 1);
        assert_eq!(world.collider_count(), 1);

        assert_eq!(world.detach_colliders(body), 1);
        assert_eq!(world.collider_count(), 0);
        assert!(world.remove_body(body));
        assert!(!world.remove_body(body));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_invalid_shape_is_rejected() {
        let mut world = world();
        let body = world.create_body(BodyKind::Static, Vec3::zeros(), Quat::identity());
        let result = world.attach_collider(
            body,
            ColliderShape::Cuboid {
                half_extents: Vec3::new(1.0, 0.0, 1.0),
            },
            PhysicsMaterial::default(),
            None,
            0,
        );
        assert!(matches!(result, Err(PhysicsError::ShapeCreationFailed(_))));
    }
}
