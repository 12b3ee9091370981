//! Component trait and the contexts components run in

use std::any::Any;

use super::{GameObjectId, Transform};
use crate::foundation::math::{Quat, Vec3};
use crate::gpu::{GraphicsDevice, MeshHandle};
use crate::input::InputState;
use crate::lighting::{LightId, LightManager};
use crate::physics::PhysicsWorld;
use crate::render::Renderable;

/// Behaviour attached to a [`super::GameObject`].
///
/// Lifecycle: [`Component::on_attach`] once with the owner id, then
/// [`Component::init`] once, then [`Component::update`] every frame and
/// finally [`Component::on_destroy`] when the owner is destroyed.
pub trait Component: Any {
    /// Receive the owner id. Called exactly once, before `init`.
    fn on_attach(&mut self, _owner: GameObjectId) {}

    /// One-time setup. Other components of the owner may not exist yet.
    fn init(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Per-frame update
    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _delta_time: f32) {}

    /// Release GPU, physics or light resources
    fn on_destroy(&mut self, _ctx: &mut DestroyContext<'_>) {}

    /// Short display name
    fn label(&self) -> &str {
        "Component"
    }

    /// Upcast for typed lookup
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed lookup
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Render capability
    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }

    /// Mutable render capability
    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        None
    }
}

/// Scene services lent to components for one update
#[derive(Default)]
pub struct ComponentServices<'a> {
    /// Physics world of the scene
    pub physics: Option<&'a mut PhysicsWorld>,
    /// Light registry
    pub lights: Option<&'a mut LightManager>,
    /// Input snapshot of this frame
    pub input: Option<&'a InputState>,
}

/// What a component sees of its owner and the scene
pub struct ComponentContext<'a> {
    owner: GameObjectId,
    transform: &'a mut Transform,
    pose_dirty: &'a mut bool,
    scale_dirty: &'a mut bool,
    physics: Option<&'a mut PhysicsWorld>,
    lights: Option<&'a mut LightManager>,
    input: Option<&'a InputState>,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(
        owner: GameObjectId,
        transform: &'a mut Transform,
        pose_dirty: &'a mut bool,
        scale_dirty: &'a mut bool,
        services: ComponentServices<'a>,
    ) -> Self {
        Self {
            owner,
            transform,
            pose_dirty,
            scale_dirty,
            physics: services.physics,
            lights: services.lights,
            input: services.input,
        }
    }

    /// Id of the owning game object
    pub fn owner(&self) -> GameObjectId {
        self.owner
    }

    /// Owner transform
    pub fn transform(&self) -> &Transform {
        self.transform
    }

    /// Move the owner; the pose is pushed to physics on the next update
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.set_position(position);
        *self.pose_dirty = true;
    }

    /// Rotate the owner (Euler degrees)
    pub fn set_rotation(&mut self, euler_degrees: Vec3) {
        self.transform.set_rotation(euler_degrees);
        *self.pose_dirty = true;
    }

    /// Rotate the owner
    pub fn set_rotation_quaternion(&mut self, rotation: Quat) {
        self.transform.set_rotation_quaternion(rotation);
        *self.pose_dirty = true;
    }

    /// Rescale the owner; collision geometry follows on the next update
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.set_scale(scale);
        *self.scale_dirty = true;
    }

    /// Write a pose read back from the simulation without marking it dirty
    pub fn sync_from_physics(&mut self, position: Vec3, rotation: Quat) {
        self.transform.set_position(position);
        self.transform.set_rotation_quaternion(rotation);
    }

    /// Physics world, when the owner lives in an initialized scene
    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_deref()
    }

    /// Mutable physics world
    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_deref_mut()
    }

    /// Light registry
    pub fn lights_mut(&mut self) -> Option<&mut LightManager> {
        self.lights.as_deref_mut()
    }

    /// Input snapshot
    pub fn input(&self) -> Option<&InputState> {
        self.input
    }
}

/// Resources a component may release when its owner is destroyed
pub struct DestroyContext<'a> {
    physics: Option<&'a mut PhysicsWorld>,
    release_queue: &'a mut ReleaseQueue,
}

impl<'a> DestroyContext<'a> {
    /// Combine the scene's physics world and release queue
    pub fn new(physics: Option<&'a mut PhysicsWorld>, release_queue: &'a mut ReleaseQueue) -> Self {
        Self { physics, release_queue }
    }

    /// Physics world hosting the owner's bodies
    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_deref_mut()
    }

    /// Queue for GPU buffers and lights released on a later frame
    pub fn release_queue(&mut self) -> &mut ReleaseQueue {
        self.release_queue
    }
}

/// Handles waiting to be released.
///
/// Destruction can happen where no device or light registry is at hand; the
/// scene flushes the queue at the start of its next update and render.
#[derive(Debug, Default)]
pub struct ReleaseQueue {
    meshes: Vec<MeshHandle>,
    lights: Vec<LightId>,
}

impl ReleaseQueue {
    /// Queue a mesh for deletion
    pub fn push_mesh(&mut self, mesh: MeshHandle) {
        self.meshes.push(mesh);
    }

    /// Queue a light for removal
    pub fn push_light(&mut self, light: LightId) {
        self.lights.push(light);
    }

    /// Number of queued meshes
    pub fn pending_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Number of queued lights
    pub fn pending_lights(&self) -> usize {
        self.lights.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty() && self.lights.is_empty()
    }

    /// Delete queued meshes
    pub fn flush_gpu(&mut self, device: &mut dyn GraphicsDevice) {
        if !self.meshes.is_empty() {
            log::debug!("Releasing {} meshes", self.meshes.len());
        }
        for mesh in self.meshes.drain(..) {
            device.delete_mesh(mesh);
        }
    }

    /// Remove queued lights
    pub fn flush_lights(&mut self, lights: &mut LightManager) {
        for light in self.lights.drain(..) {
            lights.remove_light(light);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::Light;

    #[test]
    fn test_context_marks_dirty_except_for_physics_sync() {
        let mut transform = Transform::default();
        let (mut pose_dirty, mut scale_dirty) = (false, false);
        {
            let mut ctx = ComponentContext::new(
                GameObjectId::from_raw(1),
                &mut transform,
                &mut pose_dirty,
                &mut scale_dirty,
                ComponentServices::default(),
            );
            ctx.sync_from_physics(Vec3::new(0.0, 3.0, 0.0), Quat::identity());
            assert!(ctx.physics().is_none());
        }
        assert!(!pose_dirty && !scale_dirty);
        assert_eq!(transform.position(), Vec3::new(0.0, 3.0, 0.0));

        {
            let mut ctx = ComponentContext::new(
                GameObjectId::from_raw(1),
                &mut transform,
                &mut pose_dirty,
                &mut scale_dirty,
                ComponentServices::default(),
            );
            ctx.set_position(Vec3::new(1.0, 0.0, 0.0));
            ctx.set_scale(Vec3::new(2.0, 2.0, 2.0));
        }
        assert!(pose_dirty && scale_dirty);
    }

    #[test]
    fn test_release_queue_flushes_lights() {
        let mut manager = LightManager::default();
        let id = manager.add_light(Light::point(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), 1.0));

        let mut queue = ReleaseQueue::default();
        queue.push_light(id);
        assert_eq!(queue.pending_lights(), 1);
        queue.flush_lights(&mut manager);
        assert!(queue.is_empty());
        assert!(manager.is_empty());
    }
}
