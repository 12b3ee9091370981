//! Game objects: a transform plus an ordered list of components

use std::sync::atomic::{AtomicU64, Ordering};

use super::{Component, ComponentContext, ComponentServices, DestroyContext, Transform};
use crate::foundation::math::{Mat4, Quat, Vec3};
use crate::physics::{PhysicsComponent, PhysicsWorld};
use crate::render::Renderable;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a game object, unique for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObjectId(u64);

impl GameObjectId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, also stored as physics user data
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Rebuild an id from its raw value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Scene entity
pub struct GameObject {
    id: GameObjectId,
    name: String,
    transform: Transform,
    components: Vec<Box<dyn Component>>,
    parent: Option<GameObjectId>,
    children: Vec<GameObjectId>,
    pose_dirty: bool,
    scale_dirty: bool,
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("components", &self.component_labels())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

impl GameObject {
    /// Create an empty object at the origin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GameObjectId::next(),
            name: name.into(),
            transform: Transform::default(),
            components: Vec::new(),
            parent: None,
            children: Vec::new(),
            pose_dirty: false,
            scale_dirty: false,
        }
    }

    /// Unique id
    pub fn id(&self) -> GameObjectId {
        self.id
    }

    /// Display name, not necessarily unique
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Current transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// `T * R * S` of the transform
    pub fn model_matrix(&self) -> Mat4 {
        self.transform.model_matrix()
    }

    /// Position in world space
    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    /// Set the position and mark the pose for the physics sync
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.set_position(position);
        self.pose_dirty = true;
    }

    /// Set the rotation in Euler degrees and mark the pose for the physics sync
    pub fn set_rotation(&mut self, euler_degrees: Vec3) {
        self.transform.set_rotation(euler_degrees);
        self.pose_dirty = true;
    }

    /// Set the rotation quaternion and mark the pose for the physics sync
    pub fn set_rotation_quaternion(&mut self, rotation: Quat) {
        self.transform.set_rotation_quaternion(rotation);
        self.pose_dirty = true;
    }

    /// Set the scale and mark it for the physics sync
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.set_scale(scale);
        self.scale_dirty = true;
    }

    /// Move by `delta`
    pub fn translate(&mut self, delta: Vec3) {
        self.transform.translate(delta);
        self.pose_dirty = true;
    }

    /// Add Euler degrees to the rotation
    pub fn rotate(&mut self, delta_degrees: Vec3) {
        self.transform.rotate(delta_degrees);
        self.pose_dirty = true;
    }

    /// Add to the scale
    pub fn add_scale(&mut self, delta: Vec3) {
        self.transform.add_scale(delta);
        self.scale_dirty = true;
    }

    /// Write a position read from the simulation
    pub fn set_position_from_physics(&mut self, position: Vec3) {
        self.transform.set_position(position);
    }

    /// Write a rotation read from the simulation
    pub fn set_rotation_from_physics(&mut self, rotation: Quat) {
        self.transform.set_rotation_quaternion(rotation);
    }

    /// Whether a pose edit still has to reach the physics body
    pub fn is_pose_dirty(&self) -> bool {
        self.pose_dirty
    }

    /// Whether a scale edit still has to reach the physics body
    pub fn is_scale_dirty(&self) -> bool {
        self.scale_dirty
    }

    /// Parent id
    pub fn parent(&self) -> Option<GameObjectId> {
        self.parent
    }

    /// Child ids
    pub fn children(&self) -> &[GameObjectId] {
        &self.children
    }

    pub(crate) fn set_parent_id(&mut self, parent: Option<GameObjectId>) {
        self.parent = parent;
    }

    pub(crate) fn add_child_id(&mut self, child: GameObjectId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child_id(&mut self, child: GameObjectId) {
        self.children.retain(|c| *c != child);
    }

    /// Attach a component: set its owner, append it, run `init` and return it
    pub fn add_component<T: Component>(&mut self, component: T) -> &mut T {
        let index = self.attach(Box::new(component));
        match self.components[index].as_any_mut().downcast_mut::<T>() {
            Some(component) => component,
            None => unreachable!("component at {} was just attached as {}", index, std::any::type_name::<T>()),
        }
    }

    /// Attach a boxed component
    pub fn add_boxed_component(&mut self, component: Box<dyn Component>) -> &mut dyn Component {
        let index = self.attach(component);
        self.components[index].as_mut()
    }

    fn attach(&mut self, mut component: Box<dyn Component>) -> usize {
        component.on_attach(self.id);
        self.components.push(component);
        let index = self.components.len() - 1;

        let mut ctx = ComponentContext::new(
            self.id,
            &mut self.transform,
            &mut self.pose_dirty,
            &mut self.scale_dirty,
            ComponentServices::default(),
        );
        self.components[index].init(&mut ctx);
        log::trace!("{} attached to '{}'", self.components[index].label(), self.name);
        index
    }

    /// First component of type `T`, in attachment order
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|component| component.as_any().downcast_ref::<T>())
    }

    /// Mutable first component of type `T`
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<T>())
    }

    pub(crate) fn component_at_mut<T: Component>(&mut self, index: usize) -> Option<&mut T> {
        self.components.get_mut(index)?.as_any_mut().downcast_mut::<T>()
    }

    /// Whether a component of type `T` is attached
    pub fn has_component<T: Component>(&self) -> bool {
        self.get_component::<T>().is_some()
    }

    /// Number of components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Labels of all components, in attachment order
    pub fn component_labels(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.label()).collect()
    }

    /// First component with the render capability
    pub fn render_component(&self) -> Option<&dyn Renderable> {
        self.components.iter().find_map(|c| c.as_renderable())
    }

    /// Mutable first component with the render capability
    pub fn render_component_mut(&mut self) -> Option<&mut dyn Renderable> {
        self.components.iter_mut().find_map(|c| c.as_renderable_mut())
    }

    /// Update every component, without scene services
    pub fn update(&mut self, delta_time: f32) {
        self.update_with(ComponentServices::default(), delta_time);
    }

    /// Update every component in attachment order
    pub fn update_with(&mut self, mut services: ComponentServices<'_>, delta_time: f32) {
        for component in &mut self.components {
            let mut ctx = ComponentContext::new(
                self.id,
                &mut self.transform,
                &mut self.pose_dirty,
                &mut self.scale_dirty,
                ComponentServices {
                    physics: services.physics.as_deref_mut(),
                    lights: services.lights.as_deref_mut(),
                    input: services.input,
                },
            );
            component.update(&mut ctx, delta_time);
        }
    }

    /// Create bodies for physics components that do not have one yet.
    ///
    /// The body starts at the current transform, so pending pose edits are
    /// consumed.
    pub(crate) fn register_physics(&mut self, world: &mut PhysicsWorld) {
        let scale = self.transform.scale();
        let rescale = self.scale_dirty;
        let mut registered = false;
        for component in &mut self.components {
            let Some(physics) = component.as_any_mut().downcast_mut::<PhysicsComponent>() else {
                continue;
            };
            if !physics.needs_registration() {
                continue;
            }
            if rescale {
                physics.apply_scale(world, &scale);
            }
            match physics.register(world, &self.transform) {
                Ok(()) => registered = true,
                Err(e) => log::error!("Physics registration failed for '{}': {}", self.name, e),
            }
        }
        if registered {
            self.pose_dirty = false;
            self.scale_dirty = false;
        }
    }

    /// Whether a physics component is waiting for its body
    pub(crate) fn needs_physics_registration(&self) -> bool {
        self.components.iter().any(|component| {
            component
                .as_any()
                .downcast_ref::<PhysicsComponent>()
                .is_some_and(PhysicsComponent::needs_registration)
        })
    }

    /// Push pending pose and scale edits to the physics bodies
    pub(crate) fn sync_physics(&mut self, world: &mut PhysicsWorld) {
        let pose = std::mem::take(&mut self.pose_dirty);
        let scale = std::mem::take(&mut self.scale_dirty);
        if !pose && !scale {
            return;
        }
        let new_scale = self.transform.scale();
        for component in &mut self.components {
            let Some(physics) = component.as_any_mut().downcast_mut::<PhysicsComponent>() else {
                continue;
            };
            if scale {
                physics.apply_scale(world, &new_scale);
            }
            if pose {
                physics.push_pose(world, &self.transform);
            }
        }
    }

    /// Run `on_destroy` on every component and drop them
    pub fn destroy(&mut self, ctx: &mut DestroyContext<'_>) {
        for component in &mut self.components {
            component.on_destroy(ctx);
        }
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    #[derive(Debug, Default)]
    struct Counter {
        owner: Option<GameObjectId>,
        inits: u32,
        updates: u32,
        seen_position: Option<Vec3>,
    }

    impl Component for Counter {
        fn on_attach(&mut self, owner: GameObjectId) {
            self.owner = Some(owner);
        }

        fn init(&mut self, ctx: &mut ComponentContext<'_>) {
            assert_eq!(Some(ctx.owner()), self.owner);
            self.inits += 1;
        }

        fn update(&mut self, ctx: &mut ComponentContext<'_>, _delta_time: f32) {
            self.updates += 1;
            self.seen_position = Some(ctx.transform().position());
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct Mover(Vec3);

    impl Component for Mover {
        fn update(&mut self, ctx: &mut ComponentContext<'_>, _delta_time: f32) {
            let position = ctx.transform().position() + self.0;
            ctx.set_position(position);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_add_then_get_returns_same_instance() {
        let mut object = GameObject::new("tracked");
        let added: *const Counter = object.add_component(Counter::default());
        let found: *const Counter = object.get_component::<Counter>().unwrap();
        assert_eq!(added, found);

        let counter = object.get_component::<Counter>().unwrap();
        assert_eq!(counter.owner, Some(object.id()));
        assert_eq!(counter.inits, 1);
        assert!(object.get_component::<Mover>().is_none());
    }

    #[test]
    fn test_lookup_returns_first_match_in_attachment_order() {
        let mut object = GameObject::new("twins");
        object.add_component(Mover(Vec3::x()));
        object.add_component(Mover(Vec3::y()));
        assert_eq!(object.get_component::<Mover>().unwrap().0, Vec3::x());
        assert_eq!(object.component_count(), 2);
    }

    #[test]
    fn test_update_runs_in_attachment_order_and_marks_pose_dirty() {
        let mut object = GameObject::new("ordered");
        object.add_component(Mover(Vec3::new(1.0, 0.0, 0.0)));
        object.add_component(Counter::default());
        assert!(!object.is_pose_dirty());

        object.update(0.016);
        object.update(0.016);

        let counter = object.get_component::<Counter>().unwrap();
        assert_eq!(counter.updates, 2);
        // The counter runs after the mover and sees its write
        assert_eq!(counter.seen_position, Some(Vec3::new(2.0, 0.0, 0.0)));
        assert!(object.is_pose_dirty());
    }

    #[test]
    fn test_physics_writes_do_not_mark_dirty() {
        let mut object = GameObject::new("synced");
        object.set_position_from_physics(Vec3::new(0.0, 5.0, 0.0));
        object.set_rotation_from_physics(Quat::identity());
        assert!(!object.is_pose_dirty());

        object.set_scale(Vec3::new(2.0, 2.0, 2.0));
        assert!(object.is_scale_dirty());
        assert!(!object.is_pose_dirty());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = GameObject::new("same");
        let b = GameObject::new("same");
        assert_ne!(a.id(), b.id());
        assert_eq!(GameObjectId::from_raw(a.id().raw()), a.id());
    }
}
