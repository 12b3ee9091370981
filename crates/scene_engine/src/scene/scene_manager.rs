//! Scene: entity list, physics world, shadow casters and the two-pass render
//!
//! The scene is the bridge between gameplay state (game objects and their
//! components) and the renderer. Each frame it:
//! 1. Pushes transform edits into the physics world and steps it
//! 2. Updates every entity in insertion order
//! 3. Renders the shadow pass for the shadow casters, the skybox and then
//!    the lit main pass

use super::{ComponentServices, DestroyContext, GameObject, GameObjectId, ReleaseQueue};
use crate::foundation::math::{Mat4, Quat, Vec3};
use crate::gpu::{ClearFlags, GraphicsDevice, Viewport};
use crate::input::InputState;
use crate::lighting::LightManager;
use crate::physics::{PhysicsComponent, PhysicsConfig, PhysicsError, PhysicsHandle, PhysicsWorld, RaycastHit};
use crate::render::{
    Camera, CameraController, FrameContext, RenderContext, ShaderManager, Skybox, TextureManager,
    MAX_SHADER_LIGHTS,
};

/// Lifecycle state of a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Entities can be added; no physics world yet
    Constructed,
    /// Physics world created
    Ready,
}

/// Per-frame inputs of [`Scene::update`]
#[derive(Default)]
pub struct UpdateContext<'a> {
    /// Light registry; queued light removals are applied to it
    pub lights: Option<&'a mut LightManager>,
    /// Input snapshot for the camera controller and components
    pub input: Option<&'a InputState>,
    /// New viewport when the window was resized since the last frame
    pub resized: Option<Viewport>,
}

/// Everything [`Scene::render`] draws with
pub struct RenderServices<'a> {
    /// Target device
    pub device: &'a mut dyn GraphicsDevice,
    /// Program cache
    pub shaders: &'a mut ShaderManager,
    /// Named textures
    pub textures: &'a TextureManager,
    /// Lights and the shadow mapper
    pub lights: &'a mut LightManager,
    /// Default framebuffer viewport
    pub viewport: Viewport,
    /// Upper bound on lights uploaded for the main pass
    pub max_lights: usize,
    /// Background color
    pub clear_color: [f32; 4],
}

/// Read-only view of one entity for a debug UI
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyEntry {
    /// Entity id
    pub id: GameObjectId,
    /// Display name
    pub name: String,
    /// Parent id
    pub parent: Option<GameObjectId>,
    /// Nesting depth, 0 for roots
    pub depth: usize,
    /// Component labels in attachment order
    pub components: Vec<String>,
    /// World position
    pub position: Vec3,
}

/// A collection of game objects sharing a camera, a physics world and a
/// skybox.
pub struct Scene {
    name: String,
    state: SceneState,
    objects: Vec<GameObject>,
    casters: Vec<GameObjectId>,
    camera: Camera,
    camera_controller: Option<Box<dyn CameraController>>,
    skybox: Option<Skybox>,
    physics: Option<PhysicsWorld>,
    physics_config: PhysicsConfig,
    release_queue: ReleaseQueue,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("objects", &self.objects.len())
            .field("casters", &self.casters.len())
            .field("camera", &self.camera)
            .field("skybox", &self.skybox.is_some())
            .finish()
    }
}

impl Scene {
    /// Create an empty scene with the default physics configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SceneState::Constructed,
            objects: Vec::new(),
            casters: Vec::new(),
            camera: Camera::default(),
            camera_controller: None,
            skybox: None,
            physics: None,
            physics_config: PhysicsConfig::default(),
            release_queue: ReleaseQueue::default(),
        }
    }

    /// Use `config` when the physics world is created
    pub fn with_physics_config(mut self, config: PhysicsConfig) -> Self {
        self.physics_config = config;
        self
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifecycle state
    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Create the physics world and register every entity added so far
    pub fn init(&mut self) -> Result<(), PhysicsError> {
        if self.state == SceneState::Ready {
            return Ok(());
        }
        self.physics = Some(PhysicsWorld::new(self.physics_config.clone())?);
        self.state = SceneState::Ready;
        for index in 0..self.objects.len() {
            self.register(index);
        }
        log::info!("Scene '{}' initialized with {} objects", self.name, self.objects.len());
        Ok(())
    }

    fn index_of(&self, id: GameObjectId) -> Option<usize> {
        self.objects.iter().position(|object| object.id() == id)
    }

    /// Bring physics and caster membership of one entity up to date
    fn register(&mut self, index: usize) {
        let object = &mut self.objects[index];
        if let Some(world) = self.physics.as_mut() {
            object.register_physics(world);
        }

        let id = object.id();
        let casts = object.render_component().is_some_and(|r| r.casts_shadows());
        let listed = self.casters.contains(&id);
        if casts && !listed {
            self.casters.push(id);
        } else if !casts && listed {
            self.casters.retain(|c| *c != id);
        }
    }

    /// Take ownership of `object` and register it with physics and the
    /// shadow casters
    pub fn add_game_object(&mut self, object: GameObject) -> GameObjectId {
        let id = object.id();
        if self.index_of(id).is_some() {
            log::warn!("Game object {:?} is already in scene '{}'", id, self.name);
            return id;
        }
        log::info!("Adding '{}' ({:?}) to scene '{}'", object.name(), id, self.name);
        self.objects.push(object);
        self.register(self.objects.len() - 1);
        id
    }

    /// Add an empty game object
    pub fn create_game_object(&mut self, name: impl Into<String>) -> GameObjectId {
        self.add_game_object(GameObject::new(name))
    }

    /// Attach a component to a live entity and register what it brings
    pub fn add_component<T: super::Component>(&mut self, id: GameObjectId, component: T) -> Option<&mut T> {
        let index = self.index_of(id)?;
        self.objects[index].add_component(component);
        let slot = self.objects[index].component_count() - 1;
        self.register(index);
        self.objects[index].component_at_mut::<T>(slot)
    }

    /// Destroy an entity and its children.
    ///
    /// Removes it from the entity list, the caster list and its parent,
    /// releases its physics bodies, and queues its GPU buffers and lights for
    /// release. Returns false for an unknown id.
    pub fn destroy_game_object(&mut self, id: GameObjectId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let children = self.objects[index].children().to_vec();
        for child in children {
            self.destroy_game_object(child);
        }

        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mut object = self.objects.remove(index);
        self.casters.retain(|c| *c != id);
        if let Some(parent) = object.parent().and_then(|p| self.game_object_mut(p)) {
            parent.remove_child_id(id);
        }

        let mut ctx = DestroyContext::new(self.physics.as_mut(), &mut self.release_queue);
        object.destroy(&mut ctx);
        log::info!("Destroyed '{}' ({:?}) in scene '{}'", object.name(), id, self.name);
        true
    }

    /// Attach `child` to `parent`, or detach it with `None`.
    ///
    /// Fails for unknown ids and when the link would create a cycle.
    pub fn set_parent(&mut self, child: GameObjectId, parent: Option<GameObjectId>) -> bool {
        let Some(child_index) = self.index_of(child) else {
            return false;
        };
        if let Some(parent) = parent {
            if self.index_of(parent).is_none() {
                return false;
            }
            let mut cursor = Some(parent);
            while let Some(current) = cursor {
                if current == child {
                    log::warn!("Parenting {:?} under {:?} would create a cycle", child, parent);
                    return false;
                }
                cursor = self.game_object(current).and_then(GameObject::parent);
            }
        }

        if let Some(old) = self.objects[child_index].parent() {
            if let Some(old_parent) = self.game_object_mut(old) {
                old_parent.remove_child_id(child);
            }
        }
        self.objects[child_index].set_parent_id(parent);
        if let Some(new_parent) = parent.and_then(|p| self.game_object_mut(p)) {
            new_parent.add_child_id(child);
        }
        true
    }

    fn with_object_synced(&mut self, id: GameObjectId, edit: impl FnOnce(&mut GameObject)) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let object = &mut self.objects[index];
        edit(object);
        if let Some(world) = self.physics.as_mut() {
            object.sync_physics(world);
        }
        true
    }

    /// Move an entity and its body now
    pub fn set_position(&mut self, id: GameObjectId, position: Vec3) -> bool {
        self.with_object_synced(id, |object| object.set_position(position))
    }

    /// Rotate an entity and its body now (Euler degrees)
    pub fn set_rotation(&mut self, id: GameObjectId, euler_degrees: Vec3) -> bool {
        self.with_object_synced(id, |object| object.set_rotation(euler_degrees))
    }

    /// Rotate an entity and its body now
    pub fn set_rotation_quaternion(&mut self, id: GameObjectId, rotation: Quat) -> bool {
        self.with_object_synced(id, |object| object.set_rotation_quaternion(rotation))
    }

    /// Rescale an entity and rebuild its collider now
    pub fn set_scale(&mut self, id: GameObjectId, scale: Vec3) -> bool {
        self.with_object_synced(id, |object| object.set_scale(scale))
    }

    /// Velocity and force access to the first physics component of `id`
    pub fn physics_body(&mut self, id: GameObjectId) -> Option<PhysicsHandle<'_>> {
        let index = self.index_of(id)?;
        let component = self.objects[index].get_component_mut::<PhysicsComponent>()?;
        Some(PhysicsHandle::new(component, self.physics.as_mut()))
    }

    /// Nearest hit along a ray, resolved to the live entity that owns the
    /// collider
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<(GameObjectId, RaycastHit)> {
        let hit = self.physics.as_ref()?.raycast(origin, direction, max_distance)?;
        let id = GameObjectId::from_raw(u64::try_from(hit.user_data).ok()?);
        self.index_of(id)?;
        Some((id, hit))
    }

    /// Advance one frame: camera, physics, then every entity in insertion
    /// order
    pub fn update(&mut self, delta_time: f32, mut ctx: UpdateContext<'_>) {
        if let Some(lights) = ctx.lights.as_deref_mut() {
            self.release_queue.flush_lights(lights);
        }

        if let (Some(controller), Some(input)) = (self.camera_controller.as_mut(), ctx.input) {
            controller.update(&mut self.camera, input, delta_time);
        }
        self.camera.update(ctx.resized);

        if let Some(world) = self.physics.as_mut() {
            for object in &mut self.objects {
                object.sync_physics(world);
                if object.needs_physics_registration() {
                    object.register_physics(world);
                }
            }
            world.step(delta_time);
        }

        for object in &mut self.objects {
            object.update_with(
                ComponentServices {
                    physics: self.physics.as_mut(),
                    lights: ctx.lights.as_deref_mut(),
                    input: ctx.input,
                },
                delta_time,
            );
        }
        log::trace!("Scene '{}' updated ({} objects)", self.name, self.objects.len());
    }

    /// Draw one frame: shadow pass, skybox, then the lit main pass
    pub fn render(&mut self, services: &mut RenderServices<'_>) {
        self.release_queue.flush_gpu(&mut *services.device);
        // Lights of entities destroyed since the last update stop contributing
        self.release_queue.flush_lights(services.lights);
        self.render_shadow_pass(services);

        let device = &mut *services.device;
        device.bind_framebuffer(None);
        device.set_viewport(services.viewport);
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH, services.clear_color);

        let view = self.camera.view_matrix();
        let projection = self.camera.projection_matrix();
        let mut ctx = RenderContext {
            device: &mut *services.device,
            shaders: &mut *services.shaders,
            textures: services.textures,
        };

        if let Some(skybox) = self.skybox.as_mut() {
            skybox.draw(&mut ctx, &view, &projection);
        }

        let lights = &*services.lights;
        let relevant = lights.relevant_lights(&self.camera, services.max_lights.min(MAX_SHADER_LIGHTS));
        let primary = lights.primary_light();
        let mapper = lights.shadow_mapper();
        if let Some(light) = primary {
            if mapper.is_initialized() && !mapper.is_current_for(light) {
                log::warn!("Shadow map is stale for the primary light at {:?}", light.position);
            }
        }

        let frame = FrameContext {
            view,
            projection,
            camera_position: self.camera.position(),
            lights: &relevant,
            primary_light: primary.map(|light| light.position),
            light_space_matrix: mapper.light_space_matrix(),
            shadow_map: mapper.depth_texture(),
        };

        for object in &mut self.objects {
            let model = object.model_matrix();
            if let Some(renderable) = object.render_component_mut() {
                renderable.render_with_materials(&mut ctx, &frame, &model);
            }
        }
        log::trace!("Scene '{}' rendered with {} lights", self.name, relevant.len());
    }

    fn render_shadow_pass(&mut self, services: &mut RenderServices<'_>) {
        let Some(light) = services.lights.primary_light().cloned() else {
            log::trace!("No primary light, shadow pass skipped");
            return;
        };
        if !services.lights.shadow_mapper().is_initialized() {
            log::trace!("Shadow mapper not initialized, shadow pass skipped");
            return;
        }

        let objects = &mut self.objects;
        let casters = &self.casters;
        let shaders = &mut *services.shaders;
        let textures = services.textures;
        services.lights.shadow_mapper_mut().render_shadow_pass(
            &mut *services.device,
            &light,
            services.viewport,
            |device, light_space| {
                let mut ctx = RenderContext {
                    device,
                    shaders,
                    textures,
                };
                for object in objects.iter_mut().filter(|o| casters.contains(&o.id())) {
                    let model = object.model_matrix();
                    if let Some(renderable) = object.render_component_mut() {
                        renderable.render_raw_geometry(&mut ctx, &model, light_space);
                    }
                }
            },
        );
    }

    /// Destroy every entity and release the skybox; the queued GPU buffers
    /// are freed by [`Scene::flush_releases`]
    pub fn shutdown(&mut self) {
        let roots: Vec<GameObjectId> = self
            .objects
            .iter()
            .filter(|object| object.parent().is_none())
            .map(GameObject::id)
            .collect();
        for id in roots {
            self.destroy_game_object(id);
        }
        // Orphans whose parent link was never resolved
        while let Some(object) = self.objects.last() {
            let id = object.id();
            self.destroy_game_object(id);
        }
        self.casters.clear();
        if let Some(mut skybox) = self.skybox.take() {
            skybox.release(&mut self.release_queue);
        }
        log::info!("Scene '{}' shut down", self.name);
    }

    /// Apply queued GPU and light releases now
    pub fn flush_releases(&mut self, device: &mut dyn GraphicsDevice, lights: &mut LightManager) {
        self.release_queue.flush_gpu(device);
        self.release_queue.flush_lights(lights);
    }

    /// Pending releases
    pub fn release_queue(&self) -> &ReleaseQueue {
        &self.release_queue
    }

    /// Active camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Replace the camera
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Drive the camera from input each update
    pub fn set_camera_controller(&mut self, controller: Option<Box<dyn CameraController>>) {
        self.camera_controller = controller;
    }

    /// Replace the skybox; the old one's buffers are queued for release
    pub fn set_skybox(&mut self, skybox: Option<Skybox>) {
        if let Some(mut old) = std::mem::replace(&mut self.skybox, skybox) {
            old.release(&mut self.release_queue);
        }
    }

    /// Current skybox
    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    /// Physics world, once initialized
    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_ref()
    }

    /// Mutable physics world
    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_mut()
    }

    /// Entity by id
    pub fn game_object(&self, id: GameObjectId) -> Option<&GameObject> {
        self.objects.iter().find(|object| object.id() == id)
    }

    /// Mutable entity by id.
    ///
    /// Transform edits made here reach physics on the next update.
    pub fn game_object_mut(&mut self, id: GameObjectId) -> Option<&mut GameObject> {
        self.objects.iter_mut().find(|object| object.id() == id)
    }

    /// First entity with `name`
    pub fn find_by_name(&self, name: &str) -> Option<&GameObject> {
        self.objects.iter().find(|object| object.name() == name)
    }

    /// All entities in insertion order
    pub fn game_objects(&self) -> &[GameObject] {
        &self.objects
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene has no entities
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Ids of the entities drawn in the shadow pass
    pub fn shadow_casters(&self) -> &[GameObjectId] {
        &self.casters
    }

    /// Whether `id` is drawn in the shadow pass
    pub fn is_shadow_caster(&self, id: GameObjectId) -> bool {
        self.casters.contains(&id)
    }

    /// Depth-first summary of the parent tree
    pub fn hierarchy(&self) -> Vec<HierarchyEntry> {
        let mut entries = Vec::with_capacity(self.objects.len());
        for root in self
            .objects
            .iter()
            .filter(|object| object.parent().map_or(true, |p| self.index_of(p).is_none()))
        {
            self.collect_hierarchy(root, 0, &mut entries);
        }
        entries
    }

    fn collect_hierarchy(&self, object: &GameObject, depth: usize, entries: &mut Vec<HierarchyEntry>) {
        entries.push(HierarchyEntry {
            id: object.id(),
            name: object.name().to_string(),
            parent: object.parent(),
            depth,
            components: object.component_labels().into_iter().map(String::from).collect(),
            position: object.position(),
        });
        for child in object.children().iter().filter_map(|c| self.game_object(*c)) {
            self.collect_hierarchy(child, depth + 1, entries);
        }
    }

    /// Model matrix of an entity
    pub fn model_matrix(&self, id: GameObjectId) -> Option<Mat4> {
        self.game_object(id).map(GameObject::model_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BodyKind;
    use crate::render::{CubeRenderer, Renderable};

    #[test]
    fn test_init_registers_objects_added_before() {
        let mut scene = Scene::new("early");
        let mut object = GameObject::new("crate");
        object.add_component(PhysicsComponent::cube(BodyKind::Dynamic));
        let id = scene.add_game_object(object);
        assert!(scene.physics().is_none());

        scene.init().unwrap();
        assert_eq!(scene.state(), SceneState::Ready);
        assert_eq!(scene.physics().unwrap().body_count(), 1);
        assert!(scene.game_object(id).unwrap().get_component::<PhysicsComponent>().unwrap().body_handle().is_some());
    }

    #[test]
    fn test_add_component_through_scene_updates_casters() {
        let mut scene = Scene::new("late");
        let id = scene.create_game_object("empty");
        assert!(!scene.is_shadow_caster(id));

        let renderer = scene.add_component(id, CubeRenderer::new()).unwrap();
        assert!(renderer.casts_shadows());
        assert_eq!(scene.shadow_casters(), &[id]);
    }

    #[test]
    fn test_set_parent_rejects_cycles_and_destroy_cascades() {
        let mut scene = Scene::new("tree");
        let root = scene.create_game_object("root");
        let child = scene.create_game_object("child");
        let grandchild = scene.create_game_object("grandchild");

        assert!(scene.set_parent(child, Some(root)));
        assert!(scene.set_parent(grandchild, Some(child)));
        assert!(!scene.set_parent(root, Some(grandchild)));
        assert!(!scene.set_parent(root, Some(root)));

        let depths: Vec<usize> = scene.hierarchy().iter().map(|e| e.depth).collect();
        assert_eq!(depths, vec![0, 1, 2]);

        assert!(scene.destroy_game_object(child));
        assert!(scene.game_object(grandchild).is_none());
        assert!(scene.game_object(root).unwrap().children().is_empty());
        assert!(!scene.destroy_game_object(child));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_unknown_ids_are_rejected() {
        let mut scene = Scene::new("empty");
        let ghost = GameObject::new("ghost").id();
        assert!(!scene.set_position(ghost, Vec3::zeros()));
        assert!(scene.physics_body(ghost).is_none());
        assert!(scene.add_component(ghost, CubeRenderer::new()).is_none());
        assert!(scene.raycast(Vec3::zeros(), Vec3::y(), 10.0).is_none());
    }
}
