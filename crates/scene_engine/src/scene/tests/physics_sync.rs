//! Scene-level physics: prefabs that fall, pose sync and raycasts

use crate::foundation::math::Vec3;
use crate::physics::{BodyKind, ColliderShape, PhysicsComponent, PhysicsConfig};
use crate::render::CubeRenderer;
use crate::scene::{register_builtin_prefabs, PrefabRegistry, Scene, UpdateContext, DYNAMIC_CUBE, WORLD};
use approx::assert_relative_eq;

const EPSILON: f32 = 1e-4;
const DT: f32 = 1.0 / 60.0;

fn ready_scene() -> (Scene, PrefabRegistry) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut scene = Scene::new("physics");
    scene.init().unwrap();
    let mut prefabs = PrefabRegistry::new();
    register_builtin_prefabs(&mut prefabs);
    (scene, prefabs)
}

#[test]
fn test_dynamic_cube_prefab_falls_after_one_step() {
    let (mut scene, prefabs) = ready_scene();
    let cube = prefabs.instantiate_default(DYNAMIC_CUBE).unwrap();
    assert!(cube.has_component::<CubeRenderer>());
    assert_eq!(cube.get_component::<PhysicsComponent>().unwrap().body_kind(), BodyKind::Dynamic);

    let id = scene.add_game_object(cube);
    let start = scene.game_object(id).unwrap().position().y;
    assert_relative_eq!(start, 20.0);

    scene.update(DT, UpdateContext::default());
    let after = scene.game_object(id).unwrap().position().y;
    assert!(after < start, "expected y to drop below {}, got {}", start, after);
}

#[test]
fn test_world_slab_stays_put() {
    let (mut scene, prefabs) = ready_scene();
    let id = scene.add_game_object(prefabs.instantiate_default(WORLD).unwrap());
    for _ in 0..10 {
        scene.update(DT, UpdateContext::default());
    }
    assert_relative_eq!(scene.game_object(id).unwrap().position(), Vec3::new(0.0, -10.0, 0.0));
}

#[test]
fn test_immediate_setters_move_the_body() {
    let (mut scene, prefabs) = ready_scene();
    let id = scene.add_game_object(prefabs.instantiate_default(DYNAMIC_CUBE).unwrap());

    assert!(scene.set_position(id, Vec3::new(3.0, 7.0, -2.0)));
    let body = scene
        .game_object(id)
        .unwrap()
        .get_component::<PhysicsComponent>()
        .unwrap()
        .body_handle()
        .unwrap();
    let (position, _) = scene.physics().unwrap().body_pose(body).unwrap();
    assert_relative_eq!(position, Vec3::new(3.0, 7.0, -2.0), epsilon = EPSILON);
    assert!(!scene.game_object(id).unwrap().is_pose_dirty());
}

#[test]
fn test_rescale_twice_keeps_one_collider_at_latest_scale() {
    let (mut scene, prefabs) = ready_scene();
    let id = scene.add_game_object(prefabs.instantiate_default(DYNAMIC_CUBE).unwrap());

    scene.set_scale(id, Vec3::new(2.0, 2.0, 2.0));
    scene.set_scale(id, Vec3::new(4.0, 1.0, 3.0));

    let body = scene
        .game_object(id)
        .unwrap()
        .get_component::<PhysicsComponent>()
        .unwrap()
        .body_handle()
        .unwrap();
    let world = scene.physics().unwrap();
    let colliders = world.colliders_of(body);
    assert_eq!(colliders.len(), 1);
    assert_eq!(
        world.collider_shape(colliders[0]),
        Some(ColliderShape::Cuboid {
            half_extents: Vec3::new(2.0, 0.5, 1.5)
        })
    );
}

#[test]
fn test_edits_made_between_frames_reach_physics_on_update() {
    let (mut scene, prefabs) = ready_scene();
    let id = scene.add_game_object(prefabs.instantiate_default(WORLD).unwrap());

    scene.game_object_mut(id).unwrap().set_position(Vec3::new(0.0, -20.0, 0.0));
    assert!(scene.game_object(id).unwrap().is_pose_dirty());
    scene.update(DT, UpdateContext::default());

    let hit = scene.raycast(Vec3::zeros(), Vec3::new(0.0, -1.0, 0.0), 100.0).unwrap();
    assert_eq!(hit.0, id);
    assert_relative_eq!(hit.1.distance, 19.5, epsilon = EPSILON);
}

#[test]
fn test_raycast_resolves_to_the_hit_entity() {
    let (mut scene, prefabs) = ready_scene();
    let ground = scene.add_game_object(prefabs.instantiate_default(WORLD).unwrap());

    let mut target = crate::scene::GameObject::new("Target");
    target.set_position(Vec3::new(5.0, 0.0, 0.0));
    target.add_component(PhysicsComponent::cube(BodyKind::Static));
    let target = scene.add_game_object(target);

    scene.update(DT, UpdateContext::default());

    let (hit_id, hit) = scene.raycast(Vec3::new(5.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 100.0).unwrap();
    assert_eq!(hit_id, target);
    assert_relative_eq!(hit.point, Vec3::new(5.0, 0.5, 0.0), epsilon = EPSILON);

    let (hit_id, _) = scene.raycast(Vec3::new(-5.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 100.0).unwrap();
    assert_eq!(hit_id, ground);

    assert!(scene.destroy_game_object(target));
    scene.update(DT, UpdateContext::default());
    let (hit_id, _) = scene.raycast(Vec3::new(5.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 100.0).unwrap();
    assert_eq!(hit_id, ground);
}

#[test]
fn test_raycast_resolves_a_dynamic_body_to_its_entity() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut scene = Scene::new("weightless").with_physics_config(PhysicsConfig::default().with_gravity(0.0, 0.0, 0.0));
    scene.init().unwrap();
    let mut prefabs = PrefabRegistry::new();
    register_builtin_prefabs(&mut prefabs);

    let cube = scene.add_game_object(prefabs.instantiate_default(DYNAMIC_CUBE).unwrap());
    let down = Vec3::new(0.0, -1.0, 0.0);

    let (hit_id, hit) = scene.raycast(Vec3::new(0.0, 30.0, 0.0), down, 100.0).unwrap();
    assert_eq!(hit_id, cube);
    assert_relative_eq!(hit.distance, 9.5, epsilon = EPSILON);

    scene.update(DT, UpdateContext::default());
    let (hit_id, _) = scene.raycast(Vec3::new(0.0, 30.0, 0.0), down, 100.0).unwrap();
    assert_eq!(hit_id, cube);
}

#[test]
fn test_immediate_move_is_visible_to_raycasts() {
    let (mut scene, _) = ready_scene();
    let mut target = crate::scene::GameObject::new("Target");
    target.set_position(Vec3::new(5.0, 0.0, 0.0));
    target.add_component(PhysicsComponent::cube(BodyKind::Static));
    let target = scene.add_game_object(target);
    scene.update(DT, UpdateContext::default());

    assert!(scene.set_position(target, Vec3::new(20.0, 0.0, 0.0)));

    let down = Vec3::new(0.0, -1.0, 0.0);
    let (hit_id, hit) = scene.raycast(Vec3::new(20.0, 10.0, 0.0), down, 100.0).unwrap();
    assert_eq!(hit_id, target);
    assert_relative_eq!(hit.point, Vec3::new(20.0, 0.5, 0.0), epsilon = EPSILON);
    assert!(scene.raycast(Vec3::new(5.0, 10.0, 0.0), down, 100.0).is_none());
}

#[test]
fn test_physics_body_handle_sets_velocity() {
    let (mut scene, prefabs) = ready_scene();
    let mut sphere = prefabs.instantiate_default(crate::scene::SPHERE).unwrap();
    sphere.set_position(Vec3::new(0.0, 50.0, 0.0));
    let id = scene.add_game_object(sphere);

    scene.physics_body(id).unwrap().set_linear_velocity(Vec3::new(10.0, 0.0, 0.0));
    scene.update(DT, UpdateContext::default());

    assert!(scene.game_object(id).unwrap().position().x > 0.0);
    assert_relative_eq!(scene.physics_body(id).unwrap().mass().unwrap(), 7.0, epsilon = EPSILON);
}
