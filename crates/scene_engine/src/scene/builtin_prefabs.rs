//! Prefabs every engine instance starts with

use super::{PrefabDefinition, PrefabRegistry};
use crate::foundation::math::Vec3;
use crate::lighting::{Light, LightComponent};
use crate::physics::{BodyKind, PhysicsComponent};
use crate::render::{CubeRenderer, SphereRenderer};

/// Falling unit cube
pub const DYNAMIC_CUBE: &str = "DynamicCubePrefab";
/// Heavy falling sphere
pub const SPHERE: &str = "SpherePrefab";
/// Static ground slab
pub const WORLD: &str = "WorldPrefab";
/// Magenta sphere carrying a point light
pub const LIGHT_SPHERE: &str = "LightSpherePrefab";

/// Register the built-in prefabs
pub fn register_builtin_prefabs(registry: &mut PrefabRegistry) {
    registry.register(
        PrefabDefinition::new(DYNAMIC_CUBE, |object| {
            object.add_component(CubeRenderer::new());
            object.add_component(PhysicsComponent::cube(BodyKind::Dynamic).with_mass(1.0));
        })
        .with_position(Vec3::new(0.0, 20.0, 0.0)),
    );

    registry.register(
        PrefabDefinition::new(SPHERE, |object| {
            object.add_component(SphereRenderer::new());
            object.add_component(PhysicsComponent::sphere(BodyKind::Dynamic).with_mass(7.0));
        })
        .with_position(Vec3::new(0.0, 10.0, 0.0)),
    );

    registry.register(
        PrefabDefinition::new(WORLD, |object| {
            object.add_component(CubeRenderer::new());
            object.add_component(PhysicsComponent::cube(BodyKind::Static));
        })
        .with_position(Vec3::new(0.0, -10.0, 0.0))
        .with_scale(Vec3::new(100.0, 1.0, 100.0)),
    );

    registry.register(
        PrefabDefinition::new(LIGHT_SPHERE, |object| {
            let magenta = Vec3::new(1.0, 0.0, 1.0);
            object.add_component(SphereRenderer::new().with_color(magenta));
            object.add_component(PhysicsComponent::sphere(BodyKind::Dynamic).with_mass(3.0));
            object.add_component(LightComponent::new(Light::point(Vec3::zeros(), magenta, 1.0)));
        })
        .with_position(Vec3::new(0.0, 10.0, 0.0)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ShapeKind;

    #[test]
    fn test_builtins_are_registered() {
        let mut registry = PrefabRegistry::new();
        register_builtin_prefabs(&mut registry);
        assert_eq!(registry.names(), vec![DYNAMIC_CUBE, LIGHT_SPHERE, SPHERE, WORLD]);
    }

    #[test]
    fn test_world_prefab_is_static_slab() {
        let mut registry = PrefabRegistry::new();
        register_builtin_prefabs(&mut registry);

        let world = registry.instantiate_default(WORLD).unwrap();
        assert_eq!(world.position(), Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(world.transform().scale(), Vec3::new(100.0, 1.0, 100.0));
        let physics = world.get_component::<PhysicsComponent>().unwrap();
        assert_eq!(physics.body_kind(), BodyKind::Static);
        assert_eq!(physics.shape_kind(), ShapeKind::Cube);
        assert!(world.has_component::<CubeRenderer>());
    }

    #[test]
    fn test_light_sphere_carries_light_and_mass() {
        let mut registry = PrefabRegistry::new();
        register_builtin_prefabs(&mut registry);

        let object = registry.instantiate_default(LIGHT_SPHERE).unwrap();
        assert_eq!(object.component_labels(), vec!["SphereRenderer", "SpherePhysics", "Light"]);
        assert_eq!(object.get_component::<PhysicsComponent>().unwrap().mass(), Some(3.0));
        let light = object.get_component::<LightComponent>().unwrap();
        assert_eq!(light.light().color, Vec3::new(1.0, 0.0, 1.0));
        assert!(light.light_id().is_none());
    }
}
