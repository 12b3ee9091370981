//! Named game object templates

use std::collections::HashMap;
use std::fmt;

use super::GameObject;
use crate::foundation::math::Vec3;

type SetupFn = dyn Fn(&mut GameObject);

/// Default pose plus a setup closure that attaches components
pub struct PrefabDefinition {
    name: String,
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    setup: Box<SetupFn>,
}

impl fmt::Debug for PrefabDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefabDefinition")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl PrefabDefinition {
    /// Prefab at the origin with identity rotation and unit scale
    pub fn new(name: impl Into<String>, setup: impl Fn(&mut GameObject) + 'static) -> Self {
        Self {
            name: name.into(),
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            setup: Box::new(setup),
        }
    }

    /// Default spawn position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Default rotation in Euler degrees
    pub fn with_rotation(mut self, euler_degrees: Vec3) -> Self {
        self.rotation = euler_degrees;
        self
    }

    /// Default scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Prefab name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default spawn position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Default rotation
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Default scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    fn build(&self, position: Vec3) -> GameObject {
        let mut object = GameObject::new(self.name.clone());
        let spawn = if position == Vec3::zeros() { self.position } else { position };
        object.set_position(spawn);
        object.set_rotation(self.rotation);
        object.set_scale(self.scale);
        (self.setup)(&mut object);
        object
    }
}

/// Prefabs by name
#[derive(Debug, Default)]
pub struct PrefabRegistry {
    prefabs: HashMap<String, PrefabDefinition>,
}

impl PrefabRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefab, replacing any with the same name
    pub fn register(&mut self, definition: PrefabDefinition) {
        let name = definition.name.clone();
        if self.prefabs.insert(name.clone(), definition).is_some() {
            log::warn!("Prefab '{}' replaced", name);
        } else {
            log::debug!("Prefab '{}' registered", name);
        }
    }

    /// Build a game object from a prefab.
    ///
    /// A zero `position` selects the prefab's default position. The object is
    /// not added to any scene. Unknown names return `None`.
    pub fn instantiate(&self, name: &str, position: Vec3) -> Option<GameObject> {
        let Some(definition) = self.prefabs.get(name) else {
            log::warn!("Unknown prefab '{}'", name);
            return None;
        };
        let object = definition.build(position);
        log::debug!("Instantiated '{}' at {:?}", name, object.position());
        Some(object)
    }

    /// Build a game object at the prefab's default position
    pub fn instantiate_default(&self, name: &str) -> Option<GameObject> {
        self.instantiate(name, Vec3::zeros())
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.prefabs.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prefabs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of prefabs
    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    /// Whether no prefab is registered
    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }

    /// Definition by name
    pub fn get(&self, name: &str) -> Option<&PrefabDefinition> {
        self.prefabs.get(name)
    }
}
