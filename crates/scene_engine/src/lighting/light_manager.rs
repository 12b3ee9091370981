//! Scene light registry

use slotmap::{new_key_type, SlotMap};

use super::{Light, ShadowMapper, ShadowSettings};
use crate::foundation::math::Vec3;
use crate::gpu::{DeviceError, GraphicsDevice};
use crate::render::Camera;

new_key_type! {
    /// Stable identifier of a registered light
    pub struct LightId;
}

/// Owns every light of the scene and the shadow mapper of the primary light.
///
/// Lights keep their registration order; the first one is the primary light
/// and drives the shadow pass.
#[derive(Debug)]
pub struct LightManager {
    lights: SlotMap<LightId, Light>,
    order: Vec<LightId>,
    shadow_mapper: ShadowMapper,
}

impl Default for LightManager {
    fn default() -> Self {
        Self::new(ShadowSettings::default())
    }
}

impl LightManager {
    /// Create an empty manager
    pub fn new(shadow_settings: ShadowSettings) -> Self {
        Self {
            lights: SlotMap::with_key(),
            order: Vec::new(),
            shadow_mapper: ShadowMapper::new(shadow_settings),
        }
    }

    /// Create the shadow map target
    pub fn initialize(&mut self, device: &mut dyn GraphicsDevice, resolution: u32) -> Result<(), DeviceError> {
        self.shadow_mapper.initialize(device, resolution)
    }

    /// Release the shadow map target and forget all lights
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        self.shadow_mapper.shutdown(device);
        self.clear_lights();
    }

    /// Register a light
    pub fn add_light(&mut self, light: Light) -> LightId {
        let id = self.lights.insert(light);
        self.order.push(id);
        log::debug!("Light {:?} added ({} total)", id, self.order.len());
        id
    }

    /// Unregister a light
    pub fn remove_light(&mut self, id: LightId) -> Option<Light> {
        let light = self.lights.remove(id)?;
        self.order.retain(|l| *l != id);
        log::debug!("Light {:?} removed ({} left)", id, self.order.len());
        Some(light)
    }

    /// Remove every light
    pub fn clear_lights(&mut self) {
        self.lights.clear();
        self.order.clear();
    }

    /// Light by id
    pub fn light(&self, id: LightId) -> Option<&Light> {
        self.lights.get(id)
    }

    /// Mutable light by id
    pub fn light_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.get_mut(id)
    }

    /// Move a light
    pub fn set_light_position(&mut self, id: LightId, position: Vec3) -> bool {
        match self.lights.get_mut(id) {
            Some(light) => {
                light.position = position;
                true
            }
            None => false,
        }
    }

    /// All lights in registration order
    pub fn lights(&self) -> impl Iterator<Item = (LightId, &Light)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.lights.get(*id).map(|light| (*id, light)))
    }

    /// Number of lights
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no light is registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The first registered light, used for shadows
    pub fn primary_light(&self) -> Option<&Light> {
        self.order.first().and_then(|id| self.lights.get(*id))
    }

    /// Lights close enough to the camera to shade with.
    ///
    /// Scans in registration order, keeps lights within
    /// [`Camera::max_light_distance`] and stops after `max_lights`. The result
    /// is not sorted by distance.
    pub fn relevant_lights(&self, camera: &Camera, max_lights: usize) -> Vec<&Light> {
        let eye = camera.position();
        let max_distance = camera.max_light_distance();
        self.lights()
            .map(|(_, light)| light)
            .filter(|light| (light.position - eye).norm() <= max_distance)
            .take(max_lights)
            .collect()
    }

    /// Shadow mapper of the primary light
    pub fn shadow_mapper(&self) -> &ShadowMapper {
        &self.shadow_mapper
    }

    /// Mutable shadow mapper
    pub fn shadow_mapper_mut(&mut self) -> &mut ShadowMapper {
        &mut self.shadow_mapper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    fn point(x: f32) -> Light {
        Light::point(Vec3::new(x, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0), 1.0)
    }

    fn camera_at_origin(max_light_distance: f32) -> Camera {
        let mut camera = Camera::default();
        camera.set_position(Vec3::zeros());
        camera.set_max_light_distance(max_light_distance);
        camera
    }

    #[test]
    fn test_relevant_lights_respects_count_and_distance() {
        let mut manager = LightManager::default();
        for x in [5.0, 50.0, 8.0, 500.0, 1.0, 2.0] {
            manager.add_light(point(x));
        }
        let camera = camera_at_origin(10.0);

        for max in 0..8 {
            let lights = manager.relevant_lights(&camera, max);
            assert!(lights.len() <= max);
            assert!(lights.iter().all(|l| l.position.norm() <= 10.0));
        }
        assert_eq!(manager.relevant_lights(&camera, 10).len(), 4);
    }

    #[test]
    fn test_relevant_lights_keep_list_order_not_distance() {
        let mut manager = LightManager::default();
        manager.add_light(point(9.0));
        manager.add_light(point(1.0));
        manager.add_light(point(3.0));

        let lights = manager.relevant_lights(&camera_at_origin(10.0), 2);
        let xs: Vec<f32> = lights.iter().map(|l| l.position.x).collect();
        assert_eq!(xs, vec![9.0, 1.0]);
    }

    #[test]
    fn test_light_at_exact_max_distance_is_included() {
        let mut manager = LightManager::default();
        manager.add_light(point(10.0));
        assert_eq!(manager.relevant_lights(&camera_at_origin(10.0), 4).len(), 1);
    }

    #[test]
    fn test_remove_and_primary() {
        let mut manager = LightManager::default();
        let first = manager.add_light(point(1.0));
        let second = manager.add_light(point(2.0));
        assert_eq!(manager.primary_light().map(|l| l.position.x), Some(1.0));

        assert!(manager.remove_light(first).is_some());
        assert!(manager.remove_light(first).is_none());
        assert_eq!(manager.primary_light().map(|l| l.position.x), Some(2.0));

        assert!(manager.set_light_position(second, Vec3::new(0.0, 5.0, 0.0)));
        assert!(!manager.set_light_position(first, Vec3::zeros()));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_initialize_and_shutdown() {
        let mut device = RecordingDevice::new();
        let mut manager = LightManager::default();
        manager.add_light(point(1.0));
        manager.initialize(&mut device, 1024).unwrap();
        assert!(manager.shadow_mapper().is_initialized());

        manager.shutdown(&mut device);
        assert_eq!(device.live_framebuffers(), 0);
        assert!(manager.is_empty());
    }
}
