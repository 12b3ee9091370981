//! Shadow mapping for the primary light

use serde::{Deserialize, Serialize};

use super::Light;
use crate::config::Config;
use crate::foundation::math::{utils, Mat4, Vec3};
use crate::gpu::{ClearFlags, CullFace, DepthTarget, DeviceError, GraphicsDevice, TextureHandle, Viewport};

/// Texture unit the shadow map is sampled from
pub const SHADOW_MAP_UNIT: u32 = 1;

/// Shadow map configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Square depth texture resolution
    pub resolution: u32,
    /// Light frustum near plane
    pub near_plane: f32,
    /// Light frustum far plane
    pub far_plane: f32,
    /// Half extent of the orthographic light frustum
    pub ortho_size: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            resolution: 2048,
            near_plane: 0.001,
            far_plane: 900.0,
            ortho_size: 100.0,
        }
    }
}

impl Config for ShadowSettings {}

/// Owns the shadow depth target and the light-space transform.
///
/// The matrix is only recomputed by [`ShadowMapper::render_shadow_pass`], so
/// it always describes what is in the depth texture.
#[derive(Debug)]
pub struct ShadowMapper {
    settings: ShadowSettings,
    target: Option<DepthTarget>,
    light_space_matrix: Mat4,
    rendered_for: Option<Vec3>,
    generation: u64,
}

impl ShadowMapper {
    /// Create an uninitialized mapper
    pub fn new(settings: ShadowSettings) -> Self {
        Self {
            settings,
            target: None,
            light_space_matrix: Mat4::identity(),
            rendered_for: None,
            generation: 0,
        }
    }

    /// Allocate the depth target
    pub fn initialize(&mut self, device: &mut dyn GraphicsDevice, resolution: u32) -> Result<(), DeviceError> {
        self.shutdown(device);
        let target = device.create_depth_target(resolution)?;
        self.settings.resolution = resolution;
        self.target = Some(target);
        log::info!("Shadow map target created ({}x{})", resolution, resolution);
        Ok(())
    }

    /// Release the depth target
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(target) = self.target.take() {
            device.delete_depth_target(target);
            self.rendered_for = None;
            log::info!("Shadow map target released");
        }
    }

    /// Whether a depth target exists
    pub fn is_initialized(&self) -> bool {
        self.target.is_some()
    }

    /// Depth texture sampled by the main pass
    pub fn depth_texture(&self) -> Option<TextureHandle> {
        self.target.map(|t| t.texture)
    }

    /// Current settings
    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Set the light frustum far plane
    pub fn set_far_plane(&mut self, far_plane: f32) {
        self.settings.far_plane = far_plane;
    }

    /// Set the light frustum near plane
    pub fn set_near_plane(&mut self, near_plane: f32) {
        self.settings.near_plane = near_plane;
    }

    /// Set the orthographic half extent
    pub fn set_ortho_size(&mut self, ortho_size: f32) {
        self.settings.ortho_size = ortho_size;
    }

    /// Light-space matrix of the most recent shadow pass
    pub fn light_space_matrix(&self) -> Mat4 {
        self.light_space_matrix
    }

    /// Number of shadow passes rendered so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the last shadow pass was rendered for this light pose
    pub fn is_current_for(&self, light: &Light) -> bool {
        self.rendered_for == Some(light.position)
    }

    /// Orthographic projection times a view from the light towards the origin
    pub fn compute_light_space_matrix(&self, light_position: Vec3) -> Mat4 {
        let s = self.settings.ortho_size;
        let projection = utils::orthographic(-s, s, -s, s, self.settings.near_plane, self.settings.far_plane);

        // look_at degenerates when the view direction is parallel to +Y
        let up = if light_position.xz().norm() <= 1e-4 {
            Vec3::z()
        } else {
            Vec3::y()
        };
        projection * utils::look_at(light_position, Vec3::zeros(), up)
    }

    /// Render the depth of every shadow caster from `light`.
    ///
    /// `draw` receives the device and the fresh light-space matrix. The
    /// default framebuffer and `viewport` are restored afterwards. Returns
    /// false when the mapper is not initialized.
    pub fn render_shadow_pass<F>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        light: &Light,
        viewport: Viewport,
        draw: F,
    ) -> bool
    where
        F: FnOnce(&mut dyn GraphicsDevice, &Mat4),
    {
        let Some(target) = self.target else {
            log::warn!("Shadow pass requested before the shadow target exists");
            return false;
        };

        device.bind_framebuffer(Some(target.framebuffer));
        device.set_viewport(Viewport::new(target.resolution, target.resolution));
        device.clear(ClearFlags::DEPTH, [1.0; 4]);

        self.light_space_matrix = self.compute_light_space_matrix(light.position);

        device.set_cull_face(CullFace::Front);
        draw(device, &self.light_space_matrix);
        device.set_cull_face(CullFace::Back);

        device.bind_framebuffer(None);
        device.set_viewport(viewport);

        self.rendered_for = Some(light.position);
        self.generation += 1;
        log::trace!("Shadow pass {} rendered", self.generation);
        true
    }

    /// Bind the depth texture to [`SHADOW_MAP_UNIT`]
    pub fn bind_shadow_map(&self, device: &mut dyn GraphicsDevice) -> bool {
        match self.target {
            Some(target) => {
                device.bind_texture(SHADOW_MAP_UNIT, target.texture);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use crate::gpu::{DeviceCommand, RecordingDevice};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    fn sun(position: Vec3) -> Light {
        Light::directional(position, -position, Vec3::new(1.0, 1.0, 1.0), 1.0)
    }

    #[test]
    fn test_light_space_matrix_maps_origin_inside_frustum() {
        let mapper = ShadowMapper::new(ShadowSettings::default());
        let matrix = mapper.compute_light_space_matrix(Vec3::new(-2.0, 200.0, -1.0));
        let clip = matrix * Vec4::new(0.0, 0.0, 0.0, 1.0);

        assert!(clip.x.abs() < 1.0 && clip.y.abs() < 1.0 && clip.z.abs() < 1.0);
        assert!(matrix.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_overhead_light_uses_fallback_up_vector() {
        let mapper = ShadowMapper::new(ShadowSettings::default());
        let matrix = mapper.compute_light_space_matrix(Vec3::new(0.0, 50.0, 0.0));
        assert!(matrix.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_pass_state_sequence_and_restore() {
        let mut device = RecordingDevice::new();
        let mut mapper = ShadowMapper::new(ShadowSettings::default());
        mapper.initialize(&mut device, 512).unwrap();
        let target_fb = device.live_framebuffers();
        assert_eq!(target_fb, 1);

        let viewport = Viewport::new(1280, 720);
        let mut seen_matrix = None;
        let drawn = mapper.render_shadow_pass(&mut device, &sun(Vec3::new(10.0, 20.0, 5.0)), viewport, |_, m| {
            seen_matrix = Some(*m);
        });
        assert!(drawn);
        assert_relative_eq!(seen_matrix.unwrap(), mapper.light_space_matrix(), epsilon = EPSILON);

        let commands = device.commands();
        assert!(matches!(commands[0], DeviceCommand::BindFramebuffer(Some(_))));
        assert_eq!(commands[1], DeviceCommand::SetViewport(Viewport::new(512, 512)));
        assert_eq!(commands[2], DeviceCommand::Clear(ClearFlags::DEPTH));
        assert_eq!(commands[3], DeviceCommand::SetCullFace(CullFace::Front));
        assert_eq!(commands[4], DeviceCommand::SetCullFace(CullFace::Back));
        assert_eq!(commands[5], DeviceCommand::BindFramebuffer(None));
        assert_eq!(commands[6], DeviceCommand::SetViewport(viewport));
    }

    #[test]
    fn test_staleness_tracks_light_position() {
        let mut device = RecordingDevice::new();
        let mut mapper = ShadowMapper::new(ShadowSettings::default());
        mapper.initialize(&mut device, 256).unwrap();

        let mut light = sun(Vec3::new(10.0, 20.0, 5.0));
        assert!(!mapper.is_current_for(&light));

        mapper.render_shadow_pass(&mut device, &light, Viewport::new(1, 1), |_, _| {});
        assert!(mapper.is_current_for(&light));
        let before = mapper.light_space_matrix();

        light.position = Vec3::new(-10.0, 20.0, 5.0);
        assert!(!mapper.is_current_for(&light));
        assert_relative_eq!(mapper.light_space_matrix(), before);

        mapper.render_shadow_pass(&mut device, &light, Viewport::new(1, 1), |_, _| {});
        assert!(mapper.is_current_for(&light));
        assert_eq!(mapper.generation(), 2);
    }

    #[test]
    fn test_uninitialized_pass_is_skipped() {
        let mut device = RecordingDevice::new();
        let mut mapper = ShadowMapper::new(ShadowSettings::default());
        let drawn = mapper.render_shadow_pass(&mut device, &sun(Vec3::y()), Viewport::new(1, 1), |_, _| {
            panic!("draw must not run");
        });
        assert!(!drawn);
        assert!(!mapper.bind_shadow_map(&mut device));
    }

    #[test]
    fn test_shutdown_releases_target() {
        let mut device = RecordingDevice::new();
        let mut mapper = ShadowMapper::new(ShadowSettings::default());
        mapper.initialize(&mut device, 128).unwrap();
        mapper.initialize(&mut device, 256).unwrap();
        assert_eq!(device.live_framebuffers(), 1);

        mapper.shutdown(&mut device);
        mapper.shutdown(&mut device);
        assert_eq!(device.live_framebuffers(), 0);
        assert_eq!(device.live_textures(), 0);
    }
}
