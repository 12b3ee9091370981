//! Core engine implementation

use std::path::Path;

use crate::{
    application::{AppEvent, Application},
    config::{ConfigError, EngineConfig},
    foundation::{math::Vec3, time::Timer},
    gpu::{DeviceError, GraphicsDevice, RecordingDevice, TextureHandle, Viewport},
    input::InputState,
    lighting::LightManager,
    physics::PhysicsError,
    platform::{HeadlessWindow, WindowBackend, WindowError},
    render::{ShaderError, ShaderManager, TextureManager},
    scene::{register_builtin_prefabs, GameObjectId, PrefabRegistry, RenderServices, Scene, UpdateContext},
};
use thiserror::Error;

/// Main engine struct
///
/// The engine owns every subsystem and runs the frame loop. Subsystems are
/// initialized in dependency order (shaders, textures, lights, scene) and
/// shut down in reverse.
pub struct Engine {
    window: Box<dyn WindowBackend>,
    device: Box<dyn GraphicsDevice>,
    shaders: ShaderManager,
    textures: TextureManager,
    lights: LightManager,
    prefabs: PrefabRegistry,
    scene: Scene,
    input: InputState,
    timer: Timer,
    config: EngineConfig,
    viewport: Viewport,
    resized: Option<Viewport>,
    running: bool,
    shut_down: bool,
}

impl Engine {
    /// Create an engine on the given window and device
    pub fn new(
        config: EngineConfig,
        window: Box<dyn WindowBackend>,
        mut device: Box<dyn GraphicsDevice>,
    ) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");

        let shaders = Self::init_shaders(&config, device.as_mut())?;

        let textures = TextureManager::with_base_dir(&config.assets.texture_dir);
        log::info!("Texture directory: {}", config.assets.texture_dir);

        let mut lights = LightManager::new(config.shadows.clone());
        lights.initialize(device.as_mut(), config.shadows.resolution)?;
        log::info!("Shadow map ready ({}x{})", config.shadows.resolution, config.shadows.resolution);

        let mut scene = Scene::new("main").with_physics_config(config.physics.clone());
        scene.init()?;

        let mut prefabs = PrefabRegistry::new();
        register_builtin_prefabs(&mut prefabs);

        let (width, height) = window.framebuffer_size();
        let viewport = Viewport::new(width, height);
        scene.camera_mut().set_aspect_ratio(viewport.aspect_ratio());
        device.set_viewport(viewport);

        let timer = match config.frame.fixed_delta_time {
            Some(step) => Timer::fixed(step),
            None => Timer::new(),
        };

        log::info!("Engine initialized ({}x{})", width, height);
        Ok(Self {
            window,
            device,
            shaders,
            textures,
            lights,
            prefabs,
            scene,
            input: InputState::new(),
            timer,
            config,
            viewport,
            resized: None,
            running: true,
            shut_down: false,
        })
    }

    /// Engine on a scripted window and the recording device
    pub fn headless(config: EngineConfig) -> Result<Self, EngineError> {
        let mut window = HeadlessWindow::new(config.window.width, config.window.height);
        if let Some(frames) = config.frame.max_frames {
            window = window.with_frame_limit(frames);
        }
        Self::new(config, Box::new(window), Box::new(RecordingDevice::new()))
    }

    /// Engine on a GLFW window
    #[cfg(feature = "glfw-window")]
    pub fn windowed(config: EngineConfig) -> Result<Self, EngineError> {
        let window = crate::platform::GlfwWindow::new(
            &config.window.title,
            config.window.width,
            config.window.height,
            config.window.resizable,
        )?;
        Self::new(config, Box::new(window), Box::new(RecordingDevice::new()))
    }

    fn init_shaders(config: &EngineConfig, device: &mut dyn GraphicsDevice) -> Result<ShaderManager, ShaderError> {
        let manifest = config.renderer.shader_manifest.trim();
        let mut shaders = if manifest.is_empty() {
            ShaderManager::new()
        } else {
            log::info!("Loading shader manifest {}", manifest);
            ShaderManager::load_manifest(manifest)?
        };
        shaders.register_builtin_shaders();

        if config.renderer.preload_shaders {
            shaders.preload_all(device)?;
        }
        Ok(shaders)
    }

    /// Run the main loop until the window closes, the frame limit is hit or
    /// [`Engine::quit`] is called, then shut down
    pub fn run<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        if let Err(e) = app.initialize(self) {
            log::error!("Application initialization failed: {}", e);
            self.shutdown();
            return Err(EngineError::Application(format!("App initialization: {}", e)));
        }

        log::info!("Starting main loop...");
        let result = self.run_frames(app);

        app.cleanup(self);
        self.shutdown();
        log::info!("Engine shutdown complete after {} frames", self.timer.frame_count());
        result
    }

    fn run_frames<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        while self.running && !self.window.should_close() {
            self.frame(app)?;
        }
        Ok(())
    }

    /// Run exactly one frame
    pub fn frame<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        self.input.begin_frame();
        for event in self.window.poll_events() {
            self.handle_event(&event);
            app.handle_event(self, &event)
                .map_err(|e| EngineError::Application(format!("App event: {}", e)))?;
        }

        self.timer.update();
        let delta_time = self.timer.delta_time();

        app.update(self, delta_time)
            .map_err(|e| EngineError::Application(format!("App update: {}", e)))?;
        self.update(delta_time);

        app.debug_ui(self);

        app.render(self)
            .map_err(|e| EngineError::Application(format!("App render: {}", e)))?;
        self.window.present();
        Ok(())
    }

    /// Update the scene
    fn update(&mut self, delta_time: f32) {
        self.scene.update(
            delta_time,
            UpdateContext {
                lights: Some(&mut self.lights),
                input: Some(&self.input),
                resized: self.resized.take(),
            },
        );
    }

    /// Render the scene into the default framebuffer
    pub fn render(&mut self) {
        let mut services = RenderServices {
            device: self.device.as_mut(),
            shaders: &mut self.shaders,
            textures: &self.textures,
            lights: &mut self.lights,
            viewport: self.viewport,
            max_lights: self.config.renderer.max_lights,
            clear_color: self.config.renderer.clear_color,
        };
        self.scene.render(&mut services);
    }

    /// Apply a window event to the engine state
    pub fn handle_event(&mut self, event: &AppEvent) {
        match *event {
            AppEvent::WindowResized { width, height } => {
                self.viewport = Viewport::new(width, height);
                self.resized = Some(self.viewport);
                log::debug!("Viewport resized to {}x{}", width, height);
            }
            AppEvent::WindowCloseRequested => {
                log::info!("Window close requested");
                self.running = false;
            }
            AppEvent::KeyInput { key, pressed } => {
                self.input.handle_key_input(key, pressed);
            }
            AppEvent::MouseButton { button, pressed } => {
                self.input.handle_mouse_button(button, pressed);
            }
            AppEvent::MouseMoved { x, y } => {
                self.input.handle_mouse_move(x, y);
            }
            AppEvent::MouseWheel { delta_x, delta_y } => {
                self.input.handle_scroll(delta_x, delta_y);
            }
            AppEvent::WindowFocused | AppEvent::WindowUnfocused => {
                log::trace!("Focus changed: {:?}", event);
            }
        }
    }

    /// Release everything in reverse init order. Safe to call twice.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        log::info!("Shutting down engine...");
        self.scene.shutdown();
        self.scene.flush_releases(self.device.as_mut(), &mut self.lights);
        self.lights.shutdown(self.device.as_mut());
        self.textures.release_all(self.device.as_mut());
        self.shaders.cleanup(self.device.as_mut());
        self.window.request_close();
        self.running = false;
        self.shut_down = true;
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the loop keeps running
    pub fn is_running(&self) -> bool {
        self.running && !self.shut_down
    }

    /// Instantiate a prefab and add it to the scene
    pub fn spawn_prefab(&mut self, name: &str, position: Vec3) -> Option<GameObjectId> {
        let object = self.prefabs.instantiate(name, position)?;
        Some(self.scene.add_game_object(object))
    }

    /// Decode and upload a texture relative to the texture directory
    pub fn load_texture(&mut self, path: impl AsRef<Path>, name: &str) -> Option<TextureHandle> {
        self.textures.load_texture(self.device.as_mut(), path, name)
    }

    /// Capture or release the cursor
    pub fn set_mouse_locked(&mut self, locked: bool) {
        self.input.set_mouse_locked(locked);
        self.window.set_mouse_locked(locked);
    }

    /// The active scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable active scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Prefab registry
    pub fn prefabs(&self) -> &PrefabRegistry {
        &self.prefabs
    }

    /// Mutable prefab registry
    pub fn prefabs_mut(&mut self) -> &mut PrefabRegistry {
        &mut self.prefabs
    }

    /// Light registry
    pub fn lights(&self) -> &LightManager {
        &self.lights
    }

    /// Mutable light registry
    pub fn lights_mut(&mut self) -> &mut LightManager {
        &mut self.lights
    }

    /// Shader programs
    pub fn shaders(&self) -> &ShaderManager {
        &self.shaders
    }

    /// Rebuild every shader program from source
    pub fn reload_shaders(&mut self) -> Result<(), ShaderError> {
        self.shaders.reload_all(self.device.as_mut())
    }

    /// Loaded textures
    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    /// Mutable texture registry together with the device it uploads to
    pub fn textures_mut(&mut self) -> (&mut TextureManager, &mut dyn GraphicsDevice) {
        (&mut self.textures, self.device.as_mut())
    }

    /// Graphics device
    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    /// Input snapshot of the current frame
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current default framebuffer viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Get the current frame delta time
    pub fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }

    /// Frame timer
    pub fn timer(&self) -> &Timer {
        &self.timer
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Shader manifest, source or compile failure
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// GPU resource creation failure
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Physics world creation failure
    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Window creation failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Application error
    #[error("Application error: {0}")]
    Application(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AppError;
    use crate::input::KeyCode;
    use crate::lighting::{Light, LightComponent};
    use crate::scene::DYNAMIC_CUBE;

    fn headless_config(frames: u64) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.renderer.shader_manifest = String::new();
        config.shadows.resolution = 128;
        config.frame.fixed_delta_time = Some(1.0 / 60.0);
        config.frame.max_frames = Some(frames);
        config
    }

    #[derive(Default)]
    struct TestApp {
        cube: Option<GameObjectId>,
        start_y: f32,
        updates: u32,
        debug_ui_calls: u32,
        keys_seen: u32,
        cleaned_up: bool,
    }

    impl Application for TestApp {
        fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            let id = engine
                .spawn_prefab(DYNAMIC_CUBE, Vec3::zeros())
                .ok_or_else(|| AppError::Custom("missing prefab".to_string()))?;
            self.start_y = engine.scene().game_object(id).map_or(0.0, |o| o.position().y);
            self.cube = Some(id);

            let sun = engine.scene_mut().create_game_object("Sun");
            engine.scene_mut().set_position(sun, Vec3::new(0.0, 50.0, 20.0));
            engine
                .scene_mut()
                .add_component(sun, LightComponent::new(Light::point(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), 1.0)));
            Ok(())
        }

        fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
            self.updates += 1;
            Ok(())
        }

        fn debug_ui(&mut self, engine: &mut Engine) {
            self.debug_ui_calls += 1;
            assert_eq!(engine.lights().len(), 1);
        }

        fn handle_event(&mut self, engine: &mut Engine, event: &AppEvent) -> Result<(), AppError> {
            if let AppEvent::KeyInput { key: KeyCode::Space, .. } = event {
                assert!(engine.input().is_key_just_pressed(KeyCode::Space));
                self.keys_seen += 1;
            }
            Ok(())
        }

        fn cleanup(&mut self, engine: &mut Engine) {
            let id = self.cube.unwrap();
            let y = engine.scene().game_object(id).unwrap().position().y;
            assert!(y < self.start_y);
            self.cleaned_up = true;
        }
    }

    #[test]
    fn test_init_builds_shaders_shadow_target_and_physics() {
        let engine = Engine::headless(headless_config(1)).unwrap();
        assert!(engine.shaders().is_built("standard"));
        assert!(engine.shaders().is_built("shadow_depth"));
        assert!(engine.lights().shadow_mapper().is_initialized());
        assert!(engine.scene().physics().is_some());
        assert_eq!(engine.prefabs().len(), 4);
    }

    #[test]
    fn test_failed_shader_is_fatal_at_init() {
        let mut device = RecordingDevice::new();
        device.fail_program("standard");
        let result = Engine::new(
            headless_config(1),
            Box::new(HeadlessWindow::new(64, 64)),
            Box::new(device),
        );
        assert!(matches!(result, Err(EngineError::Shader(_))));
    }

    #[test]
    fn test_missing_manifest_is_fatal_at_init() {
        let mut config = headless_config(1);
        config.renderer.shader_manifest = "does/not/exist/shaders.toml".to_string();
        assert!(matches!(Engine::headless(config), Err(EngineError::Shader(_))));
    }

    #[test]
    fn test_run_loop_calls_hooks_and_releases_on_shutdown() {
        let mut window = HeadlessWindow::new(320, 240).with_frame_limit(5);
        window.queue_frame(vec![AppEvent::KeyInput {
            key: KeyCode::Space,
            pressed: true,
        }]);
        window.queue_frame(vec![AppEvent::WindowResized { width: 640, height: 320 }]);
        let mut engine = Engine::new(
            headless_config(5),
            Box::new(window),
            Box::new(RecordingDevice::new()),
        )
        .unwrap();

        let mut app = TestApp::default();
        engine.run(&mut app).unwrap();

        assert_eq!(app.updates, 5);
        assert_eq!(app.debug_ui_calls, 5);
        assert_eq!(app.keys_seen, 1);
        assert!(app.cleaned_up);
        assert_eq!(engine.viewport(), Viewport::new(640, 320));
        assert!((engine.scene().camera().aspect_ratio() - 2.0).abs() < 1e-5);

        assert!(!engine.is_running());
        assert!(engine.scene().is_empty());
        assert!(engine.lights().is_empty());
        assert!(!engine.lights().shadow_mapper().is_initialized());
        assert!(!engine.shaders().is_built("standard"));
        assert!(engine.textures().is_empty());
    }

    struct FailingApp;

    impl Application for FailingApp {
        fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            engine.spawn_prefab(DYNAMIC_CUBE, Vec3::zeros());
            Err(AppError::Asset("missing level".to_string()))
        }

        fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
            panic!("update must not run after a failed initialize");
        }
    }

    #[test]
    fn test_failed_initialize_still_shuts_down() {
        let mut engine = Engine::headless(headless_config(3)).unwrap();
        let result = engine.run(&mut FailingApp);

        assert!(matches!(result, Err(EngineError::Application(_))));
        assert!(!engine.is_running());
        assert!(engine.scene().is_empty());
        assert!(!engine.lights().shadow_mapper().is_initialized());
        assert!(!engine.shaders().is_built("standard"));
    }

    #[test]
    fn test_close_event_stops_the_loop() {
        let mut window = HeadlessWindow::new(64, 64);
        window.queue_frame(Vec::new());
        window.queue_frame(vec![AppEvent::WindowCloseRequested]);
        let mut config = headless_config(100);
        config.frame.max_frames = None;
        let mut engine = Engine::new(config, Box::new(window), Box::new(RecordingDevice::new())).unwrap();

        let mut app = TestApp::default();
        engine.run(&mut app).unwrap();
        assert_eq!(app.updates, 2);
    }
}
