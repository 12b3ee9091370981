//! Development scene
//!
//! A ground slab, a falling cube, a thrown sphere and a sun light viewed
//! through a fly camera. A textured cube drops in at a random spot every few
//! seconds. `R` casts a ray from the camera; `P` spawns a cube where the last
//! ray hit.
//!
//! Runs headless with a scripted input sequence unless built with the
//! `glfw-window` feature.

use rand::Rng;
use scene_engine::config::ConfigError;
use scene_engine::gpu::TextureData;
use scene_engine::prelude::*;
use thiserror::Error;

const CONFIG_PATH: &str = "config/engine.toml";
const SPAWN_INTERVAL: f32 = 2.0;
const RAY_LENGTH: f32 = 500.0;
const CHECKER_TEXTURE: &str = "checker";

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

struct DevScene {
    rng: rand::rngs::ThreadRng,
    spawn_timer: f32,
    spawned: u32,
    last_hit: Option<Vec3>,
}

impl DevScene {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            spawn_timer: 0.0,
            spawned: 0,
            last_hit: None,
        }
    }

    fn load_textures(engine: &mut Engine) {
        if engine.load_texture("crate.png", CHECKER_TEXTURE).is_some() {
            return;
        }
        log::info!("Using a generated checker texture");
        let (textures, device) = engine.textures_mut();
        if let Err(e) = textures.insert(device, &checker(64, 8), CHECKER_TEXTURE) {
            log::warn!("Checker texture unavailable: {}", e);
        }
    }

    fn spawn_textured_cube(&mut self, engine: &mut Engine, position: Vec3) {
        let mut cube = GameObject::new(format!("Crate {}", self.spawned));
        cube.set_position(position);
        cube.add_component(CubeRenderer::new().with_texture_name(CHECKER_TEXTURE));
        cube.add_component(PhysicsComponent::cube(BodyKind::Dynamic).with_mass(1.0));
        engine.scene_mut().add_game_object(cube);
        self.spawned += 1;
    }

    fn cast_from_camera(&mut self, engine: &Engine) {
        let camera = engine.scene().camera();
        self.last_hit = match engine.scene().raycast(camera.position(), camera.forward(), RAY_LENGTH) {
            Some((id, hit)) => {
                let name = engine.scene().game_object(id).map_or("?", GameObject::name);
                log::info!("Ray hit '{}' at {:?} ({:.2} units)", name, hit.point, hit.distance);
                Some(hit.point)
            }
            None => {
                log::info!("Ray hit nothing");
                None
            }
        };
    }
}

impl Application for DevScene {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        Self::load_textures(engine);

        engine
            .spawn_prefab("WorldPrefab", Vec3::zeros())
            .ok_or_else(|| AppError::Asset("WorldPrefab".to_string()))?;
        engine
            .spawn_prefab("DynamicCubePrefab", Vec3::zeros())
            .ok_or_else(|| AppError::Asset("DynamicCubePrefab".to_string()))?;
        let sphere = engine
            .spawn_prefab("SpherePrefab", Vec3::new(-8.0, 6.0, 0.0))
            .ok_or_else(|| AppError::Asset("SpherePrefab".to_string()))?;
        if let Some(mut body) = engine.scene_mut().physics_body(sphere) {
            body.set_linear_velocity(Vec3::new(6.0, 4.0, 0.0));
        }

        let sun = Light::directional(
            Vec3::new(-30.0, 60.0, 40.0),
            Vec3::new(0.5, -1.0, -0.6),
            Vec3::new(1.0, 0.95, 0.85),
            1.2,
        );
        engine.lights_mut().add_light(sun);

        let scene = engine.scene_mut();
        scene.camera_mut().set_position(Vec3::new(0.0, 8.0, 30.0));
        scene.camera_mut().look_at(Vec3::zeros());
        scene.set_camera_controller(Some(Box::new(FlyCamera::default())));
        engine.set_mouse_locked(true);

        log::info!("Development scene ready with {} objects", engine.scene().len());
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError> {
        if engine.input().is_key_just_pressed(KeyCode::Escape) {
            engine.quit();
        }

        self.spawn_timer += delta_time;
        if self.spawn_timer >= SPAWN_INTERVAL {
            self.spawn_timer = 0.0;
            let position = Vec3::new(
                self.rng.gen_range(-15.0..15.0),
                self.rng.gen_range(15.0..30.0),
                self.rng.gen_range(-15.0..15.0),
            );
            self.spawn_textured_cube(engine, position);
        }

        if engine.input().is_key_just_pressed(KeyCode::R) {
            self.cast_from_camera(engine);
        }
        if engine.input().is_key_just_pressed(KeyCode::P) {
            match self.last_hit {
                Some(point) => self.spawn_textured_cube(engine, point + Vec3::new(0.0, 1.0, 0.0)),
                None => log::info!("No ray hit to spawn at, press R first"),
            }
        }
        Ok(())
    }

    fn debug_ui(&mut self, engine: &mut Engine) {
        let frame = engine.timer().frame_count();
        if frame % 120 == 0 {
            for entry in engine.scene().hierarchy() {
                log::debug!(
                    "{}{} {:?} [{}]",
                    "  ".repeat(entry.depth),
                    entry.name,
                    entry.position,
                    entry.components.join(", ")
                );
            }
        }
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        log::info!(
            "Spawned {} crates, {} objects alive, {:.1} fps average",
            self.spawned,
            engine.scene().len(),
            engine.timer().average_fps()
        );
    }
}

/// RGBA checkerboard with `cells` squares per side
fn checker(size: u32, cells: u32) -> TextureData {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let value = if light { 220 } else { 60 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    TextureData {
        width: size,
        height: size,
        pixels,
    }
}

/// Key presses replayed by the headless window
#[cfg(not(feature = "glfw-window"))]
fn scripted_window(config: &EngineConfig) -> HeadlessWindow {
    let mut window = HeadlessWindow::new(config.window.width, config.window.height);
    if let Some(frames) = config.frame.max_frames {
        window = window.with_frame_limit(frames);
    }
    let press = |key, pressed| AppEvent::KeyInput { key, pressed };

    for _ in 0..60 {
        window.queue_frame(Vec::new());
    }
    window.queue_frame(vec![press(KeyCode::R, true)]);
    window.queue_frame(vec![press(KeyCode::R, false)]);
    window.queue_frame(vec![press(KeyCode::P, true)]);
    window.queue_frame(vec![press(KeyCode::P, false)]);
    window.queue_frame(vec![AppEvent::WindowResized { width: 1600, height: 900 }]);
    window
}

#[cfg(not(feature = "glfw-window"))]
fn create_engine(config: EngineConfig) -> Result<Engine, EngineError> {
    let window = scripted_window(&config);
    Engine::new(config, Box::new(window), Box::new(RecordingDevice::new()))
}

#[cfg(feature = "glfw-window")]
fn create_engine(config: EngineConfig) -> Result<Engine, EngineError> {
    Engine::windowed(config)
}

fn main() -> Result<(), DemoError> {
    scene_engine::foundation::logging::init();

    let mut config = EngineConfig::load_or_default(CONFIG_PATH)?;
    if cfg!(not(feature = "glfw-window")) && config.frame.max_frames.is_none() {
        config.frame.max_frames = Some(600);
    }
    log::info!("Starting '{}'", config.window.title);

    let mut engine = create_engine(config)?;
    let mut app = DevScene::new();
    engine.run(&mut app)?;
    Ok(())
}
