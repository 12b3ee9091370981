//! Named shader programs built from a manifest
//!
//! The manifest maps a program name to its vertex and fragment files plus a
//! set of `#define`s:
//!
//! ```toml
//! [shaders.standard]
//! vertex = "shaders/standard.vert"
//! fragment = "shaders/standard.frag"
//! defines = { MAX_LIGHTS = "128" }
//! ```
//!
//! Paths are resolved against the manifest's directory.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::gpu::{DeviceError, GraphicsDevice, ProgramHandle, ShaderSource};

/// Version directive prepended to every stage
pub const GLSL_VERSION: &str = "#version 460 core";

/// Shader errors
#[derive(Error, Debug)]
pub enum ShaderError {
    /// Manifest could not be read or parsed
    #[error("Shader manifest error: {0}")]
    Manifest(#[from] ConfigError),

    /// Stage file could not be read
    #[error("Failed to read shader file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Name not present in the manifest
    #[error("Unknown shader: {0}")]
    UnknownShader(String),

    /// Compile or link failure
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// One manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderEntry {
    /// Vertex stage file
    pub vertex: String,
    /// Fragment stage file
    pub fragment: String,
    /// `#define NAME VALUE` pairs injected after the version directive
    #[serde(default)]
    pub defines: BTreeMap<String, String>,
}

/// Shader manifest file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderManifest {
    /// Programs by name
    #[serde(default)]
    pub shaders: BTreeMap<String, ShaderEntry>,
}

impl Config for ShaderManifest {}

#[derive(Debug, Clone)]
enum StageSource {
    Files(ShaderEntry),
    Inline {
        vertex: String,
        fragment: String,
        defines: BTreeMap<String, String>,
    },
}

/// Prepend the version directive and defines, dropping any `#version` line
/// of the original source.
pub fn preprocess(source: &str, defines: &BTreeMap<String, String>) -> String {
    let mut processed = String::with_capacity(source.len() + 64);
    processed.push_str(GLSL_VERSION);
    processed.push('\n');
    for (name, value) in defines {
        processed.push_str(&format!("#define {} {}\n", name, value));
    }
    for line in source.lines() {
        if !line.trim_start().starts_with("#version") {
            processed.push_str(line);
            processed.push('\n');
        }
    }
    processed
}

/// Builds programs lazily and caches them by name
#[derive(Debug, Default)]
pub struct ShaderManager {
    base_dir: PathBuf,
    sources: BTreeMap<String, StageSource>,
    programs: HashMap<String, ProgramHandle>,
}

impl ShaderManager {
    /// Create a manager with no programs
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest file
    pub fn load_manifest(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let manifest = ShaderManifest::load_from_file(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        log::info!(
            "Loaded shader manifest {} ({} programs)",
            path.display(),
            manifest.shaders.len()
        );
        Ok(Self::from_manifest(manifest, base_dir))
    }

    /// Use an already parsed manifest with paths relative to `base_dir`
    pub fn from_manifest(manifest: ShaderManifest, base_dir: impl Into<PathBuf>) -> Self {
        let mut manager = Self {
            base_dir: base_dir.into(),
            ..Self::default()
        };
        for (name, entry) in manifest.shaders {
            manager.sources.insert(name, StageSource::Files(entry));
        }
        manager
    }

    /// Manager preloaded with the engine's built-in programs
    /// (`standard`, `sphere`, `shadow_depth`, `cubemap`)
    pub fn with_builtin_shaders() -> Self {
        let mut manager = Self::new();
        manager.register_builtin_shaders();
        manager
    }

    /// Register the built-in programs, keeping manifest entries of the same
    /// name
    pub fn register_builtin_shaders(&mut self) {
        let max_lights = BTreeMap::from([("MAX_LIGHTS".to_string(), "128".to_string())]);
        let builtins = [
            (
                "standard",
                include_str!("../../shaders/standard.vert"),
                include_str!("../../shaders/standard.frag"),
                max_lights.clone(),
            ),
            (
                "sphere",
                include_str!("../../shaders/standard.vert"),
                include_str!("../../shaders/sphere.frag"),
                max_lights,
            ),
            (
                "shadow_depth",
                include_str!("../../shaders/shadow_depth.vert"),
                include_str!("../../shaders/shadow_depth.frag"),
                BTreeMap::new(),
            ),
            (
                "cubemap",
                include_str!("../../shaders/cubemap.vert"),
                include_str!("../../shaders/cubemap.frag"),
                BTreeMap::new(),
            ),
        ];
        for (name, vertex, fragment, defines) in builtins {
            self.sources
                .entry(name.to_string())
                .or_insert_with(|| StageSource::Inline {
                    vertex: vertex.to_string(),
                    fragment: fragment.to_string(),
                    defines,
                });
        }
    }

    /// Register a program from in-memory sources
    pub fn register_source(
        &mut self,
        name: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
        defines: BTreeMap<String, String>,
    ) {
        self.sources.insert(
            name.into(),
            StageSource::Inline {
                vertex: vertex.into(),
                fragment: fragment.into(),
                defines,
            },
        );
    }

    /// Whether the name is known
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Known program names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Whether the program has been built
    pub fn is_built(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    /// Preprocessed sources of a program
    pub fn build_source(&self, name: &str) -> Result<ShaderSource, ShaderError> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| ShaderError::UnknownShader(name.to_string()))?;

        let (vertex, fragment, defines) = match source {
            StageSource::Files(entry) => (
                self.read_stage(&entry.vertex)?,
                self.read_stage(&entry.fragment)?,
                &entry.defines,
            ),
            StageSource::Inline {
                vertex,
                fragment,
                defines,
            } => (vertex.clone(), fragment.clone(), defines),
        };

        Ok(ShaderSource {
            name: name.to_string(),
            vertex: preprocess(&vertex, defines),
            fragment: preprocess(&fragment, defines),
        })
    }

    fn read_stage(&self, file: &str) -> Result<String, ShaderError> {
        let path = self.base_dir.join(file);
        std::fs::read_to_string(&path).map_err(|source| ShaderError::Io { path, source })
    }

    /// Cached program, built on first request
    pub fn get_or_build(&mut self, device: &mut dyn GraphicsDevice, name: &str) -> Result<ProgramHandle, ShaderError> {
        if let Some(program) = self.programs.get(name) {
            return Ok(*program);
        }
        let source = self.build_source(name)?;
        let program = device.create_program(&source)?;
        log::debug!("Built shader program '{}'", name);
        self.programs.insert(name.to_string(), program);
        Ok(program)
    }

    /// Build every known program, failing on the first error
    pub fn preload_all(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), ShaderError> {
        let names: Vec<String> = self.sources.keys().cloned().collect();
        for name in names {
            self.get_or_build(device, &name)?;
        }
        log::info!("Preloaded {} shader programs", self.programs.len());
        Ok(())
    }

    /// Rebuild every cached program from its sources.
    ///
    /// A program that fails to rebuild keeps its previous version.
    pub fn reload_all(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), ShaderError> {
        let names: Vec<String> = self.programs.keys().cloned().collect();
        let mut first_error = None;
        for name in names {
            let rebuilt = self
                .build_source(&name)
                .and_then(|source| device.create_program(&source).map_err(ShaderError::from));
            match rebuilt {
                Ok(program) => {
                    if let Some(old) = self.programs.insert(name, program) {
                        device.delete_program(old);
                    }
                }
                Err(e) => {
                    log::error!("Reloading shader '{}' failed: {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Delete every built program
    pub fn cleanup(&mut self, device: &mut dyn GraphicsDevice) {
        for (_, program) in self.programs.drain() {
            device.delete_program(program);
        }
        log::info!("Shader programs released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scene_engine_shaders_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_preprocess_places_version_then_defines() {
        let defines = BTreeMap::from([
            ("MAX_LIGHTS".to_string(), "128".to_string()),
            ("USE_FOG".to_string(), "1".to_string()),
        ]);
        let out = preprocess("#version 330 core\nvoid main() {}\n", &defines);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "#version 460 core",
                "#define MAX_LIGHTS 128",
                "#define USE_FOG 1",
                "void main() {}"
            ]
        );
    }

    #[test]
    fn test_manifest_files_are_resolved_relative_to_manifest() {
        let dir = temp_dir("manifest");
        std::fs::write(dir.join("a.vert"), "void main() {}").unwrap();
        std::fs::write(dir.join("a.frag"), "#version 330\nvoid main() {}").unwrap();
        std::fs::write(
            dir.join("shaders.toml"),
            "[shaders.flat]\nvertex = \"a.vert\"\nfragment = \"a.frag\"\ndefines = { N = \"2\" }\n",
        )
        .unwrap();

        let mut manager = ShaderManager::load_manifest(dir.join("shaders.toml")).unwrap();
        let source = manager.build_source("flat").unwrap();
        assert!(source.fragment.starts_with("#version 460 core\n#define N 2\n"));
        assert!(!source.fragment.contains("#version 330"));

        let mut device = RecordingDevice::new();
        let first = manager.get_or_build(&mut device, "flat").unwrap();
        let second = manager.get_or_build(&mut device, "flat").unwrap();
        assert_eq!(first, second);
        assert_eq!(device.live_programs(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_manifest_errors() {
        let dir = temp_dir("errors");
        std::fs::write(dir.join("missing_field.toml"), "[shaders.broken]\nvertex = \"a.vert\"\n").unwrap();
        assert!(matches!(
            ShaderManager::load_manifest(dir.join("missing_field.toml")),
            Err(ShaderError::Manifest(ConfigError::Parse(_)))
        ));
        assert!(matches!(
            ShaderManager::load_manifest(dir.join("absent.toml")),
            Err(ShaderError::Manifest(ConfigError::Io(_)))
        ));

        std::fs::write(
            dir.join("missing_file.toml"),
            "[shaders.ghost]\nvertex = \"nope.vert\"\nfragment = \"nope.frag\"\n",
        )
        .unwrap();
        let mut manager = ShaderManager::load_manifest(dir.join("missing_file.toml")).unwrap();
        let mut device = RecordingDevice::new();
        assert!(matches!(
            manager.get_or_build(&mut device, "ghost"),
            Err(ShaderError::Io { .. })
        ));
        assert!(matches!(
            manager.get_or_build(&mut device, "unknown"),
            Err(ShaderError::UnknownShader(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_builtins_preload_and_cleanup() {
        let mut manager = ShaderManager::with_builtin_shaders();
        let mut device = RecordingDevice::new();
        manager.preload_all(&mut device).unwrap();
        assert_eq!(device.live_programs(), 4);
        for name in ["standard", "sphere", "shadow_depth", "cubemap"] {
            assert!(manager.is_built(name));
        }

        manager.reload_all(&mut device).unwrap();
        assert_eq!(device.live_programs(), 4);

        manager.cleanup(&mut device);
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_compile_failure_is_reported() {
        let mut manager = ShaderManager::with_builtin_shaders();
        let mut device = RecordingDevice::new();
        device.fail_program("cubemap");
        assert!(matches!(
            manager.preload_all(&mut device),
            Err(ShaderError::Device(DeviceError::CompileFailed { .. }))
        ));
    }
}
