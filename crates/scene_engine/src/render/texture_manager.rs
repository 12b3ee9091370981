//! Named GPU textures decoded with the `image` crate
//!
//! Loading never aborts rendering: a texture that cannot be decoded or
//! uploaded is logged and the caller gets `None`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::gpu::{DeviceError, GraphicsDevice, TextureData, TextureHandle};

/// Texture errors
#[derive(Error, Debug)]
pub enum TextureError {
    /// Decoding failed
    #[error("Failed to decode {path}: {source}")]
    Decode {
        /// Source of the image
        path: PathBuf,
        /// Underlying error
        source: image::ImageError,
    },

    /// Cubemap faces differ in size
    #[error("Cubemap faces must share one size, face {face} is {width}x{height}")]
    MismatchedFaces {
        /// Index of the offending face
        face: usize,
        /// Width of that face
        width: u32,
        /// Height of that face
        height: u32,
    },

    /// Device rejected the upload
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Texture registry keyed by name
#[derive(Debug, Default)]
pub struct TextureManager {
    base_dir: PathBuf,
    textures: HashMap<String, TextureHandle>,
}

impl TextureManager {
    /// Create an empty manager resolving relative paths from the working
    /// directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager resolving relative paths from `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            textures: HashMap::new(),
        }
    }

    /// Decode an image file to RGBA8
    pub fn decode_file(path: &Path) -> Result<TextureData, TextureError> {
        let img = image::open(path).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(TextureData {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// Decode an encoded image held in memory
    pub fn decode_memory(bytes: &[u8]) -> Result<TextureData, TextureError> {
        let img = image::load_from_memory(bytes).map_err(|source| TextureError::Decode {
            path: PathBuf::from("<memory>"),
            source,
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(TextureData {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// Load a 2D texture and register it under `name`.
    ///
    /// A texture previously registered under the same name is deleted.
    pub fn load_texture(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
        name: &str,
    ) -> Option<TextureHandle> {
        let path = self.base_dir.join(path.as_ref());
        let result = Self::decode_file(&path).and_then(|data| self.upload(device, &data, name));
        match result {
            Ok(handle) => {
                log::debug!("Loaded texture '{}' from {}", name, path.display());
                Some(handle)
            }
            Err(e) => {
                log::warn!("TextureManager: failed to load texture '{}': {}", name, e);
                None
            }
        }
    }

    /// Decode an encoded image from memory and register it under `name`
    pub fn load_from_memory(
        &mut self,
        device: &mut dyn GraphicsDevice,
        bytes: &[u8],
        name: &str,
    ) -> Option<TextureHandle> {
        match Self::decode_memory(bytes).and_then(|data| self.upload(device, &data, name)) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("TextureManager: failed to load texture '{}': {}", name, e);
                None
            }
        }
    }

    /// Register already decoded pixels under `name`
    pub fn insert(
        &mut self,
        device: &mut dyn GraphicsDevice,
        data: &TextureData,
        name: &str,
    ) -> Result<TextureHandle, TextureError> {
        self.upload(device, data, name)
    }

    /// Load six faces (+X, -X, +Y, -Y, +Z, -Z) into a cubemap
    pub fn load_cubemap<P: AsRef<Path>>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        faces: &[P; 6],
        name: &str,
    ) -> Option<TextureHandle> {
        let result = self.build_cubemap(device, faces);
        match result {
            Ok(handle) => {
                self.replace(device, name, handle);
                log::debug!("Loaded cubemap '{}'", name);
                Some(handle)
            }
            Err(e) => {
                log::warn!("TextureManager: failed to load cubemap '{}': {}", name, e);
                None
            }
        }
    }

    fn build_cubemap<P: AsRef<Path>>(
        &self,
        device: &mut dyn GraphicsDevice,
        faces: &[P; 6],
    ) -> Result<TextureHandle, TextureError> {
        let mut decoded = Vec::with_capacity(6);
        for face in faces {
            decoded.push(Self::decode_file(&self.base_dir.join(face.as_ref()))?);
        }
        let (width, height) = (decoded[0].width, decoded[0].height);
        if let Some((face, data)) = decoded
            .iter()
            .enumerate()
            .find(|(_, d)| d.width != width || d.height != height)
        {
            return Err(TextureError::MismatchedFaces {
                face,
                width: data.width,
                height: data.height,
            });
        }

        let faces: [TextureData; 6] = match decoded.try_into() {
            Ok(faces) => faces,
            Err(_) => unreachable!("six faces were decoded"),
        };
        Ok(device.create_cubemap(&faces)?)
    }

    fn upload(
        &mut self,
        device: &mut dyn GraphicsDevice,
        data: &TextureData,
        name: &str,
    ) -> Result<TextureHandle, TextureError> {
        let handle = device.create_texture_2d(data)?;
        self.replace(device, name, handle);
        Ok(handle)
    }

    fn replace(&mut self, device: &mut dyn GraphicsDevice, name: &str, handle: TextureHandle) {
        if let Some(old) = self.textures.insert(name.to_string(), handle) {
            device.delete_texture(old);
        }
    }

    /// Texture registered under `name`
    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    /// Number of registered textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Delete one texture
    pub fn delete_texture(&mut self, device: &mut dyn GraphicsDevice, name: &str) -> bool {
        match self.textures.remove(name) {
            Some(handle) => {
                device.delete_texture(handle);
                true
            }
            None => false,
        }
    }

    /// Delete every texture
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) {
        let count = self.textures.len();
        for (_, handle) in self.textures.drain() {
            device.delete_texture(handle);
        }
        log::info!("Released {} textures", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{RecordingDevice, TextureKind};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scene_engine_textures_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, size: u32, color: [u8; 4]) {
        image::RgbaImage::from_pixel(size, size, image::Rgba(color))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_load_and_replace_texture() {
        let dir = temp_dir("load");
        write_png(&dir.join("red.png"), 4, [255, 0, 0, 255]);
        write_png(&dir.join("blue.png"), 2, [0, 0, 255, 255]);

        let mut device = RecordingDevice::new();
        let mut manager = TextureManager::with_base_dir(&dir);

        let red = manager.load_texture(&mut device, "red.png", "crate").unwrap();
        assert_eq!(device.texture_size(red), Some((4, 4)));
        assert_eq!(manager.get("crate"), Some(red));

        let blue = manager.load_texture(&mut device, "blue.png", "crate").unwrap();
        assert_ne!(red, blue);
        assert_eq!(device.live_textures(), 1);

        manager.release_all(&mut device);
        assert_eq!(device.live_textures(), 0);
        assert!(manager.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_returns_none() {
        let mut device = RecordingDevice::new();
        let mut manager = TextureManager::new();
        assert!(manager
            .load_texture(&mut device, "definitely/not/here.png", "ghost")
            .is_none());
        assert!(manager.get("ghost").is_none());
        assert!(manager.load_from_memory(&mut device, b"not an image", "junk").is_none());
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_cubemap_faces() {
        let dir = temp_dir("cubemap");
        let names = ["px.png", "nx.png", "py.png", "ny.png", "pz.png", "nz.png"];
        for name in names {
            write_png(&dir.join(name), 2, [10, 20, 30, 255]);
        }

        let mut device = RecordingDevice::new();
        let mut manager = TextureManager::with_base_dir(&dir);
        let sky = manager.load_cubemap(&mut device, &names, "sky").unwrap();
        assert_eq!(device.texture_kind(sky), Some(TextureKind::Cubemap));

        write_png(&dir.join("nz.png"), 4, [10, 20, 30, 255]);
        assert!(manager.load_cubemap(&mut device, &names, "sky2").is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
