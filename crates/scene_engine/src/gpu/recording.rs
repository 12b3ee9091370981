//! Headless graphics device that records commands

use std::collections::{BTreeMap, HashMap, HashSet};

use slotmap::SlotMap;

use super::{
    ClearFlags, CullFace, DepthFunc, DepthTarget, DeviceError, FramebufferHandle, GpuMesh,
    GraphicsDevice, MeshHandle, ProgramHandle, ShaderSource, TextureData, TextureHandle,
    UniformValue, Viewport,
};
use crate::render::Vertex;

/// Kind of texture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// 2D color texture
    Texture2D,
    /// Six-face cubemap
    Cubemap,
    /// Depth attachment
    Depth,
}

/// One recorded state change or draw
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Program made current
    UseProgram(ProgramHandle),
    /// Framebuffer bound
    BindFramebuffer(Option<FramebufferHandle>),
    /// Viewport set
    SetViewport(Viewport),
    /// Framebuffer cleared
    Clear(ClearFlags),
    /// Cull mode set
    SetCullFace(CullFace),
    /// Depth func set
    SetDepthFunc(DepthFunc),
    /// Texture bound to a unit
    BindTexture {
        /// Sampler unit
        slot: u32,
        /// Texture
        texture: TextureHandle,
    },
    /// Indexed draw
    Draw {
        /// Mesh drawn
        mesh: MeshHandle,
        /// Index into [`RecordingDevice::draws`]
        record: usize,
    },
}

/// Snapshot of the pipeline state at a draw call
#[derive(Debug, Clone)]
pub struct DrawRecord {
    /// Name of the bound program
    pub program: String,
    /// Bound framebuffer, `None` for the default one
    pub framebuffer: Option<FramebufferHandle>,
    /// Mesh drawn
    pub mesh: MeshHandle,
    /// Index count drawn
    pub index_count: u32,
    /// Uniforms of the bound program at draw time
    pub uniforms: HashMap<String, UniformValue>,
    /// Texture units at draw time
    pub textures: BTreeMap<u32, TextureHandle>,
    /// Cull mode at draw time
    pub cull_face: CullFace,
    /// Depth func at draw time
    pub depth_func: DepthFunc,
}

impl DrawRecord {
    /// Uniform value by name
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }
}

#[derive(Debug)]
struct ProgramRecord {
    name: String,
    uniforms: HashMap<String, UniformValue>,
}

#[derive(Debug)]
struct MeshRecord {
    vertex_count: usize,
    index_count: u32,
}

#[derive(Debug)]
struct TextureRecord {
    kind: TextureKind,
    width: u32,
    height: u32,
    version: u64,
}

/// Headless [`GraphicsDevice`].
///
/// Resources live in slot maps so stale handles never alias new ones. Every
/// draw or clear into an off-screen framebuffer bumps the content version of
/// its depth texture.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    programs: SlotMap<ProgramHandle, ProgramRecord>,
    meshes: SlotMap<MeshHandle, MeshRecord>,
    textures: SlotMap<TextureHandle, TextureRecord>,
    framebuffers: SlotMap<FramebufferHandle, TextureHandle>,

    current_program: Option<ProgramHandle>,
    current_framebuffer: Option<FramebufferHandle>,
    bound_textures: BTreeMap<u32, TextureHandle>,
    viewport: Option<Viewport>,
    cull_face: CullFace,
    depth_func: DepthFunc,

    commands: Vec<DeviceCommand>,
    draws: Vec<DrawRecord>,
    failing_programs: HashSet<String>,
}

impl RecordingDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_program` fail for the named program
    pub fn fail_program(&mut self, name: impl Into<String>) {
        self.failing_programs.insert(name.into());
    }

    /// Recorded commands since the last [`RecordingDevice::clear_log`]
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Recorded draws since the last [`RecordingDevice::clear_log`]
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Draws that targeted the given framebuffer
    pub fn draws_into(&self, framebuffer: Option<FramebufferHandle>) -> impl Iterator<Item = &DrawRecord> {
        self.draws.iter().filter(move |d| d.framebuffer == framebuffer)
    }

    /// Forget recorded commands and draws, keeping resources and state
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    /// Number of live programs
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of live meshes
    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Number of live textures, depth textures included
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of live framebuffers
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// Name of a live program
    pub fn program_name(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(program).map(|p| p.name.as_str())
    }

    /// Kind of a live texture
    pub fn texture_kind(&self, texture: TextureHandle) -> Option<TextureKind> {
        self.textures.get(texture).map(|t| t.kind)
    }

    /// Size of a live texture
    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(texture).map(|t| (t.width, t.height))
    }

    /// Content version of a texture, bumped on every write into it
    pub fn texture_version(&self, texture: TextureHandle) -> Option<u64> {
        self.textures.get(texture).map(|t| t.version)
    }

    /// Vertex and index counts of a live mesh
    pub fn mesh_counts(&self, mesh: MeshHandle) -> Option<(usize, u32)> {
        self.meshes.get(mesh).map(|m| (m.vertex_count, m.index_count))
    }

    /// Current viewport
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Current cull mode
    pub fn cull_face(&self) -> CullFace {
        self.cull_face
    }

    /// Currently bound framebuffer
    pub fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.current_framebuffer
    }

    fn touch_bound_target(&mut self) {
        let Some(texture) = self
            .current_framebuffer
            .and_then(|fb| self.framebuffers.get(fb).copied())
        else {
            return;
        };
        if let Some(texture) = self.textures.get_mut(texture) {
            texture.version += 1;
        }
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramHandle, DeviceError> {
        if source.vertex.trim().is_empty() || source.fragment.trim().is_empty() {
            return Err(DeviceError::CompileFailed {
                name: source.name.clone(),
                log: "empty shader stage".to_string(),
            });
        }
        if self.failing_programs.contains(&source.name) {
            return Err(DeviceError::CompileFailed {
                name: source.name.clone(),
                log: "compilation failure requested".to_string(),
            });
        }
        let handle = self.programs.insert(ProgramRecord {
            name: source.name.clone(),
            uniforms: HashMap::new(),
        });
        log::debug!("Program '{}' created as {:?}", source.name, handle);
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(program).is_none() {
            log::warn!("Deleting unknown program {:?}", program);
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        match self.current_program.and_then(|p| self.programs.get_mut(p)) {
            Some(program) => {
                program.uniforms.insert(name.to_string(), value);
            }
            None => log::trace!("Uniform '{}' set with no program bound", name),
        }
    }

    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<GpuMesh, DeviceError> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(DeviceError::ResourceCreation("empty mesh".to_string()));
        }
        let index_count = u32::try_from(indices.len())
            .map_err(|_| DeviceError::ResourceCreation("too many indices".to_string()))?;
        let handle = self.meshes.insert(MeshRecord {
            vertex_count: vertices.len(),
            index_count,
        });
        Ok(GpuMesh { handle, index_count })
    }

    fn delete_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(mesh).is_none() {
            log::warn!("Deleting unknown mesh {:?}", mesh);
        }
    }

    fn draw_indexed(&mut self, mesh: &GpuMesh) {
        let program = self
            .current_program
            .and_then(|p| self.programs.get(p))
            .map(|p| (p.name.clone(), p.uniforms.clone()))
            .unwrap_or_default();

        let record = self.draws.len();
        self.draws.push(DrawRecord {
            program: program.0,
            framebuffer: self.current_framebuffer,
            mesh: mesh.handle,
            index_count: mesh.index_count,
            uniforms: program.1,
            textures: self.bound_textures.clone(),
            cull_face: self.cull_face,
            depth_func: self.depth_func,
        });
        self.commands.push(DeviceCommand::Draw {
            mesh: mesh.handle,
            record,
        });
        self.touch_bound_target();
    }

    fn create_texture_2d(&mut self, data: &TextureData) -> Result<TextureHandle, DeviceError> {
        data.validate()?;
        Ok(self.textures.insert(TextureRecord {
            kind: TextureKind::Texture2D,
            width: data.width,
            height: data.height,
            version: 1,
        }))
    }

    fn create_cubemap(&mut self, faces: &[TextureData; 6]) -> Result<TextureHandle, DeviceError> {
        for face in faces {
            face.validate()?;
        }
        Ok(self.textures.insert(TextureRecord {
            kind: TextureKind::Cubemap,
            width: faces[0].width,
            height: faces[0].height,
            version: 1,
        }))
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureHandle) {
        self.bound_textures.insert(slot, texture);
        self.commands.push(DeviceCommand::BindTexture { slot, texture });
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(texture).is_none() {
            log::warn!("Deleting unknown texture {:?}", texture);
        }
        self.bound_textures.retain(|_, t| *t != texture);
    }

    fn create_depth_target(&mut self, resolution: u32) -> Result<DepthTarget, DeviceError> {
        if resolution == 0 {
            return Err(DeviceError::ResourceCreation(
                "depth target resolution must be non-zero".to_string(),
            ));
        }
        let texture = self.textures.insert(TextureRecord {
            kind: TextureKind::Depth,
            width: resolution,
            height: resolution,
            version: 0,
        });
        let framebuffer = self.framebuffers.insert(texture);
        Ok(DepthTarget {
            framebuffer,
            texture,
            resolution,
        })
    }

    fn delete_depth_target(&mut self, target: DepthTarget) {
        self.framebuffers.remove(target.framebuffer);
        self.textures.remove(target.texture);
        if self.current_framebuffer == Some(target.framebuffer) {
            self.current_framebuffer = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.current_framebuffer = framebuffer;
        self.commands.push(DeviceCommand::BindFramebuffer(framebuffer));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.commands.push(DeviceCommand::SetViewport(viewport));
    }

    fn clear(&mut self, flags: ClearFlags, _color: [f32; 4]) {
        self.commands.push(DeviceCommand::Clear(flags));
        if flags.contains(ClearFlags::DEPTH) {
            self.touch_bound_target();
        }
    }

    fn set_cull_face(&mut self, face: CullFace) {
        self.cull_face = face;
        self.commands.push(DeviceCommand::SetCullFace(face));
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.depth_func = func;
        self.commands.push(DeviceCommand::SetDepthFunc(func));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn source(name: &str) -> ShaderSource {
        ShaderSource {
            name: name.to_string(),
            vertex: "void main() {}".to_string(),
            fragment: "void main() {}".to_string(),
        }
    }

    fn triangle(device: &mut RecordingDevice) -> GpuMesh {
        let vertices = vec![Vertex::default(); 3];
        device.create_mesh(&vertices, &[0, 1, 2]).unwrap()
    }

    #[test]
    fn test_uniforms_are_per_program() {
        let mut device = RecordingDevice::new();
        let a = device.create_program(&source("a")).unwrap();
        let b = device.create_program(&source("b")).unwrap();
        let mesh = triangle(&mut device);

        device.use_program(a);
        device.set_float("value", 1.0);
        device.use_program(b);
        device.set_vec3("color", &Vec3::new(1.0, 0.0, 0.0));
        device.draw_indexed(&mesh);
        device.use_program(a);
        device.draw_indexed(&mesh);

        let draws = device.draws();
        assert_eq!(draws[0].program, "b");
        assert!(draws[0].uniform("value").is_none());
        assert_eq!(draws[1].uniform("value"), Some(&UniformValue::Float(1.0)));
    }

    #[test]
    fn test_compile_failures() {
        let mut device = RecordingDevice::new();
        device.fail_program("broken");
        assert!(matches!(
            device.create_program(&source("broken")),
            Err(DeviceError::CompileFailed { .. })
        ));

        let empty = ShaderSource {
            vertex: String::new(),
            ..source("empty")
        };
        assert!(device.create_program(&empty).is_err());
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_depth_target_version_tracks_writes() {
        let mut device = RecordingDevice::new();
        let target = device.create_depth_target(64).unwrap();
        let mesh = triangle(&mut device);
        assert_eq!(device.texture_version(target.texture), Some(0));

        device.draw_indexed(&mesh);
        assert_eq!(device.texture_version(target.texture), Some(0));

        device.bind_framebuffer(Some(target.framebuffer));
        device.clear(ClearFlags::DEPTH, [0.0; 4]);
        device.draw_indexed(&mesh);
        assert_eq!(device.texture_version(target.texture), Some(2));

        device.delete_depth_target(target);
        assert_eq!(device.live_framebuffers(), 0);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.bound_framebuffer(), None);
    }

    #[test]
    fn test_texture_validation() {
        let mut device = RecordingDevice::new();
        let bad = TextureData {
            width: 2,
            height: 2,
            pixels: vec![0; 3],
        };
        assert!(matches!(device.create_texture_2d(&bad), Err(DeviceError::InvalidTexture(_))));

        let good = TextureData {
            width: 1,
            height: 1,
            pixels: vec![255; 4],
        };
        let texture = device.create_texture_2d(&good).unwrap();
        assert_eq!(device.texture_kind(texture), Some(TextureKind::Texture2D));
    }
}
