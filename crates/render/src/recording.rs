//! A backend that performs no GPU work and records every command instead.
//!
//! Used by tests and by the CLI to inspect a frame. Upload, present and
//! swap-chain failures can be injected.

use crate::backend::{
    ColourTarget, DepthTarget, RasterState, RenderBackend, RenderTargets, ShaderResource,
    ShaderStage, TargetTexture,
};
use crate::constants::ConstantBuffer;
use crate::error::RenderError;
use ember_common::{
    BufferHandle, DeviceError, MeshHandle, ResourceDevice, ShaderHandle, ShaderProgram,
    TextureHandle,
};
use ember_ecs::BlendMode;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Resize { width: u32, height: u32 },
    ClearColour(ColourTarget),
    ClearDepth(DepthTarget),
    Upload(ConstantBuffer),
    BindConstant {
        stage: ShaderStage,
        slot: u32,
        buffer: ConstantBuffer,
    },
    Raster(RasterState),
    DepthTest(bool),
    Blend(Option<BlendMode>),
    Targets(RenderTargets),
    Resource {
        stage: ShaderStage,
        slot: u32,
        resource: ShaderResource,
    },
    UnbindAll,
    UseShader(ShaderHandle),
    Mesh(MeshHandle),
    VertexBuffer(BufferHandle),
    InstanceBuffer { slot: u32, buffer: BufferHandle },
    DrawIndexed { index_count: u32 },
    DrawIndexedInstanced { index_count: u32, instance_count: u32 },
    Draw { vertex_count: u32 },
    GenerateMips(TargetTexture),
    Present,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload(buffer) => write!(f, "upload {buffer}"),
            Self::BindConstant { stage, slot, buffer } => {
                write!(f, "bind {buffer} -> {stage:?}[{slot}]")
            }
            Self::Resource {
                stage,
                slot,
                resource,
            } => write!(f, "resource {resource:?} -> {stage:?}[{slot}]"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One draw with the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub targets: Option<RenderTargets>,
    pub program: Option<ShaderProgram>,
    pub instances: u32,
    pub count: u32,
    pub indexed: bool,
}

#[derive(Debug)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    uploads: BTreeMap<ConstantBuffer, Vec<u8>>,
    programs: BTreeMap<u32, ShaderProgram>,
    width: u32,
    height: u32,
    next_handle: u32,
    swap_chain: bool,
    fail_upload: Option<ConstantBuffer>,
    fail_present: bool,
    fail_program: Option<ShaderProgram>,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            commands: Vec::new(),
            uploads: BTreeMap::new(),
            programs: BTreeMap::new(),
            width,
            height,
            next_handle: 0,
            swap_chain: true,
            fail_upload: None,
            fail_present: false,
            fail_program: None,
        }
    }

    pub fn without_swap_chain(mut self) -> Self {
        self.swap_chain = false;
        self
    }

    pub fn fail_upload_of(&mut self, buffer: ConstantBuffer) {
        self.fail_upload = Some(buffer);
    }

    pub fn fail_present(&mut self) {
        self.fail_present = true;
    }

    pub fn fail_program(&mut self, program: ShaderProgram) {
        self.fail_program = Some(program);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// The bytes of the most recent upload to `buffer`.
    pub fn last_upload(&self, buffer: ConstantBuffer) -> Option<&[u8]> {
        self.uploads.get(&buffer).map(Vec::as_slice)
    }

    /// Decode the most recent upload to `buffer` as `T`.
    pub fn last_upload_as<T: bytemuck::Pod>(&self, buffer: ConstantBuffer) -> Option<T> {
        self.last_upload(buffer)
            .and_then(|bytes| bytemuck::try_pod_read_unaligned(bytes).ok())
    }

    pub fn program_of(&self, shader: ShaderHandle) -> Option<ShaderProgram> {
        self.programs.get(&shader.0).copied()
    }

    /// Every draw in recording order together with the targets and shader
    /// bound when it was issued.
    pub fn draws(&self) -> Vec<DrawRecord> {
        let mut targets = None;
        let mut program = None;
        let mut out = Vec::new();
        for command in &self.commands {
            match *command {
                Command::Targets(t) => targets = Some(t),
                Command::UnbindAll => targets = None,
                Command::UseShader(s) => program = self.program_of(s),
                Command::DrawIndexed { index_count } => out.push(DrawRecord {
                    targets,
                    program,
                    instances: 1,
                    count: index_count,
                    indexed: true,
                }),
                Command::DrawIndexedInstanced {
                    index_count,
                    instance_count,
                } => out.push(DrawRecord {
                    targets,
                    program,
                    instances: instance_count,
                    count: index_count,
                    indexed: true,
                }),
                Command::Draw { vertex_count } => out.push(DrawRecord {
                    targets,
                    program,
                    instances: 1,
                    count: vertex_count,
                    indexed: false,
                }),
                _ => {}
            }
        }
        out
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Streams must hold at least one whole element, as a GPU buffer would.
fn check_stream(label: &str, data: &[u8], stride: u32) -> Result<(), DeviceError> {
    if data.is_empty() || stride == 0 || data.len() % stride as usize != 0 {
        return Err(DeviceError::InvalidData {
            what: label.to_string(),
            reason: format!("{} bytes do not form whole {stride}-byte elements", data.len()),
        });
    }
    Ok(())
}

impl ResourceDevice for RecordingBackend {
    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[u8],
        stride: u32,
        indices: &[u32],
    ) -> Result<MeshHandle, DeviceError> {
        if stride == 0 || vertices.len() % stride as usize != 0 {
            return Err(DeviceError::InvalidData {
                what: label.to_string(),
                reason: format!("{} vertex bytes do not divide into stride {stride}", vertices.len()),
            });
        }
        tracing::trace!(label, indices = indices.len(), "mesh recorded");
        Ok(MeshHandle(self.next()))
    }

    fn create_vertex_buffer(&mut self, label: &str, data: &[u8], stride: u32) -> Result<BufferHandle, DeviceError> {
        check_stream(label, data, stride)?;
        Ok(BufferHandle(self.next()))
    }

    fn create_instance_buffer(&mut self, label: &str, data: &[u8], stride: u32) -> Result<BufferHandle, DeviceError> {
        check_stream(label, data, stride)?;
        Ok(BufferHandle(self.next()))
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<TextureHandle, DeviceError> {
        if rgba.len() != (width * height * 4) as usize {
            return Err(DeviceError::InvalidData {
                what: label.to_string(),
                reason: format!("expected {} bytes for {width}x{height}", width * height * 4),
            });
        }
        Ok(TextureHandle(self.next()))
    }

    fn shader(&mut self, program: ShaderProgram) -> Result<ShaderHandle, DeviceError> {
        if self.fail_program == Some(program) {
            return Err(DeviceError::UnsupportedProgram(program));
        }
        let handle = ShaderHandle(program as u32);
        self.programs.insert(handle.0, program);
        Ok(handle)
    }
}

impl RenderBackend for RecordingBackend {
    fn has_swap_chain(&self) -> bool {
        self.swap_chain
    }

    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.width = width;
        self.height = height;
        self.commands.push(Command::Resize { width, height });
        Ok(())
    }

    fn clear_colour(&mut self, target: ColourTarget, _colour: [f32; 4]) {
        self.commands.push(Command::ClearColour(target));
    }

    fn clear_depth(&mut self, target: DepthTarget) {
        self.commands.push(Command::ClearDepth(target));
    }

    fn upload(&mut self, buffer: ConstantBuffer, bytes: &[u8]) -> Result<(), RenderError> {
        if self.fail_upload == Some(buffer) {
            return Err(RenderError::ConstantBufferUpdate {
                buffer,
                reason: "injected failure".into(),
            });
        }
        self.uploads.insert(buffer, bytes.to_vec());
        self.commands.push(Command::Upload(buffer));
        Ok(())
    }

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: ConstantBuffer) {
        self.commands.push(Command::BindConstant {
            stage,
            slot,
            buffer,
        });
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.commands.push(Command::Raster(state));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.commands.push(Command::DepthTest(enabled));
    }

    fn set_blend(&mut self, blend: Option<BlendMode>) {
        self.commands.push(Command::Blend(blend));
    }

    fn bind_render_targets(&mut self, targets: RenderTargets) {
        self.commands.push(Command::Targets(targets));
    }

    fn bind_shader_resource(&mut self, stage: ShaderStage, slot: u32, resource: ShaderResource) {
        self.commands.push(Command::Resource {
            stage,
            slot,
            resource,
        });
    }

    fn unbind_all(&mut self) {
        self.commands.push(Command::UnbindAll);
    }

    fn use_shader(&mut self, shader: ShaderHandle) {
        self.commands.push(Command::UseShader(shader));
    }

    fn set_mesh(&mut self, mesh: MeshHandle) {
        self.commands.push(Command::Mesh(mesh));
    }

    fn set_vertex_buffer(&mut self, buffer: BufferHandle) {
        self.commands.push(Command::VertexBuffer(buffer));
    }

    fn set_instance_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.commands.push(Command::InstanceBuffer { slot, buffer });
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.commands.push(Command::DrawIndexed { index_count });
    }

    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32) {
        self.commands.push(Command::DrawIndexedInstanced {
            index_count,
            instance_count,
        });
    }

    fn draw(&mut self, vertex_count: u32) {
        self.commands.push(Command::Draw { vertex_count });
    }

    fn generate_mips(&mut self, target: TargetTexture) {
        self.commands.push(Command::GenerateMips(target));
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if self.fail_present {
            return Err(RenderError::Present("injected device loss".into()));
        }
        self.commands.push(Command::Present);
        Ok(())
    }
}
