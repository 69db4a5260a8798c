use crate::types::{BufferHandle, MeshHandle, ShaderHandle, ShaderProgram, TextureHandle};

/// Errors raised while creating device resources.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to create {what}: {reason}")]
    Creation { what: String, reason: String },
    #[error("shader program {0} is not available on this device")]
    UnsupportedProgram(ShaderProgram),
    #[error("invalid resource data for {what}: {reason}")]
    InvalidData { what: String, reason: String },
}

impl DeviceError {
    pub fn creation(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Creation {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Resource-creation side of a GPU device.
///
/// Scene loading and the awake hooks of components only ever create
/// resources; command recording lives on the renderer's backend trait.
pub trait ResourceDevice {
    /// Upload a mesh. `vertices` is raw vertex data laid out with `stride`.
    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[u8],
        stride: u32,
        indices: &[u32],
    ) -> Result<MeshHandle, DeviceError>;

    /// Upload a plain vertex stream (particle quads).
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        data: &[u8],
        stride: u32,
    ) -> Result<BufferHandle, DeviceError>;

    /// Upload a per-instance stream.
    fn create_instance_buffer(
        &mut self,
        label: &str,
        data: &[u8],
        stride: u32,
    ) -> Result<BufferHandle, DeviceError>;

    /// Upload an RGBA8 texture.
    fn create_texture(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureHandle, DeviceError>;

    /// Resolve a compiled shader program. Repeated requests return the same handle.
    fn shader(&mut self, program: ShaderProgram) -> Result<ShaderHandle, DeviceError>;
}
