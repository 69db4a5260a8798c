use crate::constants::ConstantBuffer;
use crate::error::RenderError;
use ember_common::{BufferHandle, MeshHandle, ResourceDevice, ShaderHandle, TextureHandle};
use ember_ecs::BlendMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShadowMap {
    Sun,
    Moon,
}

/// Offscreen colour textures owned by the backend and sized to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetTexture {
    GBufferDiffuse,
    GBufferNormal,
    GBufferEmissive,
    LightOutput,
    BrightOutput,
    BlurOutput,
}

/// What a draw writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargets {
    /// The swap-chain image, no depth.
    BackBuffer,
    /// The three G-buffer colour targets plus the main depth buffer.
    GBuffer,
    /// Depth only, colour unbound.
    Shadow(ShadowMap),
    /// A single offscreen colour target, no depth.
    Offscreen(TargetTexture),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColourTarget {
    BackBuffer,
    GBuffer,
    Offscreen(TargetTexture),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthTarget {
    Main,
    Shadow(ShadowMap),
}

/// A texture bound for sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderResource {
    #[default]
    None,
    Texture(TextureHandle),
    Target(TargetTexture),
    ShadowDepth(ShadowMap),
}

impl From<Option<TextureHandle>> for ShaderResource {
    fn from(texture: Option<TextureHandle>) -> Self {
        texture.map_or(Self::None, Self::Texture)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RasterState {
    #[default]
    Solid,
    Wireframe,
    /// Solid fill for full-screen quads.
    Quad,
}

/// Command surface the deferred renderer drives.
///
/// State set through this trait persists until changed, like an immediate
/// context: a draw uses whatever targets, shader, buffers and resources are
/// bound at the time it is issued.
pub trait RenderBackend: ResourceDevice {
    /// Whether a presentable surface is attached.
    fn has_swap_chain(&self) -> bool;

    fn viewport(&self) -> (u32, u32);

    /// Rebuild every size-dependent target.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    fn clear_colour(&mut self, target: ColourTarget, colour: [f32; 4]);

    fn clear_depth(&mut self, target: DepthTarget);

    /// Replace the contents of a constant buffer. Draws issued after this
    /// call observe the new contents; earlier draws keep the old ones.
    fn upload(&mut self, buffer: ConstantBuffer, bytes: &[u8]) -> Result<(), RenderError>;

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: ConstantBuffer);

    fn set_raster_state(&mut self, state: RasterState);

    fn set_depth_test(&mut self, enabled: bool);

    fn set_blend(&mut self, blend: Option<BlendMode>);

    fn bind_render_targets(&mut self, targets: RenderTargets);

    fn bind_shader_resource(&mut self, stage: ShaderStage, slot: u32, resource: ShaderResource);

    /// Drop all bound targets and sampled resources.
    fn unbind_all(&mut self);

    fn use_shader(&mut self, shader: ShaderHandle);

    fn set_mesh(&mut self, mesh: MeshHandle);

    fn set_vertex_buffer(&mut self, buffer: BufferHandle);

    fn set_instance_buffer(&mut self, slot: u32, buffer: BufferHandle);

    fn draw_indexed(&mut self, index_count: u32);

    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32);

    fn draw(&mut self, vertex_count: u32);

    fn generate_mips(&mut self, target: TargetTexture);

    /// Submit the frame. A failure means the device is gone.
    fn present(&mut self) -> Result<(), RenderError>;
}
