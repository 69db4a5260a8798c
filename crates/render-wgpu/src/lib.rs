//! wgpu backend for the ember deferred renderer.
//!
//! [`WgpuBackend`] implements [`ember_render::RenderBackend`] and
//! [`ember_common::ResourceDevice`]. Calls are recorded and replayed as render
//! passes when the frame is presented.
//!
//! # Invariants
//! - Every draw sees the constant buffer contents current when it was issued.
//! - Uniform slot `n` in either stage maps to binding `n` of its bind group.
//! - Pipelines are created once per key and reused across frames.
//! - A lost or outdated surface skips the frame; it is not an error.

mod frame;
mod gpu;
mod pipelines;
mod shaders;
mod targets;
mod uniforms;

pub use gpu::{BackendSettings, SurfaceBinding, WgpuBackend};
pub use shaders::ShaderModuleKind;

pub fn crate_info() -> &'static str {
    "ember-render-wgpu v0.1.0"
}
