//! Deferred renderer: backend-agnostic pass orchestration.
//!
//! [`DeferredRenderer`] walks an awake [`ember_kernel::Scene`] and drives a
//! fixed pass sequence (G-buffer with sun and moon shadow maps, optional
//! particles, light, bright, two-way blur, composite) through the
//! [`RenderBackend`] trait. The wgpu implementation lives in
//! `ember-render-wgpu`; [`RecordingBackend`] records commands for tests and
//! tooling.
//!
//! # Invariants
//! - The renderer never mutates the scene.
//! - Constant buffer slots are fixed per buffer; see [`ConstantBuffer::slot`].
//! - At most two lights cast shadows; extras are ignored with a warning.
//! - A failed upload or present aborts the frame; nothing is retried.

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod lighting;
pub mod modes;
pub mod recording;
pub mod renderer;

pub use backend::{
    ColourTarget, DepthTarget, RasterState, RenderBackend, RenderTargets, ShaderResource,
    ShaderStage, ShadowMap, TargetTexture,
};
pub use config::{CORNFLOWER_BLUE, RendererConfig};
pub use constants::ConstantBuffer;
pub use error::RenderError;
pub use modes::{MrtMode, RenderMode};
pub use recording::{Command, DrawRecord, RecordingBackend};
pub use renderer::{DeferredRenderer, FrameStats, MAX_LIGHTS, PassQuads};

pub fn crate_info() -> &'static str {
    "ember-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
