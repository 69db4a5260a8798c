//! Scene kernel: the entity arena, observer dispatch and per-frame context.
//!
//! The [`Scene`] owns every entity. Components reference each other through
//! `(entity, kind)` handles, and [`Scene::notify`] pushes a change through the
//! observer graph synchronously, depth first.
//!
//! # Invariants
//! - Awake runs exactly once per scene, before the first frame.
//! - The observer graph stays acyclic; edges run parent to child only.
//! - Moving, orbiting or resetting a transform notifies before returning.
//! - Accumulating rotation does not notify.
//! - No global state: [`FrameClock`] and [`CameraDirector`] are plain values
//!   handed to whoever drives the frame.

pub mod clock;
pub mod director;
pub mod error;
pub mod scene;

pub use clock::FrameClock;
pub use director::CameraDirector;
pub use error::SceneError;
pub use scene::Scene;

pub fn crate_info() -> &'static str {
    "ember-kernel v0.1.0"
}

#[cfg(test)]
pub(crate) mod tests {
    use ember_common::{
        BufferHandle, DeviceError, MeshHandle, ResourceDevice, ShaderHandle, ShaderProgram,
        TextureHandle,
    };

    /// Device that accepts every upload and hands back handle 0.
    pub struct NullDevice;

    impl ResourceDevice for NullDevice {
        fn create_mesh(&mut self, _: &str, _: &[u8], _: u32, _: &[u32]) -> Result<MeshHandle, DeviceError> {
            Ok(MeshHandle(0))
        }

        fn create_vertex_buffer(&mut self, _: &str, _: &[u8], _: u32) -> Result<BufferHandle, DeviceError> {
            Ok(BufferHandle(0))
        }

        fn create_instance_buffer(&mut self, _: &str, _: &[u8], _: u32) -> Result<BufferHandle, DeviceError> {
            Ok(BufferHandle(0))
        }

        fn create_texture(&mut self, _: &str, _: u32, _: u32, _: &[u8]) -> Result<TextureHandle, DeviceError> {
            Ok(TextureHandle(0))
        }

        fn shader(&mut self, _: ShaderProgram) -> Result<ShaderHandle, DeviceError> {
            Ok(ShaderHandle(0))
        }
    }
}
