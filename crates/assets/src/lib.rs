//! Scene assets: JSON scene descriptions, built-in primitive meshes and
//! content-addressed uploads.
//!
//! Meshes and textures are identified by a hash of their bytes, so a scene
//! naming the same primitive many times uploads it once.
//!
//! # Invariants
//! - Building never awakes the scene; [`load_scene`] does both.
//! - Entity names are unique within a description.
//! - Entity ids follow listing order.

pub mod builder;
pub mod description;
pub mod error;
pub mod library;
pub mod primitives;

pub use builder::{BuiltScene, build_scene, load_scene};
pub use description::{
    BlendDescription, CameraDescription, ColliderDescription, EmitterDescription,
    EntityDescription, LightDescription, RenderDescription, SceneDescription,
    TerrainDescription, TextureDescription, TransformDescription,
};
pub use error::AssetError;
pub use library::{AssetId, AssetLibrary};
pub use primitives::{MeshData, MeshVertices, Primitive};

pub fn crate_info() -> &'static str {
    "ember-assets v0.1.0"
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ember_common::{
        BufferHandle, DeviceError, MeshHandle, ResourceDevice, ShaderHandle, ShaderProgram,
        TextureHandle,
    };

    /// Device that counts uploads and hands out sequential handles.
    #[derive(Debug, Default)]
    pub struct CountingDevice {
        pub meshes: u32,
        pub buffers: u32,
        pub textures: u32,
        pub last_texture_len: usize,
        pub fail_meshes: bool,
    }

    impl ResourceDevice for CountingDevice {
        fn create_mesh(&mut self, label: &str, _: &[u8], _: u32, _: &[u32]) -> Result<MeshHandle, DeviceError> {
            if self.fail_meshes {
                return Err(DeviceError::creation(label, "out of memory"));
            }
            self.meshes += 1;
            Ok(MeshHandle(self.meshes - 1))
        }

        fn create_vertex_buffer(&mut self, _: &str, _: &[u8], _: u32) -> Result<BufferHandle, DeviceError> {
            self.buffers += 1;
            Ok(BufferHandle(self.buffers - 1))
        }

        fn create_instance_buffer(&mut self, _: &str, _: &[u8], _: u32) -> Result<BufferHandle, DeviceError> {
            self.buffers += 1;
            Ok(BufferHandle(self.buffers - 1))
        }

        fn create_texture(&mut self, _: &str, _: u32, _: u32, rgba: &[u8]) -> Result<TextureHandle, DeviceError> {
            self.textures += 1;
            self.last_texture_len = rgba.len();
            Ok(TextureHandle(self.textures - 1))
        }

        fn shader(&mut self, program: ShaderProgram) -> Result<ShaderHandle, DeviceError> {
            Ok(ShaderHandle(program as u32))
        }
    }

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }
}
