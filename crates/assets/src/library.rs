use crate::primitives::MeshData;
use ember_common::{DeviceError, ResourceDevice, TextureHandle};
use ember_ecs::GeometryComponent;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Content-addressed id computed from the uploaded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

fn truncate(digest: &[u8]) -> AssetId {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    AssetId(u64::from_le_bytes(bytes))
}

impl AssetId {
    pub fn of_mesh(mesh: &MeshData) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(mesh.stride().to_le_bytes());
        hasher.update(mesh.vertex_bytes());
        hasher.update(bytemuck::cast_slice::<u32, u8>(&mesh.indices));
        truncate(&hasher.finalize())
    }

    pub fn of_texture(width: u32, height: u32, rgba: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(width.to_le_bytes());
        hasher.update(height.to_le_bytes());
        hasher.update(rgba);
        truncate(&hasher.finalize())
    }
}

/// Uploads meshes and textures once per distinct content.
///
/// Two entities naming the same primitive, or two textures with the same
/// colour, share one device resource.
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    meshes: BTreeMap<AssetId, GeometryComponent>,
    textures: BTreeMap<AssetId, TextureHandle>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(
        &mut self,
        device: &mut dyn ResourceDevice,
        mesh: &MeshData,
    ) -> Result<GeometryComponent, DeviceError> {
        let id = AssetId::of_mesh(mesh);
        if let Some(geometry) = self.meshes.get(&id) {
            tracing::trace!(label = %mesh.label, ?id, "mesh reused");
            return Ok(*geometry);
        }
        let handle = device.create_mesh(&mesh.label, mesh.vertex_bytes(), mesh.stride(), &mesh.indices)?;
        let geometry = GeometryComponent {
            mesh: handle,
            index_count: mesh.index_count(),
        };
        tracing::debug!(label = %mesh.label, vertices = mesh.vertex_count(), ?id, "mesh uploaded");
        self.meshes.insert(id, geometry);
        Ok(geometry)
    }

    pub fn texture(
        &mut self,
        device: &mut dyn ResourceDevice,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureHandle, DeviceError> {
        let id = AssetId::of_texture(width, height, rgba);
        if let Some(handle) = self.textures.get(&id) {
            return Ok(*handle);
        }
        let handle = device.create_texture(label, width, height, rgba)?;
        tracing::debug!(label, width, height, ?id, "texture uploaded");
        self.textures.insert(id, handle);
        Ok(handle)
    }

    /// A `size` x `size` texture of one colour.
    pub fn solid_texture(
        &mut self,
        device: &mut dyn ResourceDevice,
        label: &str,
        colour: [u8; 4],
        size: u32,
    ) -> Result<TextureHandle, DeviceError> {
        let size = size.max(1);
        let rgba = colour.repeat((size * size) as usize);
        self.texture(device, label, size, size, &rgba)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Primitive, cube, plane};
    use crate::tests::CountingDevice;

    #[test]
    fn identical_meshes_upload_once() {
        let mut device = CountingDevice::default();
        let mut library = AssetLibrary::new();
        let a = library.mesh(&mut device, &cube()).unwrap();
        let b = library.mesh(&mut device, &Primitive::Cube.mesh()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.index_count, 36);
        assert_eq!(device.meshes, 1);

        library.mesh(&mut device, &plane()).unwrap();
        assert_eq!(device.meshes, 2);
        assert_eq!(library.mesh_count(), 2);
    }

    #[test]
    fn label_does_not_change_identity() {
        let mut renamed = cube();
        renamed.label = "crate".into();
        assert_eq!(AssetId::of_mesh(&renamed), AssetId::of_mesh(&cube()));
        assert_ne!(AssetId::of_mesh(&plane()), AssetId::of_mesh(&cube()));
    }

    #[test]
    fn solid_textures_dedup_by_colour() {
        let mut device = CountingDevice::default();
        let mut library = AssetLibrary::new();
        let red = library.solid_texture(&mut device, "red", [255, 0, 0, 255], 2).unwrap();
        let again = library.solid_texture(&mut device, "also_red", [255, 0, 0, 255], 2).unwrap();
        let blue = library.solid_texture(&mut device, "blue", [0, 0, 255, 255], 2).unwrap();
        assert_eq!(red, again);
        assert_ne!(red, blue);
        assert_eq!(device.textures, 2);
        assert_eq!(device.last_texture_len, 16);
    }
}
