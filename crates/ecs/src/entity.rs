use crate::camera::CameraComponent;
use crate::component::{Component, ComponentSlot, EMPTY};
use crate::components::{
    ColliderComponent, EmitterComponent, GeometryComponent, LightComponent, RenderComponent,
    ShaderComponent, TerrainComponent, TextureComponent,
};
use crate::kind::{ComponentKind, ComponentMask};
use crate::observer::ObserverSet;
use crate::transform::TransformComponent;
use ember_common::{DeviceError, EntityId, InstanceData, ResourceDevice, SimpleVertex};
use std::collections::BTreeMap;

/// A named bag of at most one component per kind.
///
/// # Invariants
/// - `mask` has exactly the bits of the kinds stored in `components`.
/// - Adding a kind that is already present leaves the entity unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    name: String,
    id: EntityId,
    mask: ComponentMask,
    components: BTreeMap<ComponentKind, ComponentSlot>,
}

impl Entity {
    pub fn new(name: impl Into<String>, id: EntityId) -> Self {
        Self {
            name: name.into(),
            id,
            mask: ComponentMask::empty(),
            components: BTreeMap::new(),
        }
    }

    /// Builder form of [`add_component`](Self::add_component).
    pub fn with(mut self, component: impl Into<Component>) -> Self {
        self.add_component(component);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn mask(&self) -> ComponentMask {
        self.mask
    }

    pub fn has(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    /// Whether every kind in `required` is present.
    pub fn matches(&self, required: ComponentMask) -> bool {
        self.mask.contains(required)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.components.keys().copied()
    }

    /// Store `component`. Returns `false` when the kind is already present
    /// (the existing component is kept) or the value is the empty sentinel.
    pub fn add_component(&mut self, component: impl Into<Component>) -> bool {
        let component = component.into();
        let kind = component.kind();
        if kind == ComponentKind::None {
            return false;
        }
        if self.components.contains_key(&kind) {
            tracing::trace!(entity = %self.id, %kind, "duplicate component ignored");
            return false;
        }
        self.mask |= kind.mask();
        self.components.insert(kind, ComponentSlot::new(component));
        true
    }

    /// Remove the component of `kind`, clearing its mask bit.
    pub fn remove_component(&mut self, kind: ComponentKind) -> Option<Component> {
        let slot = self.components.remove(&kind)?;
        self.mask.remove(kind.mask());
        Some(slot.component)
    }

    /// The component of `kind`, or the empty sentinel when absent.
    pub fn component(&self, kind: ComponentKind) -> &Component {
        self.components.get(&kind).map_or(&EMPTY, |s| &s.component)
    }

    pub fn component_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components.get_mut(&kind).map(|s| &mut s.component)
    }

    pub fn slot(&self, kind: ComponentKind) -> Option<&ComponentSlot> {
        self.components.get(&kind)
    }

    pub fn slot_mut(&mut self, kind: ComponentKind) -> Option<&mut ComponentSlot> {
        self.components.get_mut(&kind)
    }

    pub fn observers(&self, kind: ComponentKind) -> Option<&ObserverSet> {
        self.components.get(&kind).map(|s| &s.observers)
    }

    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut ComponentSlot> + '_ {
        self.components.values_mut()
    }

    // --- typed accessors ---

    pub fn transform(&self) -> Option<&TransformComponent> {
        self.component(ComponentKind::Transform).as_transform()
    }

    pub fn transform_mut(&mut self) -> Option<&mut TransformComponent> {
        self.component_mut(ComponentKind::Transform)?.as_transform_mut()
    }

    pub fn camera(&self) -> Option<&CameraComponent> {
        self.component(ComponentKind::Camera).as_camera()
    }

    pub fn camera_mut(&mut self) -> Option<&mut CameraComponent> {
        self.component_mut(ComponentKind::Camera)?.as_camera_mut()
    }

    pub fn render(&self) -> Option<&RenderComponent> {
        self.component(ComponentKind::Render).as_render()
    }

    pub fn texture(&self) -> Option<&TextureComponent> {
        self.component(ComponentKind::Texture).as_texture()
    }

    pub fn geometry(&self) -> Option<&GeometryComponent> {
        self.component(ComponentKind::Geometry).as_geometry()
    }

    pub fn shader(&self) -> Option<&ShaderComponent> {
        self.component(ComponentKind::Shader).as_shader()
    }

    pub fn terrain(&self) -> Option<&TerrainComponent> {
        self.component(ComponentKind::Terrain).as_terrain()
    }

    pub fn light(&self) -> Option<&LightComponent> {
        self.component(ComponentKind::Light).as_light()
    }

    pub fn emitter(&self) -> Option<&EmitterComponent> {
        self.component(ComponentKind::Emitter).as_emitter()
    }

    pub fn collider(&self) -> Option<&ColliderComponent> {
        self.component(ComponentKind::Collider).as_collider()
    }

    /// Device-side half of awake: terrain uploads its instance stream and
    /// emitters their particle quads. Observer wiring is done by the scene.
    pub fn awake_resources(&mut self, device: &mut dyn ResourceDevice) -> Result<(), DeviceError> {
        let label = self.name.clone();
        if let Some(terrain) = self
            .component_mut(ComponentKind::Terrain)
            .and_then(Component::as_terrain_mut)
        {
            let instances = terrain.instances();
            if instances.is_empty() {
                tracing::debug!(entity = %label, "terrain has no solid voxels; nothing uploaded");
            } else {
                let buffer = device.create_instance_buffer(
                    &format!("{label}/terrain"),
                    bytemuck::cast_slice(&instances),
                    std::mem::size_of::<InstanceData>() as u32,
                )?;
                terrain.attach_instances(buffer, instances.len() as u32);
                tracing::debug!(entity = %label, instances = instances.len(), "terrain instances uploaded");
            }
        }
        if let Some(emitter) = self
            .component_mut(ComponentKind::Emitter)
            .and_then(Component::as_emitter_mut)
        {
            let vertices = emitter.particle_vertices();
            if vertices.is_empty() {
                tracing::debug!(entity = %label, "emitter has no particles; nothing uploaded");
            } else {
                let buffer = device.create_vertex_buffer(
                    &format!("{label}/particles"),
                    bytemuck::cast_slice(&vertices),
                    SimpleVertex::STRIDE,
                )?;
                emitter.attach_vertices(buffer);
                tracing::debug!(entity = %label, vertices = vertices.len(), "particle quads uploaded");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_common::{BufferHandle, MeshHandle, ShaderHandle, ShaderProgram, TextureHandle};
    use glam::{UVec3, Vec3};

    #[derive(Default)]
    struct CountingDevice {
        instance_bytes: usize,
        vertex_bytes: usize,
        next: u32,
    }

    impl ResourceDevice for CountingDevice {
        fn create_mesh(&mut self, _: &str, _: &[u8], _: u32, _: &[u32]) -> Result<MeshHandle, DeviceError> {
            self.next += 1;
            Ok(MeshHandle(self.next))
        }

        fn create_vertex_buffer(&mut self, label: &str, data: &[u8], _: u32) -> Result<BufferHandle, DeviceError> {
            if data.is_empty() {
                return Err(DeviceError::creation(label, "empty vertex stream"));
            }
            self.vertex_bytes += data.len();
            self.next += 1;
            Ok(BufferHandle(self.next))
        }

        fn create_instance_buffer(&mut self, label: &str, data: &[u8], _: u32) -> Result<BufferHandle, DeviceError> {
            if data.is_empty() {
                return Err(DeviceError::creation(label, "empty instance stream"));
            }
            self.instance_bytes += data.len();
            self.next += 1;
            Ok(BufferHandle(self.next))
        }

        fn create_texture(&mut self, _: &str, _: u32, _: u32, _: &[u8]) -> Result<TextureHandle, DeviceError> {
            self.next += 1;
            Ok(TextureHandle(self.next))
        }

        fn shader(&mut self, program: ShaderProgram) -> Result<ShaderHandle, DeviceError> {
            Ok(ShaderHandle(program as u32))
        }
    }

    #[test]
    fn duplicate_add_keeps_first_component() {
        let mut entity = Entity::new("crate", EntityId(1));
        assert!(entity.add_component(TransformComponent::at(Vec3::X)));
        let mask = entity.mask();
        assert!(!entity.add_component(TransformComponent::at(Vec3::Y)));
        assert_eq!(entity.mask(), mask);
        assert_eq!(entity.transform().map(|t| t.local_position()), Some(Vec3::X));
    }

    #[test]
    fn remove_clears_mask_bit() {
        let mut entity = Entity::new("lamp", EntityId(2))
            .with(TransformComponent::default())
            .with(LightComponent::default());
        assert!(entity.matches(ComponentMask::TRANSFORM | ComponentMask::LIGHT));
        assert!(entity.remove_component(ComponentKind::Light).is_some());
        assert_eq!(entity.mask(), ComponentMask::TRANSFORM);
        assert!(entity.remove_component(ComponentKind::Light).is_none());
        assert_eq!(entity.mask(), ComponentMask::TRANSFORM);
    }

    #[test]
    fn absent_lookup_returns_sentinel() {
        let entity = Entity::new("empty", EntityId(3));
        assert!(entity.component(ComponentKind::Camera).is_empty());
        assert!(entity.camera().is_none());
    }

    #[test]
    fn sentinel_cannot_be_added() {
        let mut entity = Entity::new("empty", EntityId(3));
        assert!(!entity.add_component(Component::None));
        assert!(entity.mask().is_empty());
    }

    #[test]
    fn clone_is_structural() {
        let original = Entity::new("rock", EntityId(4)).with(TransformComponent::at(Vec3::Z));
        let mut copy = original.clone();
        if let Some(t) = copy.transform_mut() {
            t.translate(Vec3::X);
        }
        assert_eq!(original.transform().map(|t| t.local_position()), Some(Vec3::Z));
    }

    #[test]
    fn awake_uploads_terrain_and_particles() {
        let mut device = CountingDevice::default();
        let mut entity = Entity::new("yard", EntityId(5))
            .with(TerrainComponent::new(UVec3::new(2, 1, 2), Vec3::ONE, 0))
            .with(EmitterComponent::new(3));
        entity.awake_resources(&mut device).unwrap();
        assert_eq!(device.instance_bytes, 4 * std::mem::size_of::<InstanceData>());
        assert_eq!(device.vertex_bytes, 18 * SimpleVertex::STRIDE as usize);
        assert_eq!(entity.terrain().map(|t| t.instance_count()), Some(4));
        assert!(entity.emitter().and_then(|e| e.vertex_buffer()).is_some());
    }

    #[test]
    fn awake_skips_empty_streams() {
        let mut device = CountingDevice::default();
        let mut entity = Entity::new("bare", EntityId(6))
            .with(TerrainComponent::new(UVec3::new(0, 1, 4), Vec3::ONE, 0))
            .with(EmitterComponent::new(0));
        entity.awake_resources(&mut device).unwrap();
        assert_eq!(device.next, 0);
        assert_eq!(entity.terrain().map(|t| t.instance_count()), Some(0));
        assert!(entity.terrain().and_then(|t| t.instance_buffer()).is_none());
        assert!(entity.emitter().and_then(|e| e.vertex_buffer()).is_none());
    }
}
