use crate::camera::CameraComponent;
use crate::components::{
    ColliderComponent, EmitterComponent, GeometryComponent, LightComponent, RenderComponent,
    ShaderComponent, TerrainComponent, TextureComponent,
};
use crate::kind::ComponentKind;
use crate::observer::ObserverSet;
use crate::transform::TransformComponent;

/// One component value, tagged by kind. `None` is the empty sentinel handed
/// out for lookups of absent kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Component {
    #[default]
    None,
    Transform(TransformComponent),
    Camera(CameraComponent),
    Render(RenderComponent),
    Texture(TextureComponent),
    Geometry(GeometryComponent),
    Shader(ShaderComponent),
    Terrain(TerrainComponent),
    Light(LightComponent),
    Emitter(EmitterComponent),
    Collider(ColliderComponent),
}

/// The shared empty sentinel.
pub static EMPTY: Component = Component::None;

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::None => ComponentKind::None,
            Self::Transform(_) => ComponentKind::Transform,
            Self::Camera(_) => ComponentKind::Camera,
            Self::Render(_) => ComponentKind::Render,
            Self::Texture(_) => ComponentKind::Texture,
            Self::Geometry(_) => ComponentKind::Geometry,
            Self::Shader(_) => ComponentKind::Shader,
            Self::Terrain(_) => ComponentKind::Terrain,
            Self::Light(_) => ComponentKind::Light,
            Self::Emitter(_) => ComponentKind::Emitter,
            Self::Collider(_) => ComponentKind::Collider,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }
}

macro_rules! component_variant {
    ($variant:ident, $ty:ty, $get:ident, $get_mut:ident) => {
        impl From<$ty> for Component {
            fn from(value: $ty) -> Self {
                Component::$variant(value)
            }
        }

        impl Component {
            pub fn $get(&self) -> Option<&$ty> {
                match self {
                    Component::$variant(c) => Some(c),
                    _ => None,
                }
            }

            pub fn $get_mut(&mut self) -> Option<&mut $ty> {
                match self {
                    Component::$variant(c) => Some(c),
                    _ => None,
                }
            }
        }
    };
}

component_variant!(Transform, TransformComponent, as_transform, as_transform_mut);
component_variant!(Camera, CameraComponent, as_camera, as_camera_mut);
component_variant!(Render, RenderComponent, as_render, as_render_mut);
component_variant!(Texture, TextureComponent, as_texture, as_texture_mut);
component_variant!(Geometry, GeometryComponent, as_geometry, as_geometry_mut);
component_variant!(Shader, ShaderComponent, as_shader, as_shader_mut);
component_variant!(Terrain, TerrainComponent, as_terrain, as_terrain_mut);
component_variant!(Light, LightComponent, as_light, as_light_mut);
component_variant!(Emitter, EmitterComponent, as_emitter, as_emitter_mut);
component_variant!(Collider, ColliderComponent, as_collider, as_collider_mut);

/// A stored component together with the observers registered on it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentSlot {
    pub component: Component,
    pub observers: ObserverSet,
}

impl ComponentSlot {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            observers: ObserverSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_empty() {
        assert!(EMPTY.is_empty());
        assert_eq!(EMPTY.kind(), ComponentKind::None);
        assert!(EMPTY.as_transform().is_none());
    }

    #[test]
    fn conversion_tags_kind() {
        let c: Component = LightComponent::default().into();
        assert_eq!(c.kind(), ComponentKind::Light);
        assert!(c.as_light().is_some());
        assert!(c.as_camera().is_none());
    }
}
