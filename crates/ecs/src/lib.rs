//! Entity and component model for the ember scene graph.
//!
//! Components are value types owned by their entity. Links between
//! components (a child transform watching its parent, a camera watching a
//! transform) are non-owning [`ComponentRef`] handles resolved through the
//! scene arena, never pointers.
//!
//! # Invariants
//! - At most one component per [`ComponentKind`] per entity.
//! - An entity's [`ComponentMask`] mirrors exactly the kinds it stores.
//! - Lookups of absent kinds yield the empty sentinel, never a panic.
//! - Storage is a BTreeMap, so iteration over kinds is deterministic.

pub mod camera;
pub mod component;
pub mod components;
pub mod entity;
pub mod kind;
pub mod observer;
pub mod transform;

pub use camera::CameraComponent;
pub use component::{Component, ComponentSlot};
pub use components::{
    BlendMode, ColliderComponent, EmitterComponent, GeometryComponent, LightComponent, Material,
    RenderComponent, RenderType, ShaderComponent, TerrainComponent, TextureComponent,
};
pub use entity::Entity;
pub use kind::{ComponentKind, ComponentMask};
pub use observer::{ComponentRef, ObserverSet};
pub use transform::{SpatialFrame, TransformComponent};

pub fn crate_info() -> &'static str {
    "ember-ecs v0.1.0"
}
