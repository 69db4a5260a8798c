//! Shared types for the ember engine.
//!
//! Everything here is plain data: identifiers, opaque GPU handles, vertex
//! layouts and the narrow device contract used while entities are awoken.

pub mod device;
pub mod math;
pub mod types;
pub mod vertex;

pub use device::{DeviceError, ResourceDevice};
pub use math::euler_rotation;
pub use types::{BufferHandle, EntityId, MeshHandle, ShaderHandle, ShaderProgram, TextureHandle};
pub use vertex::{InstanceData, SimpleVertex, Vertex};
