use ember_common::DeviceError;
use ember_kernel::SceneError;

/// Errors from loading or building a scene.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entity name {0:?} is used more than once")]
    DuplicateName(String),
    #[error("entity {entity:?} names unknown parent {parent:?}")]
    UnknownParent { entity: String, parent: String },
    #[error("entity {entity:?} names unknown texture {texture:?}")]
    UnknownTexture { entity: String, texture: String },
    #[error("entity {entity:?} is invalid: {reason}")]
    InvalidEntity { entity: String, reason: String },
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}
