use crate::constants::ConstantBuffer;
use ember_common::{DeviceError, ShaderProgram};
use ember_kernel::SceneError;

/// Renderer failures. None of them are retried; the caller decides whether
/// to abort.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create renderer resources: {0}")]
    Resource(#[from] DeviceError),
    #[error("failed to update the {buffer} constant buffer: {reason}")]
    ConstantBufferUpdate {
        buffer: ConstantBuffer,
        reason: String,
    },
    #[error("no swap chain is attached to the backend")]
    MissingSwapChain,
    #[error("presenting the frame failed: {0}")]
    Present(String),
    #[error("the scene has no {0} pass quad")]
    MissingPass(ShaderProgram),
    #[error("the scene has no shadow-casting light")]
    NoLights,
    #[error("the renderer was used before initialize")]
    NotInitialized,
    #[error("the scene must be awake before the renderer is initialized")]
    SceneNotAwake,
    #[error("{needed} draws per frame exceed the budget of {max}")]
    DrawBudget { needed: usize, max: usize },
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("backend failure: {0}")]
    Backend(String),
}
