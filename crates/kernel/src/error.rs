use ember_common::{DeviceError, EntityId};
use ember_ecs::{ComponentKind, ComponentRef};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
    #[error("entity {0} already exists")]
    DuplicateEntity(EntityId),
    #[error("entity id space exhausted")]
    EntityLimit,
    #[error("entity {entity} has no {kind} component")]
    MissingComponent {
        entity: EntityId,
        kind: ComponentKind,
    },
    #[error("entity {child} references missing parent {parent}")]
    MissingParent { child: EntityId, parent: EntityId },
    #[error("parent chain starting at {0} forms a cycle")]
    ParentCycle(EntityId),
    #[error("component {0} cannot observe itself")]
    SelfObservation(ComponentRef),
    #[error("{observer} observing {subject} would form a cycle")]
    ObserverCycle {
        subject: ComponentRef,
        observer: ComponentRef,
    },
    #[error("scene is already awake")]
    AlreadyAwake,
    #[error(transparent)]
    Device(#[from] DeviceError),
}
