use crate::kind::ComponentKind;
use ember_common::EntityId;
use std::fmt;

/// Non-owning reference to one component: the owning entity plus the kind.
///
/// Resolving a reference goes back through the scene arena, so a reference to
/// a removed component simply fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentRef {
    pub entity: EntityId,
    pub kind: ComponentKind,
}

impl ComponentRef {
    pub fn new(entity: EntityId, kind: ComponentKind) -> Self {
        Self { entity, kind }
    }

    pub fn transform(entity: EntityId) -> Self {
        Self::new(entity, ComponentKind::Transform)
    }

    pub fn camera(entity: EntityId) -> Self {
        Self::new(entity, ComponentKind::Camera)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity, self.kind)
    }
}

/// The observers registered on a single component.
///
/// No implied order and duplicates are tolerated; removal drops every entry
/// equal to the given reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserverSet {
    observers: Vec<ComponentRef>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observer: ComponentRef) {
        self.observers.push(observer);
    }

    /// Remove `observer` by identity. Returns how many entries were dropped;
    /// removing a reference that was never added is a no-op returning 0.
    pub fn remove(&mut self, observer: ComponentRef) -> usize {
        let before = self.observers.len();
        self.observers.retain(|o| *o != observer);
        before - self.observers.len()
    }

    /// Drop every observer living on `entity`.
    pub fn remove_entity(&mut self, entity: EntityId) -> usize {
        let before = self.observers.len();
        self.observers.retain(|o| o.entity != entity);
        before - self.observers.len()
    }

    pub fn contains(&self, observer: ComponentRef) -> bool {
        self.observers.contains(&observer)
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentRef> + '_ {
        self.observers.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_never_added_is_noop() {
        let mut set = ObserverSet::new();
        set.add(ComponentRef::camera(EntityId(1)));
        assert_eq!(set.remove(ComponentRef::transform(EntityId(2))), 0);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicates_are_tolerated_and_removed_together() {
        let mut set = ObserverSet::new();
        let cam = ComponentRef::camera(EntityId(4));
        set.add(cam);
        set.add(cam);
        set.add(ComponentRef::transform(EntityId(5)));
        assert_eq!(set.len(), 3);
        assert_eq!(set.remove(cam), 2);
        assert!(!set.contains(cam));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_entity_drops_all_of_its_components() {
        let mut set = ObserverSet::new();
        set.add(ComponentRef::camera(EntityId(4)));
        set.add(ComponentRef::transform(EntityId(4)));
        set.add(ComponentRef::transform(EntityId(6)));
        assert_eq!(set.remove_entity(EntityId(4)), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![ComponentRef::transform(EntityId(6))]);
    }

    #[test]
    fn display_names_entity_and_kind() {
        assert_eq!(ComponentRef::transform(EntityId(3)).to_string(), "#3/transform");
    }
}
