use crate::error::SceneError;
use ember_common::{EntityId, ResourceDevice};
use ember_ecs::{
    Component, ComponentKind, ComponentMask, ComponentRef, Entity, SpatialFrame,
    TransformComponent,
};
use glam::{Mat4, Vec3};
use std::collections::{BTreeMap, BTreeSet};

/// The entity arena and the observer graph living on top of it.
///
/// Every mutation that changes a transform's position goes through the
/// scene so observers can be notified synchronously before the call returns.
///
/// # Invariants
/// - Entity ids are unique; iteration is in id order (BTreeMap).
/// - The observer graph is acyclic and never contains self-edges.
/// - Removing a component or entity drops every observer edge naming it.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u16,
    awake: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, SceneError> {
        self.entities.get(&id).ok_or(SceneError::UnknownEntity(id))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, SceneError> {
        self.entities.get_mut(&id).ok_or(SceneError::UnknownEntity(id))
    }

    /// Create an empty entity under the lowest unused id.
    pub fn spawn(&mut self, name: impl Into<String>) -> Result<EntityId, SceneError> {
        while self.next_id <= u16::from(u8::MAX) {
            let id = EntityId(self.next_id as u8);
            self.next_id += 1;
            if !self.entities.contains_key(&id) {
                self.entities.insert(id, Entity::new(name, id));
                return Ok(id);
            }
        }
        Err(SceneError::EntityLimit)
    }

    /// Insert a fully built entity under its own id.
    pub fn insert(&mut self, entity: Entity) -> Result<EntityId, SceneError> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(SceneError::DuplicateEntity(id));
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Remove an entity and every observer edge pointing at it.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.entities.remove(&id)?;
        for entity in self.entities.values_mut() {
            for slot in entity.slots_mut() {
                slot.observers.remove_entity(id);
            }
        }
        Some(removed)
    }

    /// Ids of the entities carrying every kind in `required`, in id order.
    pub fn filter(&self, required: ComponentMask) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.matches(required))
            .map(Entity::id)
            .collect()
    }

    pub fn add_component(
        &mut self,
        id: EntityId,
        component: impl Into<Component>,
    ) -> Result<bool, SceneError> {
        Ok(self.entity_mut(id)?.add_component(component))
    }

    /// Remove a component and drop it from every observer set.
    pub fn remove_component(
        &mut self,
        id: EntityId,
        kind: ComponentKind,
    ) -> Result<Option<Component>, SceneError> {
        let removed = self.entity_mut(id)?.remove_component(kind);
        if removed.is_some() {
            let gone = ComponentRef::new(id, kind);
            for entity in self.entities.values_mut() {
                for slot in entity.slots_mut() {
                    slot.observers.remove(gone);
                }
            }
        }
        Ok(removed)
    }

    /// Look up the component a reference points at.
    pub fn resolve(&self, component: ComponentRef) -> Option<&Component> {
        self.entities
            .get(&component.entity)
            .and_then(|e| e.slot(component.kind))
            .map(|s| &s.component)
    }

    fn require(&self, component: ComponentRef) -> Result<(), SceneError> {
        let entity = self.entity(component.entity)?;
        if entity.has(component.kind) {
            Ok(())
        } else {
            Err(SceneError::MissingComponent {
                entity: component.entity,
                kind: component.kind,
            })
        }
    }

    // --- observers ---

    /// Register `observer` to be told when `subject` changes.
    pub fn add_observer(
        &mut self,
        subject: ComponentRef,
        observer: ComponentRef,
    ) -> Result<(), SceneError> {
        if subject == observer {
            return Err(SceneError::SelfObservation(subject));
        }
        self.require(subject)?;
        self.require(observer)?;
        if self.reaches(observer, subject) {
            return Err(SceneError::ObserverCycle { subject, observer });
        }
        if let Some(slot) = self
            .entities
            .get_mut(&subject.entity)
            .and_then(|e| e.slot_mut(subject.kind))
        {
            slot.observers.add(observer);
        }
        tracing::trace!(%subject, %observer, "observer registered");
        Ok(())
    }

    /// Deregister `observer`. Unknown subjects and never-added observers are a no-op.
    pub fn remove_observer(&mut self, subject: ComponentRef, observer: ComponentRef) -> usize {
        self.entities
            .get_mut(&subject.entity)
            .and_then(|e| e.slot_mut(subject.kind))
            .map_or(0, |slot| slot.observers.remove(observer))
    }

    pub fn observers_of(&self, subject: ComponentRef) -> Vec<ComponentRef> {
        self.entities
            .get(&subject.entity)
            .and_then(|e| e.observers(subject.kind))
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    /// Whether `to` is reachable from `from` along observer edges.
    fn reaches(&self, from: ComponentRef, to: ComponentRef) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.observers_of(current));
            }
        }
        false
    }

    /// Deliver a change of `source` to all of its observers, depth first.
    ///
    /// Returns the number of deliveries made, including cascades. Observers
    /// that no longer resolve are skipped.
    pub fn notify(&mut self, source: ComponentRef) -> usize {
        let observers = self.observers_of(source);
        observers
            .into_iter()
            .map(|observer| self.deliver(source, observer))
            .sum()
    }

    fn deliver(&mut self, source: ComponentRef, target: ComponentRef) -> usize {
        if self.resolve(target).is_none() {
            tracing::warn!(%source, %target, "stale observer skipped");
            return 0;
        }
        match target.kind {
            ComponentKind::Transform => {
                tracing::trace!(%source, %target, "transform re-propagates");
                1 + self.notify(target)
            }
            ComponentKind::Camera => {
                let world = match self.world_position(source.entity) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(%source, %target, error = %e, "camera source has no world position");
                        return 0;
                    }
                };
                let Some(camera) = self.entities.get_mut(&target.entity).and_then(Entity::camera_mut)
                else {
                    return 0;
                };
                if source.kind == ComponentKind::Transform && camera.parent() == Some(source.entity) {
                    camera.follow_parent(world);
                } else {
                    camera.follow_transform(world);
                }
                tracing::trace!(%source, %target, position = ?camera.position(), "camera re-framed");
                1
            }
            _ => {
                tracing::trace!(%source, %target, "observer has no change handler");
                1
            }
        }
    }

    // --- world-space queries ---

    /// World frame of an entity's transform, composed up the parent chain.
    pub fn world_frame(&self, id: EntityId) -> Result<SpatialFrame, SceneError> {
        let mut chain: Vec<&TransformComponent> = Vec::new();
        let mut current = id;
        loop {
            let transform = self.entity(current)?.transform().ok_or(SceneError::MissingComponent {
                entity: current,
                kind: ComponentKind::Transform,
            })?;
            chain.push(transform);
            let Some(parent) = transform.parent() else {
                break;
            };
            if chain.len() > self.entities.len() {
                return Err(SceneError::ParentCycle(id));
            }
            if !self.entities.contains_key(&parent) {
                return Err(SceneError::MissingParent {
                    child: current,
                    parent,
                });
            }
            current = parent;
        }
        Ok(chain
            .iter()
            .rev()
            .fold(None, |parent, t| Some(t.world_frame(parent)))
            .unwrap_or(SpatialFrame::IDENTITY))
    }

    /// World frame of the entity's parent, `None` when unparented.
    pub fn parent_frame(&self, id: EntityId) -> Result<Option<SpatialFrame>, SceneError> {
        let transform = self.transform(id)?;
        transform.parent().map(|p| self.world_frame(p)).transpose()
    }

    pub fn world_position(&self, id: EntityId) -> Result<Vec3, SceneError> {
        Ok(self.world_frame(id)?.position)
    }

    pub fn world_orientation(&self, id: EntityId) -> Result<Vec3, SceneError> {
        Ok(self.world_frame(id)?.orientation)
    }

    pub fn world_scale(&self, id: EntityId) -> Result<Vec3, SceneError> {
        Ok(self.world_frame(id)?.scale)
    }

    /// Composite model matrix of the entity, recomputed from local state.
    pub fn transform_matrix(&self, id: EntityId) -> Result<Mat4, SceneError> {
        let parent = self.parent_frame(id)?;
        Ok(self.transform(id)?.compose(parent))
    }

    pub fn transform(&self, id: EntityId) -> Result<&TransformComponent, SceneError> {
        self.entity(id)?
            .transform()
            .ok_or(SceneError::MissingComponent {
                entity: id,
                kind: ComponentKind::Transform,
            })
    }

    fn transform_mut(&mut self, id: EntityId) -> Result<&mut TransformComponent, SceneError> {
        self.entity_mut(id)?
            .transform_mut()
            .ok_or(SceneError::MissingComponent {
                entity: id,
                kind: ComponentKind::Transform,
            })
    }

    // --- transform mutations ---

    /// Translate the entity's transform and notify its observers.
    pub fn move_entity(&mut self, id: EntityId, delta: Vec3) -> Result<usize, SceneError> {
        self.transform_mut(id)?.translate(delta);
        Ok(self.notify(ComponentRef::transform(id)))
    }

    /// Accumulate `axis * angle` into the orientation. Observers are not
    /// notified; rotation is read back when the next frame is drawn.
    pub fn rotate_entity(&mut self, id: EntityId, axis: Vec3, angle: f32) -> Result<(), SceneError> {
        self.transform_mut(id)?.accumulate_rotation(axis, angle);
        Ok(())
    }

    /// Same accumulation as [`rotate_entity`](Self::rotate_entity); the pivot
    /// does not take part.
    pub fn rotate_about(
        &mut self,
        id: EntityId,
        axis: Vec3,
        angle: f32,
        pivot: Vec3,
    ) -> Result<(), SceneError> {
        tracing::trace!(entity = %id, ?pivot, "pivot ignored by Euler accumulation");
        self.rotate_entity(id, axis, angle)
    }

    /// Orbit the local position about `axis`. Like rotation, observers are
    /// not notified.
    pub fn rotate_position(&mut self, id: EntityId, axis: Vec3, angle: f32) -> Result<(), SceneError> {
        self.transform_mut(id)?.orbit_position(axis, angle);
        Ok(())
    }

    /// Restore the transform's construction values and notify observers.
    pub fn reset_transform(&mut self, id: EntityId) -> Result<usize, SceneError> {
        self.transform_mut(id)?.reset();
        Ok(self.notify(ComponentRef::transform(id)))
    }

    // --- awake ---

    /// Run every entity's one-time awake: device uploads first, then
    /// transform and camera observer wiring.
    ///
    /// Parent chains are validated up front, so a missing parent or a cycle
    /// fails before any resource is created.
    pub fn awake(&mut self, device: &mut dyn ResourceDevice) -> Result<(), SceneError> {
        if self.awake {
            return Err(SceneError::AlreadyAwake);
        }
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for &id in &ids {
            if self.entity(id)?.has(ComponentKind::Transform) {
                self.world_frame(id)?;
            }
        }
        for &id in &ids {
            self.entity_mut(id)?.awake_resources(device)?;
        }
        for &id in &ids {
            let parent = self.entity(id)?.transform().and_then(TransformComponent::parent);
            if let Some(parent) = parent {
                self.add_observer(ComponentRef::transform(parent), ComponentRef::transform(id))?;
            }
        }
        for &id in &ids {
            if self.entity(id)?.has(ComponentKind::Camera) {
                self.awake_camera(id)?;
            }
        }
        self.awake = true;
        tracing::info!(entities = ids.len(), "scene awake");
        Ok(())
    }

    fn awake_camera(&mut self, id: EntityId) -> Result<(), SceneError> {
        let transform = self.transform(id)?;
        let offset = transform.local_position();
        let parent = transform.parent();
        let position = self.world_position(id)?;
        let parent_position = parent.map(|p| self.world_position(p)).transpose()?;

        let camera = self
            .entity_mut(id)?
            .camera_mut()
            .ok_or(SceneError::MissingComponent {
                entity: id,
                kind: ComponentKind::Camera,
            })?;
        camera.attach(position, offset, parent);
        match parent_position {
            Some(target) => camera.set_look_at(target),
            None => camera.update_view(),
        }

        if let Some(parent) = parent {
            self.add_observer(ComponentRef::transform(parent), ComponentRef::camera(id))?;
        }
        self.add_observer(ComponentRef::transform(id), ComponentRef::camera(id))?;
        tracing::debug!(camera = %id, ?parent, ?position, "camera attached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::NullDevice;
    use ember_ecs::{CameraComponent, LightComponent};

    /// Rocket at the origin with a chase camera mounted five units above it.
    fn rocket_with_camera() -> (Scene, EntityId, EntityId) {
        let mut scene = Scene::new();
        let rocket = scene.spawn("rocket").unwrap();
        scene.add_component(rocket, TransformComponent::default()).unwrap();
        let cam = scene.spawn("chase").unwrap();
        scene
            .add_component(cam, TransformComponent::at(Vec3::new(0.0, 5.0, 0.0)).with_parent(rocket))
            .unwrap();
        scene.add_component(cam, CameraComponent::default()).unwrap();
        scene.awake(&mut NullDevice).unwrap();
        (scene, rocket, cam)
    }

    fn camera_position(scene: &Scene, id: EntityId) -> Vec3 {
        scene.get(id).and_then(Entity::camera).unwrap().position()
    }

    #[test]
    fn spawn_assigns_lowest_free_id() {
        let mut scene = Scene::new();
        scene.insert(Entity::new("fixed", EntityId(1))).unwrap();
        assert_eq!(scene.spawn("a").unwrap(), EntityId(0));
        assert_eq!(scene.spawn("b").unwrap(), EntityId(2));
    }

    #[test]
    fn id_space_is_bounded() {
        let mut scene = Scene::new();
        for _ in 0..256 {
            scene.spawn("e").unwrap();
        }
        assert!(matches!(scene.spawn("overflow"), Err(SceneError::EntityLimit)));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut scene = Scene::new();
        scene.insert(Entity::new("a", EntityId(7))).unwrap();
        assert!(matches!(
            scene.insert(Entity::new("b", EntityId(7))),
            Err(SceneError::DuplicateEntity(EntityId(7)))
        ));
    }

    #[test]
    fn notify_without_observers_is_noop() {
        let mut scene = Scene::new();
        let id = scene.spawn("lonely").unwrap();
        scene.add_component(id, TransformComponent::default()).unwrap();
        assert_eq!(scene.notify(ComponentRef::transform(id)), 0);
        assert_eq!(scene.move_entity(id, Vec3::X).unwrap(), 0);
    }

    #[test]
    fn self_observation_is_rejected() {
        let mut scene = Scene::new();
        let id = scene.spawn("a").unwrap();
        scene.add_component(id, TransformComponent::default()).unwrap();
        let r = ComponentRef::transform(id);
        assert!(matches!(scene.add_observer(r, r), Err(SceneError::SelfObservation(_))));
    }

    #[test]
    fn observer_cycles_are_rejected() {
        let mut scene = Scene::new();
        let a = scene.spawn("a").unwrap();
        let b = scene.spawn("b").unwrap();
        scene.add_component(a, TransformComponent::default()).unwrap();
        scene.add_component(b, TransformComponent::default()).unwrap();
        scene
            .add_observer(ComponentRef::transform(a), ComponentRef::transform(b))
            .unwrap();
        assert!(matches!(
            scene.add_observer(ComponentRef::transform(b), ComponentRef::transform(a)),
            Err(SceneError::ObserverCycle { .. })
        ));
    }

    #[test]
    fn observing_a_missing_component_fails() {
        let mut scene = Scene::new();
        let a = scene.spawn("a").unwrap();
        scene.add_component(a, TransformComponent::default()).unwrap();
        assert!(matches!(
            scene.add_observer(ComponentRef::transform(a), ComponentRef::camera(a)),
            Err(SceneError::MissingComponent { kind: ComponentKind::Camera, .. })
        ));
    }

    #[test]
    fn removing_unknown_observer_is_noop() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        let before = scene.observers_of(ComponentRef::transform(rocket));
        assert_eq!(
            scene.remove_observer(ComponentRef::transform(rocket), ComponentRef::transform(EntityId(42))),
            0
        );
        assert_eq!(scene.remove_observer(ComponentRef::camera(cam), ComponentRef::camera(rocket)), 0);
        assert_eq!(scene.observers_of(ComponentRef::transform(rocket)), before);
    }

    #[test]
    fn awake_wires_parent_and_camera() {
        let (scene, rocket, cam) = rocket_with_camera();
        let on_rocket = scene.observers_of(ComponentRef::transform(rocket));
        assert!(on_rocket.contains(&ComponentRef::transform(cam)));
        assert!(on_rocket.contains(&ComponentRef::camera(cam)));
        assert_eq!(
            scene.observers_of(ComponentRef::transform(cam)),
            vec![ComponentRef::camera(cam)]
        );
        let camera = scene.get(cam).and_then(Entity::camera).unwrap();
        assert_eq!(camera.position(), Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(camera.look_at(), Vec3::ZERO);
        assert_eq!(camera.offset(), Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(camera.parent(), Some(rocket));
    }

    #[test]
    fn moving_parent_moves_child_camera() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        let delivered = scene.move_entity(rocket, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        // child transform, its cascade to the camera, and the camera directly
        assert_eq!(delivered, 3);
        assert_eq!(camera_position(&scene, cam), Vec3::new(1.0, 5.0, 0.0));
        assert_eq!(
            scene.get(cam).and_then(Entity::camera).unwrap().look_at(),
            Vec3::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn rotate_does_not_notify() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        let view = scene.get(cam).and_then(Entity::camera).unwrap().view();
        scene.rotate_entity(rocket, Vec3::Y, 1.0).unwrap();
        scene.rotate_about(rocket, Vec3::X, 0.5, Vec3::ONE).unwrap();
        assert_eq!(scene.get(cam).and_then(Entity::camera).unwrap().view(), view);
        assert_eq!(scene.world_orientation(rocket).unwrap(), Vec3::new(0.5, 1.0, 0.0));
    }

    #[test]
    fn rotate_position_is_silent() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        scene.move_entity(rocket, Vec3::X).unwrap();
        let before = camera_position(&scene, cam);
        scene
            .rotate_position(rocket, Vec3::Y, std::f32::consts::PI)
            .unwrap();
        let local = scene.transform(rocket).unwrap().local_position();
        assert!(local.abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-5));
        assert_eq!(camera_position(&scene, cam), before);
        assert!(before.abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), 1e-5));
    }

    #[test]
    fn reset_restores_and_reframes() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        scene.move_entity(rocket, Vec3::new(3.0, 0.0, 2.0)).unwrap();
        scene.rotate_entity(rocket, Vec3::Z, 0.3).unwrap();
        scene.reset_transform(rocket).unwrap();
        assert_eq!(scene.transform(rocket).unwrap().local_position(), Vec3::ZERO);
        assert_eq!(scene.transform(rocket).unwrap().local_orientation(), Vec3::ZERO);
        assert_eq!(camera_position(&scene, cam), Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn chained_parents_compose_additively() {
        let mut scene = Scene::new();
        let root = scene.spawn("root").unwrap();
        let mid = scene.spawn("mid").unwrap();
        let leaf = scene.spawn("leaf").unwrap();
        scene.add_component(root, TransformComponent::at(Vec3::new(1.0, 0.0, 0.0))).unwrap();
        scene
            .add_component(mid, TransformComponent::at(Vec3::new(0.0, 2.0, 0.0)).with_parent(root))
            .unwrap();
        scene
            .add_component(leaf, TransformComponent::at(Vec3::new(0.0, 0.0, 3.0)).with_parent(mid))
            .unwrap();
        scene.awake(&mut NullDevice).unwrap();
        assert_eq!(scene.world_position(leaf).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(scene.world_scale(leaf).unwrap(), Vec3::splat(3.0));

        scene.move_entity(root, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(scene.world_position(leaf).unwrap(), Vec3::new(2.0, 2.0, 3.0));
    }

    #[test]
    fn parented_matrix_uses_parent_translation_and_composed_scale() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        scene.move_entity(rocket, Vec3::new(2.0, 0.0, 0.0)).unwrap();
        let m = scene.transform_matrix(cam).unwrap();
        // Composed scale is 1 + 1, which also stretches the local offset.
        assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(2.0, 10.0, 0.0), 1e-5));
    }

    #[test]
    fn parent_cycle_fails_awake() {
        let mut scene = Scene::new();
        let a = scene.spawn("a").unwrap();
        let b = scene.spawn("b").unwrap();
        scene.add_component(a, TransformComponent::default().with_parent(b)).unwrap();
        scene.add_component(b, TransformComponent::default().with_parent(a)).unwrap();
        assert!(matches!(scene.awake(&mut NullDevice), Err(SceneError::ParentCycle(_))));
        assert!(!scene.is_awake());
    }

    #[test]
    fn missing_parent_fails_awake() {
        let mut scene = Scene::new();
        let a = scene.spawn("orphan").unwrap();
        scene
            .add_component(a, TransformComponent::default().with_parent(EntityId(9)))
            .unwrap();
        assert!(matches!(
            scene.awake(&mut NullDevice),
            Err(SceneError::MissingParent { parent: EntityId(9), .. })
        ));
    }

    #[test]
    fn camera_without_transform_fails_awake() {
        let mut scene = Scene::new();
        let cam = scene.spawn("floating").unwrap();
        scene.add_component(cam, CameraComponent::default()).unwrap();
        assert!(matches!(
            scene.awake(&mut NullDevice),
            Err(SceneError::MissingComponent { kind: ComponentKind::Transform, .. })
        ));
    }

    #[test]
    fn awake_runs_once() {
        let (mut scene, _, _) = rocket_with_camera();
        assert!(matches!(scene.awake(&mut NullDevice), Err(SceneError::AlreadyAwake)));
    }

    #[test]
    fn removing_camera_drops_its_subscriptions() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        scene.remove_component(cam, ComponentKind::Camera).unwrap();
        assert!(!scene
            .observers_of(ComponentRef::transform(rocket))
            .contains(&ComponentRef::camera(cam)));
        assert_eq!(scene.move_entity(rocket, Vec3::X).unwrap(), 1);
    }

    #[test]
    fn stale_observers_are_skipped() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        // Bypass the scene so the subscription is left dangling.
        scene.get_mut(cam).unwrap().remove_component(ComponentKind::Camera);
        assert_eq!(scene.move_entity(rocket, Vec3::X).unwrap(), 1);
    }

    #[test]
    fn despawn_purges_edges() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        assert!(scene.despawn(cam).is_some());
        assert!(scene.observers_of(ComponentRef::transform(rocket)).is_empty());
        assert!(scene.despawn(cam).is_none());
    }

    #[test]
    fn filter_matches_all_required_kinds() {
        let (mut scene, rocket, cam) = rocket_with_camera();
        scene.add_component(rocket, LightComponent::default()).unwrap();
        assert_eq!(scene.filter(ComponentMask::TRANSFORM), vec![rocket, cam]);
        assert_eq!(scene.filter(ComponentMask::CAMERA), vec![cam]);
        assert_eq!(
            scene.filter(ComponentMask::LIGHT | ComponentMask::TRANSFORM),
            vec![rocket]
        );
    }
}
