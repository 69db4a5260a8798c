use crate::error::SceneError;
use crate::scene::Scene;
use ember_common::{EntityId, euler_rotation};
use ember_ecs::{CameraComponent, ComponentKind, ComponentMask, Entity};
use glam::Vec3;

/// Ordered list of the scene's cameras and which one is active.
#[derive(Debug, Clone, Default)]
pub struct CameraDirector {
    cameras: Vec<EntityId>,
    active: usize,
}

impl CameraDirector {
    /// Collect every camera entity in id order; the first becomes active.
    pub fn from_scene(scene: &Scene) -> Self {
        Self {
            cameras: scene.filter(ComponentMask::CAMERA | ComponentMask::TRANSFORM),
            active: 0,
        }
    }

    pub fn cameras(&self) -> &[EntityId] {
        &self.cameras
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> Option<EntityId> {
        self.cameras.get(self.active).copied()
    }

    /// Make camera `index` active. Out-of-range indices keep the current one.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.cameras.len() {
            tracing::debug!(index, available = self.cameras.len(), "no camera at index");
            return false;
        }
        self.active = index;
        tracing::debug!(index, camera = ?self.cameras[index], "camera selected");
        true
    }

    pub fn active_camera<'a>(&self, scene: &'a Scene) -> Option<&'a CameraComponent> {
        scene.get(self.active()?).and_then(Entity::camera)
    }

    /// Move the active camera's transform; its observers re-frame it.
    pub fn move_active(&self, scene: &mut Scene, delta: Vec3) -> Result<usize, SceneError> {
        match self.active() {
            Some(id) => scene.move_entity(id, delta),
            None => Ok(0),
        }
    }

    /// Turn the active camera by Euler `angles`. The transform's orientation
    /// accumulates them (silently, like any rotation) and the look direction
    /// swings about the camera position. Returns whether a camera turned.
    pub fn rotate_active(&self, scene: &mut Scene, angles: Vec3) -> Result<bool, SceneError> {
        let Some(id) = self.active() else {
            return Ok(false);
        };
        scene.rotate_entity(id, angles, 1.0)?;
        let camera = scene
            .entity_mut(id)?
            .camera_mut()
            .ok_or(SceneError::MissingComponent {
                entity: id,
                kind: ComponentKind::Camera,
            })?;
        let position = camera.position();
        let direction = euler_rotation(angles).transform_vector3(camera.look_at() - position);
        camera.set_look_at(position + direction);
        tracing::trace!(camera = %id, ?angles, "camera turned");
        Ok(true)
    }

    /// Update every camera's projection for a new output size.
    pub fn resize(&self, scene: &mut Scene, width: u32, height: u32) {
        for &id in &self.cameras {
            if let Some(camera) = scene.get_mut(id).and_then(Entity::camera_mut) {
                camera.update_projection(width, height);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_ecs::TransformComponent;

    fn two_camera_scene() -> Scene {
        let mut scene = Scene::new();
        for (name, z) in [("front", -10.0), ("back", 10.0)] {
            let id = scene.spawn(name).unwrap();
            scene.add_component(id, TransformComponent::at(Vec3::new(0.0, 2.0, z))).unwrap();
            scene.add_component(id, CameraComponent::default()).unwrap();
        }
        let prop = scene.spawn("prop").unwrap();
        scene.add_component(prop, TransformComponent::default()).unwrap();
        scene
    }

    #[test]
    fn select_switches_active_camera() {
        let scene = two_camera_scene();
        let mut director = CameraDirector::from_scene(&scene);
        assert_eq!(director.cameras().len(), 2);
        assert_eq!(director.active(), Some(EntityId(0)));
        assert!(director.select(1));
        assert_eq!(director.active(), Some(EntityId(1)));
        assert!(!director.select(5));
        assert_eq!(director.active_index(), 1);
    }

    #[test]
    fn move_active_reframes_through_observers() {
        let mut scene = two_camera_scene();
        scene.awake(&mut crate::tests::NullDevice).unwrap();
        let director = CameraDirector::from_scene(&scene);
        director.move_active(&mut scene, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let camera = director.active_camera(&scene).unwrap();
        assert_eq!(camera.position(), Vec3::new(1.0, 2.0, -10.0));
    }

    #[test]
    fn rotate_active_swings_the_look_direction() {
        let mut scene = two_camera_scene();
        scene.awake(&mut crate::tests::NullDevice).unwrap();
        let director = CameraDirector::from_scene(&scene);
        // front camera at (0, 2, -10) looks at the origin along +Z (and down).
        let quarter = std::f32::consts::FRAC_PI_2;
        assert!(director.rotate_active(&mut scene, Vec3::new(0.0, quarter, 0.0)).unwrap());

        let camera = director.active_camera(&scene).unwrap();
        assert_eq!(camera.position(), Vec3::new(0.0, 2.0, -10.0));
        let turned = camera.look_at() - camera.position();
        assert!(turned.abs_diff_eq(Vec3::new(10.0, -2.0, 0.0), 1e-4));
        let orientation = scene.transform(EntityId(0)).unwrap().local_orientation();
        assert!(orientation.abs_diff_eq(Vec3::new(0.0, quarter, 0.0), 1e-6));
    }

    #[test]
    fn turn_size_follows_the_requested_angle() {
        let mut slow = two_camera_scene();
        let mut fast = two_camera_scene();
        slow.awake(&mut crate::tests::NullDevice).unwrap();
        fast.awake(&mut crate::tests::NullDevice).unwrap();
        let director = CameraDirector::from_scene(&slow);
        director.rotate_active(&mut slow, Vec3::new(0.0, 0.1, 0.0)).unwrap();
        director.rotate_active(&mut fast, Vec3::new(0.0, 0.2, 0.0)).unwrap();

        let forward = Vec3::new(0.0, -2.0, 10.0).normalize();
        let swing = |scene: &Scene| {
            let camera = director.active_camera(scene).unwrap();
            (camera.look_at() - camera.position()).normalize().angle_between(forward)
        };
        assert!(swing(&slow) > 0.0);
        assert!(swing(&fast) > swing(&slow));
    }

    #[test]
    fn resize_updates_every_projection() {
        let mut scene = two_camera_scene();
        let director = CameraDirector::from_scene(&scene);
        director.resize(&mut scene, 640, 640);
        for &id in director.cameras() {
            assert_eq!(scene.get(id).and_then(Entity::camera).unwrap().viewport(), (640, 640));
        }
    }

    #[test]
    fn empty_scene_has_no_active_camera() {
        let mut scene = Scene::new();
        let director = CameraDirector::from_scene(&scene);
        assert!(director.active().is_none());
        assert_eq!(director.move_active(&mut scene, Vec3::X).unwrap(), 0);
        assert!(!director.rotate_active(&mut scene, Vec3::Y).unwrap());
    }
}
