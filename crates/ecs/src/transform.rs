use ember_common::{EntityId, euler_rotation};
use glam::{Mat4, Quat, Vec3};

/// World-space position, Euler orientation and scale of a transform.
///
/// Parented values compose additively: a child's world value is its parent's
/// world value plus the child's local value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialFrame {
    pub position: Vec3,
    pub orientation: Vec3,
    pub scale: Vec3,
}

impl SpatialFrame {
    pub const IDENTITY: SpatialFrame = SpatialFrame {
        position: Vec3::ZERO,
        orientation: Vec3::ZERO,
        scale: Vec3::ONE,
    };
}

/// Position, Euler orientation and scale with an optional parent link.
///
/// The construction values are kept as a restore point for [`reset`].
///
/// [`reset`]: TransformComponent::reset
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    position: Vec3,
    orientation: Vec3,
    scale: Vec3,
    original: SpatialFrame,
    parent: Option<EntityId>,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO, Vec3::ONE, None)
    }
}

impl TransformComponent {
    pub fn new(position: Vec3, orientation: Vec3, scale: Vec3, parent: Option<EntityId>) -> Self {
        Self {
            position,
            orientation,
            scale,
            original: SpatialFrame {
                position,
                orientation,
                scale,
            },
            parent,
        }
    }

    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO, Vec3::ONE, None)
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn local_position(&self) -> Vec3 {
        self.position
    }

    pub fn local_orientation(&self) -> Vec3 {
        self.orientation
    }

    pub fn local_scale(&self) -> Vec3 {
        self.scale
    }

    pub fn original(&self) -> SpatialFrame {
        self.original
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Add `delta` to the local position. Observers are notified by the scene.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Accumulate `axis * angle` into the Euler orientation.
    pub fn accumulate_rotation(&mut self, axis: Vec3, angle: f32) {
        self.orientation += axis * angle;
    }

    /// Rotate the local position about `axis` through the origin.
    pub fn orbit_position(&mut self, axis: Vec3, angle: f32) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        self.position = Quat::from_axis_angle(axis, angle) * self.position;
    }

    /// Restore position, orientation and scale to their construction values.
    pub fn reset(&mut self) {
        self.position = self.original.position;
        self.orientation = self.original.orientation;
        self.scale = self.original.scale;
    }

    /// World values given the parent's world frame (`None` when unparented).
    pub fn world_frame(&self, parent: Option<SpatialFrame>) -> SpatialFrame {
        match parent {
            Some(p) => SpatialFrame {
                position: p.position + self.position,
                orientation: p.orientation + self.orientation,
                scale: p.scale + self.scale,
            },
            None => SpatialFrame {
                position: self.position,
                orientation: self.orientation,
                scale: self.scale,
            },
        }
    }

    /// Composite model matrix.
    ///
    /// Unparented: rotation (X, then Y, then Z), then scale, then translation.
    /// Parented: local translation, then the parent's world rotation, then the
    /// composed scale, then the parent's world translation. The child's own
    /// orientation does not contribute in the parented form.
    pub fn compose(&self, parent: Option<SpatialFrame>) -> Mat4 {
        match parent {
            None => {
                Mat4::from_translation(self.position)
                    * Mat4::from_scale(self.scale)
                    * euler_rotation(self.orientation)
            }
            Some(p) => {
                let world = self.world_frame(Some(p));
                Mat4::from_translation(p.position)
                    * Mat4::from_scale(world.scale)
                    * euler_rotation(p.orientation)
                    * Mat4::from_translation(self.position)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn reset_restores_construction_values() {
        let mut t = TransformComponent::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.1, 0.0, 0.0),
            Vec3::splat(2.0),
            None,
        );
        t.translate(Vec3::new(5.0, 0.0, 0.0));
        t.accumulate_rotation(Vec3::Y, 1.0);
        t.orbit_position(Vec3::Z, 0.5);
        t.reset();
        assert_eq!(t.local_position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.local_orientation(), Vec3::new(0.1, 0.0, 0.0));
        assert_eq!(t.local_scale(), Vec3::splat(2.0));
    }

    #[test]
    fn rotation_accumulates_axis_times_angle() {
        let mut t = TransformComponent::default();
        t.accumulate_rotation(Vec3::Y, 0.25);
        t.accumulate_rotation(Vec3::Y, 0.25);
        t.accumulate_rotation(Vec3::X, 1.0);
        assert!(t.local_orientation().abs_diff_eq(Vec3::new(1.0, 0.5, 0.0), 1e-6));
    }

    #[test]
    fn orbit_rotates_position_about_axis() {
        let mut t = TransformComponent::at(Vec3::X);
        t.orbit_position(Vec3::Y, FRAC_PI_2);
        assert!(t.local_position().abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn orbit_about_zero_axis_is_ignored() {
        let mut t = TransformComponent::at(Vec3::X);
        t.orbit_position(Vec3::ZERO, 1.0);
        assert_eq!(t.local_position(), Vec3::X);
    }

    #[test]
    fn world_frame_is_additive() {
        let parent = SpatialFrame {
            position: Vec3::new(1.0, 0.0, 0.0),
            orientation: Vec3::new(0.0, 0.5, 0.0),
            scale: Vec3::ONE,
        };
        let child = TransformComponent::at(Vec3::new(0.0, 5.0, 0.0));
        let world = child.world_frame(Some(parent));
        assert_eq!(world.position, Vec3::new(1.0, 5.0, 0.0));
        assert_eq!(world.orientation, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(world.scale, Vec3::splat(2.0));
    }

    #[test]
    fn unparented_matrix_translates_last() {
        let t = TransformComponent::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(0.0, FRAC_PI_2, 0.0),
            Vec3::splat(2.0),
            None,
        );
        let m = t.compose(None);
        // +X yaws onto -Z, doubles in length, then moves +10 along Z.
        let p = m.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, 8.0), 1e-5));
    }

    #[test]
    fn parented_matrix_places_child_at_parent_plus_local() {
        let parent = SpatialFrame::IDENTITY;
        let child = TransformComponent::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::ZERO, None);
        let m = child.compose(Some(parent));
        assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(0.0, 5.0, 0.0), 1e-5));
    }

    #[test]
    fn compose_follows_local_state() {
        let mut t = TransformComponent::at(Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(t.compose(None).w_axis.truncate(), Vec3::new(3.0, 0.0, 0.0));
        t.translate(Vec3::Y);
        assert_eq!(t.compose(None).w_axis.truncate(), Vec3::new(3.0, 1.0, 0.0));
    }
}
