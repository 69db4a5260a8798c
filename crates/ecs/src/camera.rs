use ember_common::EntityId;
use glam::{Mat4, Vec3};
use std::f32::consts::FRAC_PI_2;

const MIN_VIEW_DISTANCE_SQ: f32 = 1e-12;

/// Perspective camera deriving its view from an observed transform.
///
/// With a parent, the camera sits at `parent world position + offset` and
/// looks at the parent. Without one it follows its own transform and keeps
/// whatever look-at target it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraComponent {
    position: Vec3,
    look_at: Vec3,
    up: Vec3,
    offset: Vec3,
    fov: f32,
    near: f32,
    far: f32,
    width: u32,
    height: u32,
    view: Mat4,
    projection: Mat4,
    parent: Option<EntityId>,
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Y, FRAC_PI_2, 0.01, 100.0, 1280, 720)
    }
}

impl CameraComponent {
    pub fn new(look_at: Vec3, up: Vec3, fov: f32, near: f32, far: f32, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            look_at,
            up,
            offset: Vec3::ZERO,
            fov,
            near,
            far,
            width,
            height,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            parent: None,
        };
        camera.update_projection(width, height);
        camera.update_view();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Left-handed look-at from the current position.
    ///
    /// A degenerate frame (position on the target) keeps the previous view.
    pub fn update_view(&mut self) {
        if (self.look_at - self.position).length_squared() < MIN_VIEW_DISTANCE_SQ {
            tracing::trace!(position = ?self.position, "camera sits on its target, view kept");
            return;
        }
        self.view = Mat4::look_at_lh(self.position, self.look_at, self.up);
    }

    /// Left-handed perspective for the given output size.
    pub fn update_projection(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        let aspect = self.width as f32 / self.height as f32;
        self.projection = Mat4::perspective_lh(self.fov, aspect, self.near, self.far);
    }

    /// Wire the camera to its transform. `position` is the transform's world
    /// position and `offset` its local position.
    pub fn attach(&mut self, position: Vec3, offset: Vec3, parent: Option<EntityId>) {
        self.position = position;
        self.offset = offset;
        self.parent = parent;
    }

    /// The parent moved: look at it from `parent + offset`.
    pub fn follow_parent(&mut self, parent_position: Vec3) {
        self.look_at = parent_position;
        self.position = parent_position + self.offset;
        self.update_view();
    }

    /// A non-parent transform moved: take its world position as our own.
    pub fn follow_transform(&mut self, world_position: Vec3) {
        self.position = world_position;
        self.update_view();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    pub fn set_look_at(&mut self, target: Vec3) {
        self.look_at = target;
        self.update_view();
    }
}
