use glam::Vec3;

/// A high-level operator action.
///
/// The frame loop consumes actions, never raw key events, so any front end
/// (window, CLI script, test) drives the renderer the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Step the render mode ring, from wireframe through textured and displaced.
    AdvanceRenderMode,
    /// Step the debug output ring through the G-buffer views.
    AdvanceMrtMode,
    /// Make the camera at this index in the director active.
    SelectCamera(usize),
    /// Raise the time multiplier by one step.
    SpeedUp,
    /// Lower the time multiplier by one step.
    SlowDown,
    /// Move the active camera's transform, in world units per second of
    /// scaled frame time.
    MoveCamera(Vec3),
    /// Turn the active camera by Euler angles, in radians per second of
    /// scaled frame time.
    RotateCamera(Vec3),
    /// Bound to nothing.
    Noop,
}

impl Action {
    /// The same action with any movement or turn scaled by `factor`.
    pub fn scaled(self, factor: f32) -> Self {
        match self {
            Self::MoveCamera(delta) => Self::MoveCamera(delta * factor),
            Self::RotateCamera(angles) => Self::RotateCamera(angles * factor),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_only_touches_camera_motion() {
        assert_eq!(
            Action::MoveCamera(Vec3::new(1.0, 0.0, -2.0)).scaled(0.5),
            Action::MoveCamera(Vec3::new(0.5, 0.0, -1.0))
        );
        assert_eq!(
            Action::RotateCamera(Vec3::Y).scaled(0.25),
            Action::RotateCamera(Vec3::new(0.0, 0.25, 0.0))
        );
        assert_eq!(Action::SelectCamera(2).scaled(10.0), Action::SelectCamera(2));
        assert_eq!(Action::SpeedUp.scaled(0.0), Action::SpeedUp);
    }
}
