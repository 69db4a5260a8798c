use glam::{Mat4, Vec3};

/// Rotation matrix for accumulated Euler angles, applying X, then Y, then Z.
pub fn euler_rotation(angles: Vec3) -> Mat4 {
    Mat4::from_rotation_z(angles.z) * Mat4::from_rotation_y(angles.y) * Mat4::from_rotation_x(angles.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_angles_are_identity() {
        assert_eq!(euler_rotation(Vec3::ZERO), Mat4::IDENTITY);
    }

    #[test]
    fn x_is_applied_before_y() {
        let m = euler_rotation(Vec3::new(
            std::f32::consts::FRAC_PI_2,
            std::f32::consts::FRAC_PI_2,
            0.0,
        ));
        // +Y rotated about X lands on +Z, which the Y rotation carries to +X.
        let p = m.transform_vector3(Vec3::Y);
        assert!(p.abs_diff_eq(Vec3::X, 1e-5), "{p:?}");
    }
}
