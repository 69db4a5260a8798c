use ember_common::euler_rotation;
use glam::{Mat4, Vec3};

/// Left-handed view from the light towards the world origin. The up vector
/// is +Y carried through the light's Euler orientation.
pub fn light_view(position: Vec3, orientation: Vec3) -> Mat4 {
    let Some(forward) = (-position).try_normalize() else {
        tracing::warn!("light placed at the origin has no view direction");
        return Mat4::IDENTITY;
    };
    let mut up = euler_rotation(orientation).transform_vector3(Vec3::Y);
    if up.cross(forward).length_squared() < 1e-8 {
        up = Vec3::Z;
    }
    Mat4::look_at_lh(position, Vec3::ZERO, up)
}

/// Orthographic shadow view-projection: a cube of half extent `radius`
/// centred on the world origin as seen in light space.
pub fn shadow_view_projection(position: Vec3, orientation: Vec3, radius: f32) -> Mat4 {
    let view = light_view(position, orientation);
    let c = view.transform_point3(Vec3::ZERO);
    let projection = Mat4::orthographic_lh(
        c.x - radius,
        c.x + radius,
        c.y - radius,
        c.y + radius,
        c.z - radius,
        c.z + radius,
    );
    projection * view
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_lands_mid_volume() {
        let vp = shadow_view_projection(Vec3::new(20.0, 30.0, -10.0), Vec3::ZERO, 35.0);
        let ndc = vp.project_point3(Vec3::ZERO);
        assert!(ndc.abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), 1e-4), "{ndc:?}");
    }

    #[test]
    fn radius_bounds_the_volume() {
        let position = Vec3::new(0.0, 0.0, -50.0);
        let vp = shadow_view_projection(position, Vec3::ZERO, 10.0);
        // Looking down +Z with +Y up, world +X is light-space +X.
        let edge = vp.project_point3(Vec3::new(10.0, 0.0, 0.0));
        assert!((edge.x - 1.0).abs() < 1e-4, "{edge:?}");
    }

    #[test]
    fn overhead_light_stays_finite() {
        let vp = shadow_view_projection(Vec3::new(0.0, 40.0, 0.0), Vec3::ZERO, 35.0);
        assert!(vp.is_finite());
    }

    #[test]
    fn light_at_origin_falls_back_to_identity() {
        assert_eq!(light_view(Vec3::ZERO, Vec3::ZERO), Mat4::IDENTITY);
    }
}
