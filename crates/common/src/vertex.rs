use bytemuck::{Pod, Zeroable};

/// Full scene vertex: position, normal, tangent, binormal, uv.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub binormal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        let (tangent, binormal) = tangent_frame(normal);
        Self {
            position,
            normal,
            tangent,
            binormal,
            uv,
        }
    }
}

/// Position + uv vertex used by full-screen quads and particles.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SimpleVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl SimpleVertex {
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;
}

/// Per-instance record for voxel terrain: world offset and grid coordinates.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub position: [f32; 3],
    pub coords: [f32; 3],
}

impl InstanceData {
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;
}

/// An orthonormal tangent/binormal pair for an axis-aligned normal.
fn tangent_frame(normal: [f32; 3]) -> ([f32; 3], [f32; 3]) {
    let n = glam::Vec3::from(normal);
    let reference = if n.y.abs() > 0.9 {
        glam::Vec3::X
    } else {
        glam::Vec3::Y
    };
    let tangent = reference.cross(n).normalize_or_zero();
    let binormal = n.cross(tangent);
    (tangent.to_array(), binormal.to_array())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_match_shader_layouts() {
        assert_eq!(Vertex::STRIDE, 56);
        assert_eq!(SimpleVertex::STRIDE, 20);
        assert_eq!(InstanceData::STRIDE, 24);
    }

    #[test]
    fn tangent_frame_is_orthogonal() {
        let v = Vertex::new([0.0; 3], [0.0, 0.0, 1.0], [0.0; 2]);
        let n = glam::Vec3::from(v.normal);
        let t = glam::Vec3::from(v.tangent);
        let b = glam::Vec3::from(v.binormal);
        assert!(n.dot(t).abs() < 1e-6);
        assert!(n.dot(b).abs() < 1e-6);
        assert!((t.length() - 1.0).abs() < 1e-6);
    }
}
