//! Built-in meshes.

use ember_common::{SimpleVertex, Vertex};
use serde::{Deserialize, Serialize};

/// Meshes a scene description can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    /// Unit cube centred on the origin, 24 vertices so each face has its own normal.
    Cube,
    /// Unit square in the XZ plane facing +Y.
    Plane,
    /// Full-screen quad in clip space for post-process passes.
    Quad,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeshVertices {
    Scene(Vec<Vertex>),
    Simple(Vec<SimpleVertex>),
}

/// Host-side mesh ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub label: String,
    pub vertices: MeshVertices,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn stride(&self) -> u32 {
        match self.vertices {
            MeshVertices::Scene(_) => Vertex::STRIDE,
            MeshVertices::Simple(_) => SimpleVertex::STRIDE,
        }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        match &self.vertices {
            MeshVertices::Scene(v) => bytemuck::cast_slice(v),
            MeshVertices::Simple(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn vertex_count(&self) -> usize {
        match &self.vertices {
            MeshVertices::Scene(v) => v.len(),
            MeshVertices::Simple(v) => v.len(),
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

impl Primitive {
    pub fn mesh(self) -> MeshData {
        match self {
            Self::Cube => cube(),
            Self::Plane => plane(),
            Self::Quad => fullscreen_quad(),
        }
    }

    /// Whether the mesh uses the scene vertex layout.
    pub fn is_scene_mesh(self) -> bool {
        !matches!(self, Self::Quad)
    }
}

/// Two triangles over four corners given counter-clockwise.
fn quad_indices(base: u32) -> [u32; 6] {
    [base, base + 1, base + 2, base, base + 2, base + 3]
}

pub fn cube() -> MeshData {
    // (normal, u axis, v axis) per face; corners are normal/2 +- u/2 +- v/2.
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    const CORNERS: [([f32; 2], [f32; 2]); 4] = [
        ([-0.5, -0.5], [0.0, 1.0]),
        ([0.5, -0.5], [1.0, 1.0]),
        ([0.5, 0.5], [1.0, 0.0]),
        ([-0.5, 0.5], [0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (face, (normal, u, v)) in FACES.iter().enumerate() {
        for (corner, uv) in CORNERS {
            let position = std::array::from_fn(|i| normal[i] * 0.5 + u[i] * corner[0] + v[i] * corner[1]);
            vertices.push(Vertex::new(position, *normal, uv));
        }
        indices.extend(quad_indices(face as u32 * 4));
    }
    MeshData {
        label: "cube".into(),
        vertices: MeshVertices::Scene(vertices),
        indices,
    }
}

pub fn plane() -> MeshData {
    let up = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex::new([-0.5, 0.0, 0.5], up, [0.0, 1.0]),
        Vertex::new([0.5, 0.0, 0.5], up, [1.0, 1.0]),
        Vertex::new([0.5, 0.0, -0.5], up, [1.0, 0.0]),
        Vertex::new([-0.5, 0.0, -0.5], up, [0.0, 0.0]),
    ];
    MeshData {
        label: "plane".into(),
        vertices: MeshVertices::Scene(vertices),
        indices: quad_indices(0).to_vec(),
    }
}

/// Clip-space quad covering the viewport. Texture space has its origin at
/// the top left, so uv (0, 0) sits at clip (-1, 1).
pub fn fullscreen_quad() -> MeshData {
    let vertices = vec![
        SimpleVertex {
            position: [-1.0, -1.0, 0.0],
            uv: [0.0, 1.0],
        },
        SimpleVertex {
            position: [1.0, -1.0, 0.0],
            uv: [1.0, 1.0],
        },
        SimpleVertex {
            position: [1.0, 1.0, 0.0],
            uv: [1.0, 0.0],
        },
        SimpleVertex {
            position: [-1.0, 1.0, 0.0],
            uv: [0.0, 0.0],
        },
    ];
    MeshData {
        label: "fullscreen_quad".into(),
        vertices: MeshVertices::Simple(vertices),
        indices: quad_indices(0).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn cube_faces_point_outward() {
        let mesh = cube();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        let MeshVertices::Scene(vertices) = &mesh.vertices else {
            panic!("cube uses scene vertices");
        };
        for v in vertices {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            assert!(p.dot(n) > 0.49, "{p:?} . {n:?}");
            assert!(p.abs().max_element() <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn indices_stay_in_range() {
        for primitive in [Primitive::Cube, Primitive::Plane, Primitive::Quad] {
            let mesh = primitive.mesh();
            let count = mesh.vertex_count() as u32;
            assert!(mesh.indices.iter().all(|&i| i < count), "{primitive:?}");
            assert_eq!(mesh.vertex_bytes().len() as u32, count * mesh.stride());
            assert_eq!(primitive.is_scene_mesh(), mesh.stride() == Vertex::STRIDE);
        }
    }

    #[test]
    fn quad_uv_origin_is_top_left() {
        let MeshVertices::Simple(vertices) = fullscreen_quad().vertices else {
            panic!("quad uses simple vertices");
        };
        let top_left = vertices
            .iter()
            .find(|v| v.position[0] < 0.0 && v.position[1] > 0.0)
            .unwrap();
        assert_eq!(top_left.uv, [0.0, 0.0]);
        let bottom_right = vertices
            .iter()
            .find(|v| v.position[0] > 0.0 && v.position[1] < 0.0)
            .unwrap();
        assert_eq!(bottom_right.uv, [1.0, 1.0]);
    }

    #[test]
    fn primitive_names() {
        let p: Primitive = serde_json::from_str("\"cube\"").unwrap();
        assert_eq!(p, Primitive::Cube);
        assert_eq!(serde_json::to_string(&Primitive::Quad).unwrap(), "\"quad\"");
    }
}
