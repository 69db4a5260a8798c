//! Plain data components. Only terrain and emitters carry awake-time work.

use ember_common::{
    BufferHandle, InstanceData, MeshHandle, ShaderHandle, ShaderProgram, SimpleVertex,
    TextureHandle,
};
use glam::{UVec3, Vec3, Vec4};

/// Surface material. `ambient.w` holds the specular power.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.2, 0.2, 0.2, 32.0),
            diffuse: Vec4::ONE,
            specular: Vec4::splat(0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderType {
    Normal,
    #[default]
    Indexed,
    InstancedIndexed,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderComponent {
    pub material: Material,
    pub render_type: RenderType,
    /// Whether the surface emits over-threshold light for bloom.
    pub hdr: bool,
    /// Whether the vertex shader animates the surface over time.
    pub animated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureComponent {
    pub albedo: TextureHandle,
    pub normal: Option<TextureHandle>,
    pub displacement: Option<TextureHandle>,
}

impl TextureComponent {
    pub fn albedo(albedo: TextureHandle) -> Self {
        Self {
            albedo,
            normal: None,
            displacement: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryComponent {
    pub mesh: MeshHandle,
    pub index_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderComponent {
    pub handle: ShaderHandle,
    pub program: ShaderProgram,
}

/// Voxel grid drawn as instances of the entity's mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainComponent {
    pub dimensions: UVec3,
    pub spacing: Vec3,
    /// Voxels at or below this height (in cells) are solid.
    pub fill_height: u32,
    instances: Option<(BufferHandle, u32)>,
}

impl TerrainComponent {
    pub fn new(dimensions: UVec3, spacing: Vec3, fill_height: u32) -> Self {
        Self {
            dimensions,
            spacing,
            fill_height,
            instances: None,
        }
    }

    /// One instance record per solid voxel, in x, then z, then y order.
    pub fn instances(&self) -> Vec<InstanceData> {
        let solid_rows = self.dimensions.y.min(self.fill_height + 1);
        let mut out = Vec::with_capacity((self.dimensions.x * self.dimensions.z * solid_rows) as usize);
        for y in 0..solid_rows {
            for z in 0..self.dimensions.z {
                for x in 0..self.dimensions.x {
                    let cell = UVec3::new(x, y, z);
                    let position = cell.as_vec3() * self.spacing;
                    let coords = cell.as_vec3() / self.dimensions.max(UVec3::ONE).as_vec3();
                    out.push(InstanceData {
                        position: position.to_array(),
                        coords: coords.to_array(),
                    });
                }
            }
        }
        out
    }

    pub fn attach_instances(&mut self, buffer: BufferHandle, count: u32) {
        self.instances = Some((buffer, count));
    }

    pub fn instance_buffer(&self) -> Option<BufferHandle> {
        self.instances.map(|(b, _)| b)
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.map_or(0, |(_, n)| n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightComponent {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Vec3,
    pub intensity: f32,
}

impl Default for LightComponent {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            attenuation: Vec3::new(1.0, 0.0, 0.0),
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Additive,
    Alpha,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitterComponent {
    pub start_colour: Vec3,
    pub end_colour: Vec3,
    pub velocity: f32,
    pub lifespan: f32,
    pub direction: Vec3,
    pub particle_count: u32,
    pub blend: BlendMode,
    vertices: Option<BufferHandle>,
}

impl EmitterComponent {
    pub const VERTICES_PER_PARTICLE: u32 = 6;

    pub fn new(particle_count: u32) -> Self {
        Self {
            start_colour: Vec3::new(1.0, 0.8, 0.2),
            end_colour: Vec3::new(0.6, 0.1, 0.0),
            velocity: 1.0,
            lifespan: 2.0,
            direction: Vec3::Y,
            particle_count,
            blend: BlendMode::default(),
            vertices: None,
        }
    }

    /// Two triangles per particle. The particle index is packed into the
    /// vertex z so the shader can stagger each particle's life.
    pub fn particle_vertices(&self) -> Vec<SimpleVertex> {
        const CORNERS: [([f32; 2], [f32; 2]); 6] = [
            ([-0.5, -0.5], [0.0, 1.0]),
            ([-0.5, 0.5], [0.0, 0.0]),
            ([0.5, 0.5], [1.0, 0.0]),
            ([-0.5, -0.5], [0.0, 1.0]),
            ([0.5, 0.5], [1.0, 0.0]),
            ([0.5, -0.5], [1.0, 1.0]),
        ];
        (0..self.particle_count)
            .flat_map(|i| {
                CORNERS.iter().map(move |(corner, uv)| SimpleVertex {
                    position: [corner[0], corner[1], i as f32],
                    uv: *uv,
                })
            })
            .collect()
    }

    pub fn vertex_count(&self) -> u32 {
        self.particle_count * Self::VERTICES_PER_PARTICLE
    }

    pub fn attach_vertices(&mut self, buffer: BufferHandle) {
        self.vertices = Some(buffer);
    }

    pub fn vertex_buffer(&self) -> Option<BufferHandle> {
        self.vertices
    }
}

/// Axis-aligned box consumed by the physics collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderComponent {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Default for ColliderComponent {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            half_extents: Vec3::splat(0.5),
        }
    }
}

impl ColliderComponent {
    pub fn contains(&self, point: Vec3) -> bool {
        (point - self.center).abs().cmple(self.half_extents).all()
    }
}
