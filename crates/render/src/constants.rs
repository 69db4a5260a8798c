//! Host-side mirrors of the per-frame constant buffers.
//!
//! Every struct is `#[repr(C)]` with 16-byte aligned members so the bytes can
//! be uploaded unchanged. Matrices are column-major.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use std::fmt;

/// The eight constant buffers and the slots they occupy in every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstantBuffer {
    Draw,
    Update,
    RenderState,
    ViewProj,
    Mrt,
    Light,
    Blur,
    Particle,
}

impl ConstantBuffer {
    pub const ALL: [ConstantBuffer; 8] = [
        Self::Draw,
        Self::Update,
        Self::RenderState,
        Self::ViewProj,
        Self::Mrt,
        Self::Light,
        Self::Blur,
        Self::Particle,
    ];

    /// Default slot of the buffer.
    pub fn slot(self) -> u32 {
        self as u32
    }

    pub fn size(self) -> usize {
        match self {
            Self::Draw => std::mem::size_of::<DrawConstants>(),
            Self::Update => std::mem::size_of::<UpdateConstants>(),
            Self::RenderState | Self::Mrt | Self::Blur => std::mem::size_of::<MiscConstants>(),
            Self::ViewProj => std::mem::size_of::<ViewProjConstants>(),
            Self::Light => std::mem::size_of::<LightConstants>(),
            Self::Particle => std::mem::size_of::<ParticleConstants>(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Draw => "draw",
            Self::Update => "update",
            Self::RenderState => "render-state",
            Self::ViewProj => "view-projection",
            Self::Mrt => "mrt",
            Self::Light => "light",
            Self::Blur => "blur",
            Self::Particle => "particle",
        }
    }
}

impl fmt::Display for ConstantBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-draw model data. `misc`: x = exposure, y = HDR, z = animated.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawConstants {
    pub model: [[f32; 4]; 4],
    pub mvp: [[f32; 4]; 4],
    pub misc: [f32; 4],
}

impl Default for DrawConstants {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            mvp: Mat4::IDENTITY.to_cols_array_2d(),
            misc: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

impl DrawConstants {
    pub fn set_matrices(&mut self, model: Mat4, view_proj: Mat4) {
        self.model = model.to_cols_array_2d();
        self.mvp = (view_proj * model).to_cols_array_2d();
    }
}

/// Camera position and timing. `time.x` is elapsed seconds, `delta.x` the
/// scaled frame delta.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct UpdateConstants {
    pub camera_position: [f32; 4],
    pub time: [f32; 2],
    pub delta: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewProjConstants {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub inverse_view: [[f32; 4]; 4],
    pub inverse_projection: [[f32; 4]; 4],
}

impl Default for ViewProjConstants {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

impl ViewProjConstants {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            inverse_view: view.inverse().to_cols_array_2d(),
            inverse_projection: projection.inverse().to_cols_array_2d(),
        }
    }
}

/// One shadow-casting light. `ambient.w` carries the intensity.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightData {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub attenuation: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl LightData {
    pub fn new(position: Vec3, light: &ember_ecs::LightComponent) -> Self {
        Self {
            position: position.extend(1.0).to_array(),
            ambient: light.ambient.extend(light.intensity).to_array(),
            diffuse: light.diffuse.extend(1.0).to_array(),
            specular: light.specular.extend(1.0).to_array(),
            attenuation: light.attenuation.extend(1.0).to_array(),
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// Sun and moon. `light_count.x` is how many entries are live; the light
/// pass shades every live entry, so a second light adds to the first rather
/// than being ignored.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    pub lights: [LightData; 2],
    pub light_count: [f32; 4],
}

/// Four loose floats; used for render state, MRT selection and blur.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MiscConstants {
    pub misc: [f32; 4],
}

impl MiscConstants {
    pub fn new(misc: Vec4) -> Self {
        Self {
            misc: misc.to_array(),
        }
    }
}

/// Per-emitter particle data. `misc`: x = velocity, y = lifespan.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleConstants {
    pub start_colour: [f32; 4],
    pub end_colour: [f32; 4],
    pub direction: [f32; 4],
    pub emitter_position: [f32; 4],
    pub misc: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_sixteen_byte_multiples() {
        for buffer in ConstantBuffer::ALL {
            assert_eq!(buffer.size() % 16, 0, "{buffer} is {} bytes", buffer.size());
        }
        assert_eq!(std::mem::size_of::<LightData>(), 144);
        assert_eq!(std::mem::size_of::<LightConstants>(), 304);
    }

    #[test]
    fn slots_are_stable() {
        let slots: Vec<u32> = ConstantBuffer::ALL.iter().map(|b| b.slot()).collect();
        assert_eq!(slots, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn mvp_is_view_proj_times_model() {
        let mut draw = DrawConstants::default();
        let model = Mat4::from_translation(Vec3::X);
        let view_proj = Mat4::from_scale(Vec3::splat(2.0));
        draw.set_matrices(model, view_proj);
        let mvp = Mat4::from_cols_array_2d(&draw.mvp);
        assert!(mvp.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn light_data_packs_intensity() {
        let light = ember_ecs::LightComponent {
            intensity: 0.7,
            ..Default::default()
        };
        let data = LightData::new(Vec3::new(1.0, 2.0, 3.0), &light);
        assert_eq!(data.position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(data.ambient[3], 0.7);
    }
}
