use serde::{Deserialize, Serialize};
use std::fmt;

/// Small integer identity of an entity within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u8);

impl EntityId {
    pub const MAX: EntityId = EntityId(u8::MAX);

    /// The id following this one, or `None` once the id space is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a device vertex or instance buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferHandle(pub u32);

/// Opaque handle to an uploaded mesh (vertex + index buffer pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub u32);

/// Opaque handle to a sampled texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

/// Opaque handle to a compiled shader program and its vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderHandle(pub u32);

/// The fixed catalogue of shader programs the engine knows how to build.
///
/// Scene shaders (`GBuffer*`) read [`crate::Vertex`]; post-process quads and
/// particles read [`crate::SimpleVertex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderProgram {
    #[serde(rename = "gbuffer")]
    GBuffer,
    #[serde(rename = "gbuffer_instanced")]
    GBufferInstanced,
    SunShadow,
    SunShadowInstanced,
    MoonShadow,
    MoonShadowInstanced,
    LightPass,
    BrightPass,
    Blur,
    Composite,
    Particle,
}

impl ShaderProgram {
    pub const ALL: [ShaderProgram; 11] = [
        Self::GBuffer,
        Self::GBufferInstanced,
        Self::SunShadow,
        Self::SunShadowInstanced,
        Self::MoonShadow,
        Self::MoonShadowInstanced,
        Self::LightPass,
        Self::BrightPass,
        Self::Blur,
        Self::Composite,
        Self::Particle,
    ];

    /// Whether the program consumes a per-instance stream in vertex slot 1.
    pub fn is_instanced(self) -> bool {
        matches!(
            self,
            Self::GBufferInstanced | Self::SunShadowInstanced | Self::MoonShadowInstanced
        )
    }

    /// Whether the program reads the full scene [`crate::Vertex`] layout.
    pub fn uses_scene_vertices(self) -> bool {
        matches!(
            self,
            Self::GBuffer
                | Self::GBufferInstanced
                | Self::SunShadow
                | Self::SunShadowInstanced
                | Self::MoonShadow
                | Self::MoonShadowInstanced
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::GBuffer => "gbuffer",
            Self::GBufferInstanced => "gbuffer_instanced",
            Self::SunShadow => "sun_shadow",
            Self::SunShadowInstanced => "sun_shadow_instanced",
            Self::MoonShadow => "moon_shadow",
            Self::MoonShadowInstanced => "moon_shadow_instanced",
            Self::LightPass => "light_pass",
            Self::BrightPass => "bright_pass",
            Self::Blur => "blur",
            Self::Composite => "composite",
            Self::Particle => "particle",
        }
    }
}

impl fmt::Display for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_next_stops_at_limit() {
        assert_eq!(EntityId(3).next(), Some(EntityId(4)));
        assert_eq!(EntityId::MAX.next(), None);
    }

    #[test]
    fn instanced_programs() {
        let instanced: Vec<_> = ShaderProgram::ALL
            .iter()
            .copied()
            .filter(|p| p.is_instanced())
            .collect();
        assert_eq!(instanced.len(), 3);
        assert!(instanced.iter().all(|p| p.uses_scene_vertices()));
    }

    #[test]
    fn program_names_are_unique() {
        let mut names: Vec<_> = ShaderProgram::ALL.iter().map(|p| p.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ShaderProgram::ALL.len());
    }

    #[test]
    fn serialized_names_match_display() {
        for program in ShaderProgram::ALL {
            let json = serde_json::to_string(&program).unwrap();
            assert_eq!(json, format!("\"{program}\""));
        }
    }
}
