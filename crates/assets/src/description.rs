//! Serialized scene layout.
//!
//! Entities are listed by name; parents and textures are referenced by name
//! and resolved when the scene is built. Every component is optional.

use crate::error::AssetError;
use crate::primitives::Primitive;
use ember_common::ShaderProgram;
use ember_ecs::{BlendMode, ColliderComponent, LightComponent, Material};
use ember_render::RendererConfig;
use glam::{UVec3, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Renderer overrides; missing fields keep their defaults.
    pub renderer: Option<RendererConfig>,
    /// Named solid-colour textures.
    pub textures: BTreeMap<String, TextureDescription>,
    pub entities: Vec<EntityDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureDescription {
    pub colour: [u8; 4],
    #[serde(default = "one")]
    pub size: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDescription {
    pub name: String,
    pub transform: Option<TransformDescription>,
    pub camera: Option<CameraDescription>,
    pub mesh: Option<Primitive>,
    pub shader: Option<ShaderProgram>,
    pub render: Option<RenderDescription>,
    /// Name of an entry in [`SceneDescription::textures`].
    pub texture: Option<String>,
    pub light: Option<LightDescription>,
    pub terrain: Option<TerrainDescription>,
    pub emitter: Option<EmitterDescription>,
    pub collider: Option<ColliderDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDescription {
    pub position: Vec3,
    /// Euler angles in radians.
    pub orientation: Vec3,
    pub scale: Vec3,
    /// Name of the parent entity.
    pub parent: Option<String>,
}

impl Default for TransformDescription {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Vec3::ZERO,
            scale: Vec3::ONE,
            parent: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub look_at: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            look_at: Vec3::ZERO,
            up: Vec3::Y,
            fov_degrees: 90.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDescription {
    /// `w` is the specular power.
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub hdr: bool,
    pub animated: bool,
}

impl Default for RenderDescription {
    fn default() -> Self {
        let material = Material::default();
        Self {
            ambient: material.ambient,
            diffuse: material.diffuse,
            specular: material.specular,
            hdr: false,
            animated: false,
        }
    }
}

impl RenderDescription {
    pub fn material(&self) -> Material {
        Material {
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightDescription {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Vec3,
    pub intensity: f32,
}

impl Default for LightDescription {
    fn default() -> Self {
        LightComponent::default().into()
    }
}

impl From<LightComponent> for LightDescription {
    fn from(light: LightComponent) -> Self {
        Self {
            ambient: light.ambient,
            diffuse: light.diffuse,
            specular: light.specular,
            attenuation: light.attenuation,
            intensity: light.intensity,
        }
    }
}

impl From<LightDescription> for LightComponent {
    fn from(light: LightDescription) -> Self {
        Self {
            ambient: light.ambient,
            diffuse: light.diffuse,
            specular: light.specular,
            attenuation: light.attenuation,
            intensity: light.intensity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainDescription {
    pub dimensions: UVec3,
    #[serde(default = "unit_spacing")]
    pub spacing: Vec3,
    #[serde(default)]
    pub fill_height: u32,
}

fn unit_spacing() -> Vec3 {
    Vec3::ONE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendDescription {
    #[default]
    Additive,
    Alpha,
}

impl From<BlendDescription> for BlendMode {
    fn from(blend: BlendDescription) -> Self {
        match blend {
            BlendDescription::Additive => BlendMode::Additive,
            BlendDescription::Alpha => BlendMode::Alpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmitterDescription {
    pub particles: u32,
    pub start_colour: Option<Vec3>,
    pub end_colour: Option<Vec3>,
    pub velocity: Option<f32>,
    pub lifespan: Option<f32>,
    pub direction: Option<Vec3>,
    #[serde(default)]
    pub blend: BlendDescription,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColliderDescription {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Default for ColliderDescription {
    fn default() -> Self {
        let collider = ColliderComponent::default();
        Self {
            center: collider.center,
            half_extents: collider.half_extents,
        }
    }
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path.as_ref())?;
        let description: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        tracing::debug!(
            path = %path.as_ref().display(),
            entities = description.entities.len(),
            "scene description loaded"
        );
        Ok(description)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// The renderer settings, with defaults for anything not given.
    pub fn renderer_config(&self) -> RendererConfig {
        self.renderer.clone().unwrap_or_default()
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescription> {
        self.entities.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_fills_defaults() {
        let scene = SceneDescription::from_json(
            r#"{ "entities": [ { "name": "crate", "transform": { "position": [1, 2, 3] }, "mesh": "cube" } ] }"#,
        )
        .unwrap();
        let entity = scene.entity("crate").unwrap();
        let transform = entity.transform.as_ref().unwrap();
        assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.scale, Vec3::ONE);
        assert_eq!(entity.mesh, Some(Primitive::Cube));
        assert!(entity.camera.is_none());
        assert_eq!(scene.renderer_config(), RendererConfig::default());
    }

    #[test]
    fn partial_renderer_section() {
        let scene =
            SceneDescription::from_json(r#"{ "renderer": { "width": 640, "particles": true } }"#).unwrap();
        let config = scene.renderer_config();
        assert_eq!(config.width, 640);
        assert!(config.particles);
        assert_eq!(config.height, RendererConfig::default().height);
    }

    #[test]
    fn shader_programs_by_name() {
        let scene = SceneDescription::from_json(
            r#"{ "entities": [ { "name": "light_quad", "mesh": "quad", "shader": "light_pass" } ] }"#,
        )
        .unwrap();
        assert_eq!(scene.entities[0].shader, Some(ShaderProgram::LightPass));
    }

    #[test]
    fn unknown_primitive_is_a_json_error() {
        let err = SceneDescription::from_json(r#"{ "entities": [ { "name": "x", "mesh": "teapot" } ] }"#)
            .unwrap_err();
        assert!(matches!(err, AssetError::Json(_)));
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut scene = SceneDescription::default();
        scene.textures.insert(
            "red".into(),
            TextureDescription {
                colour: [255, 0, 0, 255],
                size: 1,
            },
        );
        scene.entities.push(EntityDescription {
            name: "sun".into(),
            transform: Some(TransformDescription::default()),
            light: Some(LightDescription::default()),
            ..Default::default()
        });
        scene.save(tmp.path()).unwrap();

        let loaded = SceneDescription::load(tmp.path()).unwrap();
        assert_eq!(loaded, scene);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SceneDescription::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }
}
