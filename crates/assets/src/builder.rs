use crate::description::{EntityDescription, SceneDescription};
use crate::error::AssetError;
use crate::library::AssetLibrary;
use ember_common::{EntityId, ResourceDevice};
use ember_ecs::{
    CameraComponent, ColliderComponent, EmitterComponent, RenderComponent, RenderType,
    ShaderComponent, TerrainComponent, TextureComponent, TransformComponent,
};
use ember_kernel::Scene;
use std::collections::BTreeMap;

/// A built scene and the lookup from description names to entity ids.
#[derive(Debug)]
pub struct BuiltScene {
    pub scene: Scene,
    pub names: BTreeMap<String, EntityId>,
    pub library: AssetLibrary,
}

impl BuiltScene {
    pub fn id(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }
}

/// Turn a description into a scene, uploading meshes and textures through
/// `device`. The scene is not awoken.
///
/// Entities get ids in listing order, so parents may be listed after their
/// children.
pub fn build_scene(
    description: &SceneDescription,
    device: &mut dyn ResourceDevice,
) -> Result<BuiltScene, AssetError> {
    let config = description.renderer_config();
    let mut scene = Scene::new();
    let mut names = BTreeMap::new();
    for entity in &description.entities {
        let id = scene.spawn(entity.name.clone())?;
        if names.insert(entity.name.clone(), id).is_some() {
            return Err(AssetError::DuplicateName(entity.name.clone()));
        }
    }

    let mut library = AssetLibrary::new();
    for entity in &description.entities {
        let id = names[&entity.name];
        add_components(&mut scene, id, entity, description, &names, &mut library, device, (config.width, config.height))?;
    }
    tracing::info!(
        entities = scene.len(),
        meshes = library.mesh_count(),
        textures = library.texture_count(),
        "scene built"
    );
    Ok(BuiltScene {
        scene,
        names,
        library,
    })
}

/// [`build_scene`] followed by awake.
pub fn load_scene(
    description: &SceneDescription,
    device: &mut dyn ResourceDevice,
) -> Result<BuiltScene, AssetError> {
    let mut built = build_scene(description, device)?;
    built.scene.awake(device)?;
    Ok(built)
}

#[allow(clippy::too_many_arguments)]
fn add_components(
    scene: &mut Scene,
    id: EntityId,
    entity: &EntityDescription,
    description: &SceneDescription,
    names: &BTreeMap<String, EntityId>,
    library: &mut AssetLibrary,
    device: &mut dyn ResourceDevice,
    viewport: (u32, u32),
) -> Result<(), AssetError> {
    let invalid = |reason: &str| AssetError::InvalidEntity {
        entity: entity.name.clone(),
        reason: reason.to_string(),
    };

    if let Some(transform) = &entity.transform {
        let parent = match &transform.parent {
            Some(parent) => Some(*names.get(parent).ok_or_else(|| AssetError::UnknownParent {
                entity: entity.name.clone(),
                parent: parent.clone(),
            })?),
            None => None,
        };
        scene.add_component(
            id,
            TransformComponent::new(transform.position, transform.orientation, transform.scale, parent),
        )?;
    }

    if let Some(camera) = &entity.camera {
        if entity.transform.is_none() {
            return Err(invalid("a camera needs a transform"));
        }
        let (width, height) = viewport;
        scene.add_component(
            id,
            CameraComponent::new(
                camera.look_at,
                camera.up,
                camera.fov_degrees.to_radians(),
                camera.near,
                camera.far,
                width,
                height,
            ),
        )?;
    }

    if let Some(primitive) = entity.mesh {
        let geometry = library.mesh(device, &primitive.mesh())?;
        scene.add_component(id, geometry)?;
    }

    if let Some(program) = entity.shader {
        let scene_mesh = entity.mesh.is_none_or(|m| m.is_scene_mesh());
        if entity.mesh.is_some() && program.uses_scene_vertices() != scene_mesh {
            return Err(invalid(&format!("shader {program} does not match the mesh layout")));
        }
        let handle = device.shader(program)?;
        scene.add_component(id, ShaderComponent { handle, program })?;
    }

    if let Some(render) = &entity.render {
        let render_type = if entity.terrain.is_some() {
            RenderType::InstancedIndexed
        } else {
            RenderType::Indexed
        };
        scene.add_component(
            id,
            RenderComponent {
                material: render.material(),
                render_type,
                hdr: render.hdr,
                animated: render.animated,
            },
        )?;
    }

    if let Some(name) = &entity.texture {
        let texture = description
            .textures
            .get(name)
            .ok_or_else(|| AssetError::UnknownTexture {
                entity: entity.name.clone(),
                texture: name.clone(),
            })?;
        let albedo = library.solid_texture(device, name, texture.colour, texture.size)?;
        scene.add_component(id, TextureComponent::albedo(albedo))?;
    }

    if let Some(light) = entity.light {
        if entity.transform.is_none() {
            return Err(invalid("a light needs a transform"));
        }
        scene.add_component(id, ember_ecs::LightComponent::from(light))?;
    }

    if let Some(terrain) = entity.terrain {
        if !entity.shader.is_some_and(|p| p.is_instanced()) {
            return Err(invalid("terrain needs an instanced shader"));
        }
        scene.add_component(
            id,
            TerrainComponent::new(terrain.dimensions, terrain.spacing, terrain.fill_height),
        )?;
    }

    if let Some(emitter) = entity.emitter {
        let mut component = EmitterComponent::new(emitter.particles);
        if let Some(colour) = emitter.start_colour {
            component.start_colour = colour;
        }
        if let Some(colour) = emitter.end_colour {
            component.end_colour = colour;
        }
        if let Some(velocity) = emitter.velocity {
            component.velocity = velocity;
        }
        if let Some(lifespan) = emitter.lifespan {
            component.lifespan = lifespan;
        }
        if let Some(direction) = emitter.direction {
            component.direction = direction;
        }
        component.blend = emitter.blend.into();
        scene.add_component(id, component)?;
    }

    if let Some(collider) = entity.collider {
        scene.add_component(
            id,
            ColliderComponent {
                center: collider.center,
                half_extents: collider.half_extents,
            },
        )?;
    }
    Ok(())
}
