use crate::backend::{
    ColourTarget, DepthTarget, RasterState, RenderBackend, RenderTargets, ShaderResource,
    ShaderStage, ShadowMap, TargetTexture,
};
use crate::config::RendererConfig;
use crate::constants::{
    ConstantBuffer, DrawConstants, LightConstants, LightData, MiscConstants, ParticleConstants,
    UpdateConstants, ViewProjConstants,
};
use crate::error::RenderError;
use crate::lighting::shadow_view_projection;
use crate::modes::{MrtMode, RenderMode};
use bytemuck::Pod;
use ember_common::{EntityId, ShaderHandle, ShaderProgram};
use ember_ecs::{CameraComponent, ComponentKind, ComponentMask};
use ember_kernel::{FrameClock, Scene, SceneError};
use glam::{Mat4, Vec4};

/// Shadow-casting lights beyond this count are ignored.
pub const MAX_LIGHTS: usize = 2;

/// The full-screen quads driving the post-process chain, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassQuads {
    pub light: EntityId,
    pub bright: EntityId,
    pub blur: EntityId,
    pub composite: EntityId,
}

#[derive(Debug, Clone, Copy)]
struct ShadowShaders {
    instanced: ShaderHandle,
    plain: ShaderHandle,
}

/// Everything resolved once at initialize.
#[derive(Debug, Clone)]
struct FrameSetup {
    renderables: Vec<EntityId>,
    lights: Vec<EntityId>,
    emitters: Vec<EntityId>,
    passes: PassQuads,
    sun: ShadowShaders,
    moon: ShadowShaders,
}

/// Draw counts of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub geometry_draws: usize,
    pub shadow_draws: usize,
    pub post_draws: usize,
    pub particle_draws: usize,
    /// The light pass went straight to the back buffer.
    pub raw_view: bool,
}

/// Drives the fixed deferred pass sequence over a [`RenderBackend`].
///
/// Constructed once, initialized against an awake scene, then driven once
/// per frame. Constant buffers are mirrored host-side and re-uploaded when
/// their contents change.
pub struct DeferredRenderer<B> {
    backend: B,
    config: RendererConfig,
    render_mode: RenderMode,
    mrt_mode: MrtMode,
    setup: Option<FrameSetup>,
    draw: DrawConstants,
    update: UpdateConstants,
    view_proj: ViewProjConstants,
    lights: LightConstants,
    render_state: MiscConstants,
    mrt: MiscConstants,
    blur: MiscConstants,
    particle: ParticleConstants,
}

fn upload<B: RenderBackend, T: Pod>(
    backend: &mut B,
    buffer: ConstantBuffer,
    value: &T,
) -> Result<(), RenderError> {
    backend.upload(buffer, bytemuck::bytes_of(value))
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

impl<B: RenderBackend> DeferredRenderer<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        Self {
            backend,
            config,
            render_mode: RenderMode::default(),
            mrt_mode: MrtMode::default(),
            setup: None,
            draw: DrawConstants::default(),
            update: UpdateConstants::default(),
            view_proj: ViewProjConstants::default(),
            lights: LightConstants::default(),
            render_state: MiscConstants::default(),
            mrt: MiscConstants::default(),
            blur: MiscConstants::default(),
            particle: ParticleConstants::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn mrt_mode(&self) -> MrtMode {
        self.mrt_mode
    }

    pub fn is_initialized(&self) -> bool {
        self.setup.is_some()
    }

    pub fn pass_quads(&self) -> Option<PassQuads> {
        self.setup.as_ref().map(|s| s.passes)
    }

    pub fn lights(&self) -> &[EntityId] {
        self.setup
            .as_ref()
            .map(|s| s.lights.as_slice())
            .unwrap_or_default()
    }

    /// Resolve renderables, lights, emitters and pass quads from an awake
    /// scene, create the shadow programs and upload the initial constants.
    pub fn initialize(&mut self, scene: &Scene) -> Result<(), RenderError> {
        if !scene.is_awake() {
            return Err(RenderError::SceneNotAwake);
        }
        let renderables = scene.filter(ComponentMask::RENDERABLE);
        let mut lights = scene.filter(ComponentMask::LIGHT | ComponentMask::TRANSFORM);
        if lights.is_empty() {
            return Err(RenderError::NoLights);
        }
        if lights.len() > MAX_LIGHTS {
            tracing::warn!(
                ignored = lights.len() - MAX_LIGHTS,
                "only the first two lights cast shadows"
            );
            lights.truncate(MAX_LIGHTS);
        }
        let emitters =
            scene.filter(ComponentMask::EMITTER | ComponentMask::TRANSFORM | ComponentMask::SHADER);
        let passes = resolve_pass_quads(scene)?;

        let needed = renderables.len() + if self.config.particles { emitters.len() } else { 0 };
        if needed > self.config.max_draws_per_frame {
            return Err(RenderError::DrawBudget {
                needed,
                max: self.config.max_draws_per_frame,
            });
        }

        let sun = ShadowShaders {
            instanced: self.backend.shader(ShaderProgram::SunShadowInstanced)?,
            plain: self.backend.shader(ShaderProgram::SunShadow)?,
        };
        let moon = ShadowShaders {
            instanced: self.backend.shader(ShaderProgram::MoonShadowInstanced)?,
            plain: self.backend.shader(ShaderProgram::MoonShadow)?,
        };

        let (width, height) = self.backend.viewport();
        self.render_state = MiscConstants::new(self.render_mode.state_flags());
        self.update = UpdateConstants::default();
        self.blur = MiscConstants::new(Vec4::new(0.0, 0.0, width as f32, height as f32));
        self.mrt = MiscConstants::new(Vec4::new(self.mrt_mode.index() as f32, 0.0, 0.0, 0.0));
        self.draw.misc = [self.config.exposure, 0.0, 0.0, 0.0];

        self.lights = LightConstants::default();
        for (slot, &id) in lights.iter().enumerate() {
            let light = scene.entity(id)?.light().ok_or(SceneError::MissingComponent {
                entity: id,
                kind: ComponentKind::Light,
            })?;
            self.lights.lights[slot] = LightData::new(scene.world_position(id)?, light);
        }
        self.lights.light_count = [lights.len() as f32, 0.0, 0.0, 0.0];

        upload(&mut self.backend, ConstantBuffer::Light, &self.lights)?;
        upload(&mut self.backend, ConstantBuffer::Mrt, &self.mrt)?;
        upload(&mut self.backend, ConstantBuffer::RenderState, &self.render_state)?;
        upload(&mut self.backend, ConstantBuffer::Blur, &self.blur)?;

        tracing::info!(
            renderables = renderables.len(),
            lights = lights.len(),
            emitters = emitters.len(),
            "renderer initialized"
        );
        self.setup = Some(FrameSetup {
            renderables,
            lights,
            emitters,
            passes,
            sun,
            moon,
        });
        Ok(())
    }

    /// Run the whole pass sequence once and present.
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        camera: &CameraComponent,
        clock: &FrameClock,
    ) -> Result<FrameStats, RenderError> {
        let setup = self.setup.clone().ok_or(RenderError::NotInitialized)?;
        if !self.backend.has_swap_chain() {
            return Err(RenderError::MissingSwapChain);
        }
        let mut stats = FrameStats::default();

        self.clear_targets();
        self.refresh_constants(scene, camera, clock, &setup)?;

        self.geometry_pass(scene, camera, &setup, &mut stats)?;
        if self.config.particles {
            self.particle_pass(scene, camera, &setup, &mut stats)?;
        }
        self.backend.unbind_all();

        stats.raw_view = self.mrt_mode.routes_to_back_buffer();
        self.light_pass(scene, &setup, stats.raw_view)?;
        stats.post_draws += 1;
        if !stats.raw_view {
            self.bright_pass(scene, &setup)?;
            self.blur_passes(scene, &setup)?;
            self.composite_pass(scene, &setup)?;
            stats.post_draws += 4;
        }

        self.backend.present()?;
        self.backend.unbind_all();
        tracing::debug!(
            geometry = stats.geometry_draws,
            shadow = stats.shadow_draws,
            post = stats.post_draws,
            particles = stats.particle_draws,
            "frame presented"
        );
        Ok(stats)
    }

    pub fn advance_render_mode(&mut self) -> Result<RenderMode, RenderError> {
        self.render_mode = self.render_mode.next();
        self.render_state = MiscConstants::new(self.render_mode.state_flags());
        upload(&mut self.backend, ConstantBuffer::RenderState, &self.render_state)?;
        tracing::debug!(mode = %self.render_mode, "render mode changed");
        Ok(self.render_mode)
    }

    pub fn advance_mrt_mode(&mut self) -> Result<MrtMode, RenderError> {
        self.mrt_mode = self.mrt_mode.next();
        self.mrt.misc[0] = self.mrt_mode.index() as f32;
        upload(&mut self.backend, ConstantBuffer::Mrt, &self.mrt)?;
        tracing::debug!(mode = %self.mrt_mode, "mrt view changed");
        Ok(self.mrt_mode)
    }

    /// Rebuild size-dependent targets and refresh the blur texel size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.backend.resize(width, height)?;
        self.config.width = width;
        self.config.height = height;
        self.blur.misc[2] = width as f32;
        self.blur.misc[3] = height as f32;
        upload(&mut self.backend, ConstantBuffer::Blur, &self.blur)?;
        tracing::debug!(width, height, "renderer resized");
        Ok(())
    }

    fn clear_targets(&mut self) {
        let colour = self.config.clear_colour;
        self.backend.clear_colour(ColourTarget::BackBuffer, colour);
        self.backend.clear_colour(ColourTarget::GBuffer, colour);
        self.backend
            .clear_colour(ColourTarget::Offscreen(TargetTexture::LightOutput), colour);
        self.backend
            .clear_colour(ColourTarget::Offscreen(TargetTexture::BlurOutput), colour);
        self.backend.clear_depth(DepthTarget::Main);
        self.backend.clear_depth(DepthTarget::Shadow(ShadowMap::Sun));
        self.backend.clear_depth(DepthTarget::Shadow(ShadowMap::Moon));
    }

    fn refresh_constants(
        &mut self,
        scene: &Scene,
        camera: &CameraComponent,
        clock: &FrameClock,
        setup: &FrameSetup,
    ) -> Result<(), RenderError> {
        for buffer in [
            ConstantBuffer::Draw,
            ConstantBuffer::Update,
            ConstantBuffer::RenderState,
            ConstantBuffer::ViewProj,
            ConstantBuffer::Mrt,
            ConstantBuffer::Light,
        ] {
            self.backend
                .bind_constant_buffer(ShaderStage::Vertex, buffer.slot(), buffer);
        }
        self.backend.bind_constant_buffer(
            ShaderStage::Fragment,
            ConstantBuffer::RenderState.slot(),
            ConstantBuffer::RenderState,
        );

        self.update.camera_position = camera.position().extend(1.0).to_array();
        self.view_proj = ViewProjConstants::new(camera.view(), camera.projection());
        self.update.time = [clock.elapsed(), 0.0];
        self.update.delta = [clock.delta(), 0.0];

        for (slot, &id) in setup.lights.iter().enumerate() {
            let frame = scene.world_frame(id)?;
            let light = &mut self.lights.lights[slot];
            light.position = frame.position.extend(1.0).to_array();
            light.view_proj =
                shadow_view_projection(frame.position, frame.orientation, self.config.shadow_radius)
                    .to_cols_array_2d();
        }

        upload(&mut self.backend, ConstantBuffer::Light, &self.lights)?;
        upload(&mut self.backend, ConstantBuffer::Update, &self.update)?;
        upload(&mut self.backend, ConstantBuffer::RenderState, &self.render_state)?;
        upload(&mut self.backend, ConstantBuffer::ViewProj, &self.view_proj)?;
        Ok(())
    }

    /// Every renderable into the G-buffer, then again into both shadow maps.
    fn geometry_pass(
        &mut self,
        scene: &Scene,
        camera: &CameraComponent,
        setup: &FrameSetup,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        let raster = if self.render_mode.is_wireframe() {
            RasterState::Wireframe
        } else {
            RasterState::Solid
        };
        self.backend.set_raster_state(raster);
        let view_proj = camera_view_projection(camera);

        for &id in &setup.renderables {
            let entity = scene.entity(id)?;
            let (Some(render), Some(geometry), Some(shader)) =
                (entity.render(), entity.geometry(), entity.shader())
            else {
                continue;
            };
            if entity.terrain().is_some_and(|t| t.instance_count() == 0) {
                tracing::trace!(entity = %id, "terrain without voxels skipped");
                continue;
            }
            // Shadow draws rebind targets, so the G-buffer goes back on per entity.
            self.backend.bind_render_targets(RenderTargets::GBuffer);

            self.draw.misc[1] = flag(render.hdr);
            self.draw.misc[2] = flag(render.animated);
            self.draw.set_matrices(scene.transform_matrix(id)?, view_proj);
            upload(&mut self.backend, ConstantBuffer::Draw, &self.draw)?;

            self.backend.use_shader(shader.handle);

            let texture = entity.texture();
            let displacement = ShaderResource::from(texture.and_then(|t| t.displacement));
            self.backend.bind_shader_resource(
                ShaderStage::Fragment,
                0,
                ShaderResource::from(texture.map(|t| t.albedo)),
            );
            self.backend.bind_shader_resource(
                ShaderStage::Fragment,
                1,
                ShaderResource::from(texture.and_then(|t| t.normal)),
            );
            self.backend
                .bind_shader_resource(ShaderStage::Fragment, 2, displacement);
            self.backend
                .bind_shader_resource(ShaderStage::Vertex, 0, displacement);

            self.backend.set_mesh(geometry.mesh);
            let index_count = geometry.index_count;
            let instanced = entity
                .terrain()
                .and_then(|t| t.instance_buffer().map(|b| (b, t.instance_count())));

            match instanced {
                Some((buffer, instances)) => {
                    self.backend.set_instance_buffer(1, buffer);
                    self.backend.draw_indexed_instanced(index_count, instances);
                    for (map, shaders) in [(ShadowMap::Sun, setup.sun), (ShadowMap::Moon, setup.moon)] {
                        self.backend.use_shader(shaders.instanced);
                        self.backend.bind_render_targets(RenderTargets::Shadow(map));
                        self.backend.draw_indexed_instanced(index_count, instances);
                    }
                }
                None => {
                    self.backend.draw_indexed(index_count);
                    for (map, shaders) in [(ShadowMap::Sun, setup.sun), (ShadowMap::Moon, setup.moon)] {
                        self.backend.use_shader(shaders.plain);
                        self.backend.bind_render_targets(RenderTargets::Shadow(map));
                        self.backend.draw_indexed(index_count);
                    }
                }
            }
            stats.geometry_draws += 1;
            stats.shadow_draws += 2;
            tracing::trace!(entity = %id, index_count, instanced = instanced.is_some(), "geometry drawn");
        }

        self.backend.set_raster_state(RasterState::Quad);
        Ok(())
    }

    /// Blended particle quads into the G-buffer with depth testing off.
    fn particle_pass(
        &mut self,
        scene: &Scene,
        camera: &CameraComponent,
        setup: &FrameSetup,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        self.backend.bind_render_targets(RenderTargets::GBuffer);
        self.backend.set_depth_test(false);
        let view_proj = camera_view_projection(camera);

        for &id in &setup.emitters {
            let entity = scene.entity(id)?;
            let (Some(emitter), Some(shader)) = (entity.emitter(), entity.shader()) else {
                continue;
            };
            if emitter.vertex_count() == 0 {
                tracing::trace!(entity = %id, "emitter without particles skipped");
                continue;
            }
            let Some(vertices) = emitter.vertex_buffer() else {
                tracing::warn!(entity = %id, "emitter has no particle vertices; was the scene awoken?");
                continue;
            };
            self.backend.use_shader(shader.handle);

            self.draw.set_matrices(scene.transform_matrix(id)?, view_proj);
            upload(&mut self.backend, ConstantBuffer::Draw, &self.draw)?;

            self.particle = ParticleConstants {
                start_colour: emitter.start_colour.extend(1.0).to_array(),
                end_colour: emitter.end_colour.extend(1.0).to_array(),
                direction: emitter.direction.extend(1.0).to_array(),
                emitter_position: scene.world_position(id)?.extend(1.0).to_array(),
                misc: [emitter.velocity, emitter.lifespan, 0.0, 0.0],
            };
            upload(&mut self.backend, ConstantBuffer::Particle, &self.particle)?;
            self.backend.bind_constant_buffer(
                ShaderStage::Vertex,
                ConstantBuffer::Particle.slot(),
                ConstantBuffer::Particle,
            );
            self.backend.set_blend(Some(emitter.blend));
            self.backend.set_vertex_buffer(vertices);
            self.backend.draw(emitter.vertex_count());
            stats.particle_draws += 1;
        }

        self.backend.set_blend(None);
        self.backend.set_depth_test(true);
        Ok(())
    }

    fn light_pass(&mut self, scene: &Scene, setup: &FrameSetup, raw: bool) -> Result<(), RenderError> {
        let target = if raw {
            RenderTargets::BackBuffer
        } else {
            RenderTargets::Offscreen(TargetTexture::LightOutput)
        };
        self.backend.bind_render_targets(target);
        let inputs = [
            ShaderResource::Target(TargetTexture::GBufferDiffuse),
            ShaderResource::Target(TargetTexture::GBufferNormal),
            ShaderResource::Target(TargetTexture::GBufferEmissive),
            ShaderResource::ShadowDepth(ShadowMap::Sun),
            ShaderResource::ShadowDepth(ShadowMap::Moon),
        ];
        for (slot, resource) in inputs.into_iter().enumerate() {
            self.backend
                .bind_shader_resource(ShaderStage::Fragment, slot as u32, resource);
        }
        self.backend.bind_constant_buffer(
            ShaderStage::Fragment,
            ConstantBuffer::Light.slot(),
            ConstantBuffer::Light,
        );
        self.backend.bind_constant_buffer(
            ShaderStage::Fragment,
            ConstantBuffer::RenderState.slot(),
            ConstantBuffer::ViewProj,
        );
        self.backend.bind_constant_buffer(
            ShaderStage::Fragment,
            ConstantBuffer::Draw.slot(),
            ConstantBuffer::Draw,
        );
        self.draw_pass_quad(scene, setup.passes.light)
    }

    fn bright_pass(&mut self, scene: &Scene, setup: &FrameSetup) -> Result<(), RenderError> {
        self.backend
            .bind_render_targets(RenderTargets::Offscreen(TargetTexture::BrightOutput));
        self.backend.generate_mips(TargetTexture::LightOutput);
        self.backend.bind_shader_resource(
            ShaderStage::Fragment,
            0,
            ShaderResource::Target(TargetTexture::LightOutput),
        );
        self.draw_pass_quad(scene, setup.passes.bright)
    }

    /// Horizontal then vertical, both sampling the bright-pass output.
    fn blur_passes(&mut self, scene: &Scene, setup: &FrameSetup) -> Result<(), RenderError> {
        self.backend
            .bind_render_targets(RenderTargets::Offscreen(TargetTexture::BlurOutput));
        self.backend.bind_shader_resource(
            ShaderStage::Fragment,
            1,
            ShaderResource::Target(TargetTexture::BrightOutput),
        );
        self.backend.bind_constant_buffer(
            ShaderStage::Vertex,
            ConstantBuffer::Blur.slot(),
            ConstantBuffer::Blur,
        );
        for direction in [[1.0, 0.0], [0.0, 1.0]] {
            self.blur.misc[0] = direction[0];
            self.blur.misc[1] = direction[1];
            upload(&mut self.backend, ConstantBuffer::Blur, &self.blur)?;
            self.draw_pass_quad(scene, setup.passes.blur)?;
        }
        Ok(())
    }

    fn composite_pass(&mut self, scene: &Scene, setup: &FrameSetup) -> Result<(), RenderError> {
        self.backend.bind_render_targets(RenderTargets::BackBuffer);
        self.backend.bind_shader_resource(
            ShaderStage::Fragment,
            1,
            ShaderResource::Target(TargetTexture::BlurOutput),
        );
        self.draw_pass_quad(scene, setup.passes.composite)
    }

    fn draw_pass_quad(&mut self, scene: &Scene, id: EntityId) -> Result<(), RenderError> {
        let entity = scene.entity(id)?;
        let geometry = entity.geometry().ok_or(SceneError::MissingComponent {
            entity: id,
            kind: ComponentKind::Geometry,
        })?;
        let shader = entity.shader().ok_or(SceneError::MissingComponent {
            entity: id,
            kind: ComponentKind::Shader,
        })?;
        self.backend.set_mesh(geometry.mesh);
        self.backend.use_shader(shader.handle);
        self.backend.draw_indexed(geometry.index_count);
        tracing::trace!(entity = %id, program = %shader.program, "pass quad drawn");
        Ok(())
    }
}

/// Find the quad for each post-process role by its shader program.
fn resolve_pass_quads(scene: &Scene) -> Result<PassQuads, RenderError> {
    let find = |program: ShaderProgram| -> Result<EntityId, RenderError> {
        let mut matches = scene
            .filter(ComponentMask::PASS_QUAD)
            .into_iter()
            .filter(|&id| {
                scene
                    .get(id)
                    .and_then(|e| e.shader())
                    .is_some_and(|s| s.program == program)
            });
        let first = matches.next().ok_or(RenderError::MissingPass(program))?;
        if matches.next().is_some() {
            tracing::warn!(%program, chosen = %first, "several pass quads share a role");
        }
        Ok(first)
    };
    Ok(PassQuads {
        light: find(ShaderProgram::LightPass)?,
        bright: find(ShaderProgram::BrightPass)?,
        blur: find(ShaderProgram::Blur)?,
        composite: find(ShaderProgram::Composite)?,
    })
}

/// The camera's combined view-projection.
pub fn camera_view_projection(camera: &CameraComponent) -> Mat4 {
    camera.projection() * camera.view()
}
