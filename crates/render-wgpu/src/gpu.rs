use crate::frame::{DrawCall, DrawKind, PassPlan, PassStep, Recorded, UniformRef, attachments, plan};
use crate::pipelines::{
    FRAGMENT_TEXTURE_SLOTS, LINEAR_SAMPLER_BINDING, Layouts, PipelineKey, SHADOW_SAMPLER_BINDING,
    TargetLayout, UNIFORM_SLOTS, VERTEX_TEXTURE_BINDING, create_mip_pipeline, create_pipeline,
};
use crate::shaders::ShaderModuleKind;
use crate::targets::{Fallbacks, ShadowMaps, TargetSet};
use crate::uniforms::UniformRing;
use ember_common::{
    BufferHandle, DeviceError, MeshHandle, ResourceDevice, ShaderHandle, ShaderProgram,
    SimpleVertex, TextureHandle, Vertex,
};
use ember_ecs::BlendMode;
use ember_render::{
    ColourTarget, ConstantBuffer, DepthTarget, RasterState, RenderBackend, RenderError,
    RendererConfig, RenderTargets, ShaderResource, ShaderStage, TargetTexture,
};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

/// Sizes the backend allocates up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSettings {
    pub width: u32,
    pub height: u32,
    pub shadow_map_size: u32,
    /// Updates each constant buffer may receive within one frame.
    pub uniform_capacity: usize,
}

impl BackendSettings {
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            shadow_map_size: config.shadow_map_size,
            // Draw-buffer updates plus the handful of per-frame uploads.
            uniform_capacity: config.max_draws_per_frame + 8,
        }
    }
}

/// A configured presentation surface.
pub struct SurfaceBinding {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

/// Immediate-context state; snapshotted into every recorded draw.
#[derive(Debug, Clone)]
struct BindState {
    targets: Option<RenderTargets>,
    program: Option<ShaderProgram>,
    raster: RasterState,
    depth_test: bool,
    blend: Option<BlendMode>,
    vertex_uniforms: [ConstantBuffer; UNIFORM_SLOTS as usize],
    fragment_uniforms: [ConstantBuffer; UNIFORM_SLOTS as usize],
    fragment_resources: [ShaderResource; FRAGMENT_TEXTURE_SLOTS],
    vertex_resource: ShaderResource,
    mesh: Option<MeshHandle>,
    vertex_buffer: Option<BufferHandle>,
    instances: Option<BufferHandle>,
}

impl Default for BindState {
    fn default() -> Self {
        Self {
            targets: None,
            program: None,
            raster: RasterState::Solid,
            depth_test: true,
            blend: None,
            vertex_uniforms: ConstantBuffer::ALL,
            fragment_uniforms: ConstantBuffer::ALL,
            fragment_resources: [ShaderResource::None; FRAGMENT_TEXTURE_SLOTS],
            vertex_resource: ShaderResource::None,
            mesh: None,
            vertex_buffer: None,
            instances: None,
        }
    }
}

/// [`RenderBackend`] on wgpu.
///
/// Calls are recorded against a state snapshot and replayed as render passes
/// at [`RenderBackend::present`]. Pipelines are built lazily per
/// (program, attachment layout, raster, depth, blend) and cached.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: Option<SurfaceBinding>,
    surface_format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    line_mode: bool,
    layouts: Layouts,
    linear_sampler: wgpu::Sampler,
    shadow_sampler: wgpu::Sampler,
    uniform_buffers: Vec<wgpu::Buffer>,
    rings: Vec<UniformRing>,
    targets: TargetSet,
    shadows: ShadowMaps,
    fallbacks: Fallbacks,
    meshes: Vec<GpuMesh>,
    buffers: Vec<wgpu::Buffer>,
    textures: Vec<wgpu::TextureView>,
    modules: BTreeMap<ShaderModuleKind, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    mip_pipeline: wgpu::RenderPipeline,
    state: BindState,
    recorded: Vec<Recorded>,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<SurfaceBinding>,
        settings: BackendSettings,
    ) -> Self {
        let surface_format = surface
            .as_ref()
            .map_or(wgpu::TextureFormat::Bgra8UnormSrgb, |s| s.config.format);
        let line_mode = device.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        let layouts = Layouts::new(&device);

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let rings: Vec<UniformRing> = ConstantBuffer::ALL
            .iter()
            .map(|&buffer| UniformRing::new(buffer, settings.uniform_capacity))
            .collect();
        let uniform_buffers = rings
            .iter()
            .map(|ring| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(ring.buffer().name()),
                    size: ring.byte_size(),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let targets = TargetSet::new(&device, settings.width, settings.height);
        let shadows = ShadowMaps::new(&device, settings.shadow_map_size);
        let fallbacks = Fallbacks::new(&device, &queue);
        let mip_pipeline = create_mip_pipeline(&device, &layouts);

        tracing::debug!(
            width = settings.width,
            height = settings.height,
            shadow_map_size = settings.shadow_map_size,
            line_mode,
            "wgpu backend created"
        );
        Self {
            device,
            queue,
            surface,
            surface_format,
            width: settings.width.max(1),
            height: settings.height.max(1),
            line_mode,
            layouts,
            linear_sampler,
            shadow_sampler,
            uniform_buffers,
            rings,
            targets,
            shadows,
            fallbacks,
            meshes: Vec::new(),
            buffers: Vec::new(),
            textures: Vec::new(),
            modules: BTreeMap::new(),
            pipelines: HashMap::new(),
            mip_pipeline,
            state: BindState::default(),
            recorded: Vec::new(),
        }
    }

    /// Open an adapter and device for `target` and configure its surface.
    pub fn with_surface(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        settings: BackendSettings,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::Backend(format!("create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RenderError::Backend("no compatible GPU adapter".into()))?;

        let required_features = adapter.features() & wgpu::Features::POLYGON_MODE_LINE;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("ember_device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Backend(format!("create device: {e}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Backend("surface reports no formats".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: settings.width.max(1),
            height: settings.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            adapter = %adapter.get_info().name,
            ?format,
            "gpu initialized"
        );
        Ok(Self::new(
            device,
            queue,
            Some(SurfaceBinding { surface, config }),
            settings,
        ))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn supports_wireframe(&self) -> bool {
        self.line_mode
    }

    pub fn cached_pipelines(&self) -> usize {
        self.pipelines.len()
    }

    fn program_of(shader: ShaderHandle) -> Option<ShaderProgram> {
        ShaderProgram::ALL.get(shader.0 as usize).copied()
    }

    fn compile(&mut self, kind: ShaderModuleKind) -> Result<(), DeviceError> {
        if self.modules.contains_key(&kind) {
            return Ok(());
        }
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{kind:?}_shader")),
            source: wgpu::ShaderSource::Wgsl(kind.source().into()),
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::creation(format!("{kind:?} shader"), error.to_string()));
        }
        tracing::debug!(module = ?kind, "shader module compiled");
        self.modules.insert(kind, module);
        Ok(())
    }

    // --- recording ---

    fn uniform_refs(&self, table: &[ConstantBuffer; UNIFORM_SLOTS as usize]) -> [UniformRef; UNIFORM_SLOTS as usize] {
        table.map(|buffer| UniformRef {
            buffer,
            version: self.rings[buffer.slot() as usize].current(),
        })
    }

    fn record_draw(&mut self, kind: DrawKind) {
        let state = &self.state;
        let (Some(targets), Some(program)) = (state.targets, state.program) else {
            tracing::warn!(?kind, "draw without bound targets or shader dropped");
            return;
        };
        if matches!(kind, DrawKind::Indexed { .. }) && state.mesh.is_none() {
            tracing::warn!(%program, "indexed draw without a mesh dropped");
            return;
        }
        if state.mesh.is_none() && state.vertex_buffer.is_none() {
            tracing::warn!(%program, "draw without vertices dropped");
            return;
        }
        if program.is_instanced() && state.instances.is_none() {
            tracing::warn!(%program, "instanced draw without an instance buffer dropped");
            return;
        }
        let pipeline = PipelineKey {
            program,
            layout: TargetLayout::from(targets),
            raster: state.raster,
            depth_test: state.depth_test,
            blend: state.blend,
        };
        let call = DrawCall {
            targets,
            pipeline,
            vertex_uniforms: self.uniform_refs(&state.vertex_uniforms),
            fragment_uniforms: self.uniform_refs(&state.fragment_uniforms),
            fragment_resources: state.fragment_resources,
            vertex_resource: state.vertex_resource,
            mesh: state.mesh,
            vertex_buffer: state.vertex_buffer,
            instances: state.instances,
            kind,
        };
        self.recorded.push(Recorded::Draw(call));
    }

    // --- replay ---

    fn ensure_pipelines(&mut self, commands: &[Recorded]) -> Result<(), RenderError> {
        for command in commands {
            let Recorded::Draw(draw) = command else {
                continue;
            };
            let key = draw.pipeline;
            if self.pipelines.contains_key(&key) {
                continue;
            }
            let kind = ShaderModuleKind::of(key.program);
            self.compile(kind)?;
            let Some(module) = self.modules.get(&kind) else {
                continue;
            };
            let pipeline = create_pipeline(
                &self.device,
                &self.layouts,
                module,
                key,
                self.surface_format,
                self.line_mode,
            );
            tracing::debug!(program = %key.program, layout = ?key.layout, "pipeline created");
            self.pipelines.insert(key, pipeline);
        }
        Ok(())
    }

    fn write_uniforms(&self) {
        for (ring, buffer) in self.rings.iter().zip(&self.uniform_buffers) {
            for (offset, bytes) in ring.staged() {
                self.queue.write_buffer(buffer, offset, bytes);
            }
        }
    }

    fn finish_frame(&mut self) {
        for ring in &mut self.rings {
            ring.finish_frame();
        }
        self.recorded.clear();
    }

    fn colour_view(&self, resource: ShaderResource) -> &wgpu::TextureView {
        match resource {
            ShaderResource::Texture(handle) => self
                .textures
                .get(handle.0 as usize)
                .unwrap_or(&self.fallbacks.white),
            ShaderResource::Target(target) => self
                .targets
                .get(target)
                .map_or(&self.fallbacks.white, |t| t.sampled()),
            ShaderResource::None | ShaderResource::ShadowDepth(_) => &self.fallbacks.white,
        }
    }

    fn depth_view(&self, resource: ShaderResource) -> &wgpu::TextureView {
        match resource {
            ShaderResource::ShadowDepth(map) => self.shadows.view(map),
            _ => &self.fallbacks.far_depth,
        }
    }

    fn uniform_group(&self, layout: &wgpu::BindGroupLayout, refs: &[UniformRef]) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry<'_>> = refs
            .iter()
            .enumerate()
            .map(|(binding, uniform)| {
                let slot = uniform.buffer.slot() as usize;
                wgpu::BindGroupEntry {
                    binding: binding as u32,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.uniform_buffers[slot],
                        offset: self.rings[slot].offset(uniform.version),
                        size: NonZeroU64::new(uniform.buffer.size() as u64),
                    }),
                }
            })
            .collect();
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &entries,
        })
    }

    fn resource_group(&self, draw: &DrawCall) -> wgpu::BindGroup {
        let fragment = &draw.fragment_resources;
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &self.layouts.resources,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(self.colour_view(fragment[0])),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(self.colour_view(fragment[1])),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(self.colour_view(fragment[2])),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(self.depth_view(fragment[3])),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(self.depth_view(fragment[4])),
                },
                wgpu::BindGroupEntry {
                    binding: LINEAR_SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: SHADOW_SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: VERTEX_TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(
                        self.colour_view(draw.vertex_resource),
                    ),
                },
            ],
        })
    }

    fn encode_draw(&self, pass: &mut wgpu::RenderPass<'_>, draw: &DrawCall) {
        let Some(pipeline) = self.pipelines.get(&draw.pipeline) else {
            return;
        };
        let mesh = draw.mesh.and_then(|m| self.meshes.get(m.0 as usize));
        let vertices = draw
            .vertex_buffer
            .and_then(|b| self.buffers.get(b.0 as usize))
            .or(mesh.map(|m| &m.vertices));
        let Some(vertices) = vertices else {
            tracing::warn!(program = %draw.pipeline.program, "draw references a missing vertex buffer");
            return;
        };

        pass.set_pipeline(pipeline);
        let vertex_group = self.uniform_group(&self.layouts.vertex_uniforms, &draw.vertex_uniforms);
        let fragment_group = self.uniform_group(&self.layouts.fragment_uniforms, &draw.fragment_uniforms);
        let resources = self.resource_group(draw);
        pass.set_bind_group(0, &vertex_group, &[]);
        pass.set_bind_group(1, &fragment_group, &[]);
        pass.set_bind_group(2, &resources, &[]);
        pass.set_vertex_buffer(0, vertices.slice(..));
        if draw.pipeline.program.is_instanced() {
            if let Some(instances) = draw.instances.and_then(|b| self.buffers.get(b.0 as usize)) {
                pass.set_vertex_buffer(1, instances.slice(..));
            }
        }

        match draw.kind {
            DrawKind::Indexed {
                index_count,
                instance_count,
            } => {
                let Some(mesh) = mesh else {
                    return;
                };
                pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..index_count, 0, 0..instance_count);
            }
            DrawKind::Vertices { vertex_count } => pass.draw(0..vertex_count, 0..1),
        }
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, plan: &PassPlan<'_>, back_buffer: &wgpu::TextureView) {
        let load = |clear: Option<[f32; 4]>| match clear {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            }),
            None => wgpu::LoadOp::Load,
        };
        let (colour, depth) = attachments(plan.targets);
        let colour_views: Vec<&wgpu::TextureView> = match colour {
            Some(ColourTarget::BackBuffer) => vec![back_buffer],
            Some(ColourTarget::GBuffer) => [
                TargetTexture::GBufferDiffuse,
                TargetTexture::GBufferNormal,
                TargetTexture::GBufferEmissive,
            ]
            .into_iter()
            .filter_map(|t| self.targets.get(t).map(|c| c.attachment()))
            .collect(),
            Some(ColourTarget::Offscreen(texture)) => {
                self.targets.get(texture).map(|c| c.attachment()).into_iter().collect()
            }
            None => Vec::new(),
        };
        let colour_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = colour_views
            .into_iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: load(plan.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();
        let depth_view = match depth {
            Some(DepthTarget::Main) => Some(self.targets.main_depth()),
            Some(DepthTarget::Shadow(map)) => Some(self.shadows.view(map)),
            None => None,
        };
        let depth_stencil_attachment = depth_view.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: if plan.clear_depth {
                    wgpu::LoadOp::Clear(1.0)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        });

        let label = format!("{:?}", plan.targets);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&label),
            color_attachments: &colour_attachments,
            depth_stencil_attachment,
            ..Default::default()
        });
        for draw in &plan.draws {
            self.encode_draw(&mut pass, draw);
        }
    }

    fn encode_mips(&self, encoder: &mut wgpu::CommandEncoder, texture: TargetTexture) {
        let Some(target) = self.targets.get(texture) else {
            return;
        };
        for pair in target.levels().windows(2) {
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mip_blit"),
                layout: &self.layouts.mip,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&pair[0]),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                    },
                ],
            });
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mip_blit"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &pair[1],
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.mip_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }

    /// The next swap-chain image, or `None` when the frame has to be skipped.
    fn acquire(&self) -> Result<Option<wgpu::SurfaceTexture>, RenderError> {
        let Some(binding) = &self.surface else {
            return Err(RenderError::MissingSwapChain);
        };
        match binding.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                binding.surface.configure(&self.device, &binding.config);
                tracing::warn!("surface outdated; frame skipped");
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out; frame skipped");
                Ok(None)
            }
            Err(e) => Err(RenderError::Present(e.to_string())),
        }
    }
}

fn validate_stream(label: &str, data: &[u8], stride: u32) -> Result<(), DeviceError> {
    if data.is_empty() || stride == 0 || data.len() % stride as usize != 0 {
        return Err(DeviceError::InvalidData {
            what: label.to_string(),
            reason: format!("{} bytes do not form whole {stride}-byte elements", data.len()),
        });
    }
    Ok(())
}

impl ResourceDevice for WgpuBackend {
    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[u8],
        stride: u32,
        indices: &[u32],
    ) -> Result<MeshHandle, DeviceError> {
        if stride != Vertex::STRIDE && stride != SimpleVertex::STRIDE {
            return Err(DeviceError::InvalidData {
                what: label.to_string(),
                reason: format!("unsupported vertex stride {stride}"),
            });
        }
        validate_stream(label, vertices, stride)?;
        if indices.is_empty() {
            return Err(DeviceError::InvalidData {
                what: label.to_string(),
                reason: "mesh has no indices".into(),
            });
        }
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.meshes.push(GpuMesh {
            vertices: vertex_buffer,
            indices: index_buffer,
        });
        Ok(MeshHandle((self.meshes.len() - 1) as u32))
    }

    fn create_vertex_buffer(&mut self, label: &str, data: &[u8], stride: u32) -> Result<BufferHandle, DeviceError> {
        validate_stream(label, data, stride)?;
        self.buffers.push(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: data,
            usage: wgpu::BufferUsages::VERTEX,
        }));
        Ok(BufferHandle((self.buffers.len() - 1) as u32))
    }

    fn create_instance_buffer(&mut self, label: &str, data: &[u8], stride: u32) -> Result<BufferHandle, DeviceError> {
        self.create_vertex_buffer(label, data, stride)
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<TextureHandle, DeviceError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(DeviceError::InvalidData {
                what: label.to_string(),
                reason: format!("expected {expected} bytes for {width}x{height}, got {}", rgba.len()),
            });
        }
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        self.textures
            .push(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        Ok(TextureHandle((self.textures.len() - 1) as u32))
    }

    fn shader(&mut self, program: ShaderProgram) -> Result<ShaderHandle, DeviceError> {
        self.compile(ShaderModuleKind::of(program))?;
        Ok(ShaderHandle(program as u32))
    }
}

impl RenderBackend for WgpuBackend {
    fn has_swap_chain(&self) -> bool {
        self.surface.is_some()
    }

    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let (width, height) = (width.max(1), height.max(1));
        if let Some(binding) = &mut self.surface {
            binding.config.width = width;
            binding.config.height = height;
            binding.surface.configure(&self.device, &binding.config);
        }
        self.targets = TargetSet::new(&self.device, width, height);
        self.width = width;
        self.height = height;
        tracing::debug!(width, height, "render targets rebuilt");
        Ok(())
    }

    fn clear_colour(&mut self, target: ColourTarget, colour: [f32; 4]) {
        self.recorded.push(Recorded::ClearColour { target, colour });
    }

    fn clear_depth(&mut self, target: DepthTarget) {
        self.recorded.push(Recorded::ClearDepth(target));
    }

    fn upload(&mut self, buffer: ConstantBuffer, bytes: &[u8]) -> Result<(), RenderError> {
        self.rings[buffer.slot() as usize].push(bytes)?;
        Ok(())
    }

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: ConstantBuffer) {
        let table = match stage {
            ShaderStage::Vertex => &mut self.state.vertex_uniforms,
            ShaderStage::Fragment => &mut self.state.fragment_uniforms,
        };
        match table.get_mut(slot as usize) {
            Some(entry) => *entry = buffer,
            None => tracing::warn!(?stage, slot, %buffer, "constant buffer slot out of range"),
        }
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.state.raster = state;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
    }

    fn set_blend(&mut self, blend: Option<BlendMode>) {
        self.state.blend = blend;
    }

    fn bind_render_targets(&mut self, targets: RenderTargets) {
        self.state.targets = Some(targets);
    }

    fn bind_shader_resource(&mut self, stage: ShaderStage, slot: u32, resource: ShaderResource) {
        let entry = match stage {
            ShaderStage::Fragment => self.state.fragment_resources.get_mut(slot as usize),
            ShaderStage::Vertex if slot == 0 => Some(&mut self.state.vertex_resource),
            ShaderStage::Vertex => None,
        };
        match entry {
            Some(entry) => *entry = resource,
            None => tracing::warn!(?stage, slot, "shader resource slot out of range"),
        }
    }

    fn unbind_all(&mut self) {
        self.state.targets = None;
        self.state.fragment_resources = [ShaderResource::None; FRAGMENT_TEXTURE_SLOTS];
        self.state.vertex_resource = ShaderResource::None;
    }

    fn use_shader(&mut self, shader: ShaderHandle) {
        self.state.program = Self::program_of(shader);
        if self.state.program.is_none() {
            tracing::warn!(handle = shader.0, "unknown shader handle");
        }
    }

    fn set_mesh(&mut self, mesh: MeshHandle) {
        self.state.mesh = Some(mesh);
        self.state.vertex_buffer = None;
    }

    fn set_vertex_buffer(&mut self, buffer: BufferHandle) {
        self.state.vertex_buffer = Some(buffer);
    }

    fn set_instance_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        if slot != 1 {
            tracing::warn!(slot, "instance streams live in vertex slot 1");
        }
        self.state.instances = Some(buffer);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.record_draw(DrawKind::Indexed {
            index_count,
            instance_count: 1,
        });
    }

    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32) {
        self.record_draw(DrawKind::Indexed {
            index_count,
            instance_count,
        });
    }

    fn draw(&mut self, vertex_count: u32) {
        self.record_draw(DrawKind::Vertices { vertex_count });
    }

    fn generate_mips(&mut self, target: TargetTexture) {
        self.recorded.push(Recorded::GenerateMips(target));
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let Some(frame) = self.acquire()? else {
            self.finish_frame();
            return Ok(());
        };
        let back_buffer = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let commands = std::mem::take(&mut self.recorded);
        self.ensure_pipelines(&commands)?;
        self.write_uniforms();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        let steps = plan(&commands);
        for step in &steps {
            match step {
                PassStep::Render(pass) => self.encode_pass(&mut encoder, pass, &back_buffer),
                PassStep::Mips(texture) => self.encode_mips(&mut encoder, *texture),
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(passes = steps.len(), "frame submitted");

        self.finish_frame();
        Ok(())
    }
}
