use crate::targets::{DEPTH_FORMAT, HDR_FORMAT};
use ember_common::{InstanceData, ShaderProgram, SimpleVertex, Vertex};
use ember_ecs::BlendMode;
use ember_render::{RasterState, RenderTargets};

/// Uniform bindings per stage group; one per constant buffer slot.
pub const UNIFORM_SLOTS: u32 = 8;
/// Fragment texture slots: three colour, then two shadow depth.
pub const FRAGMENT_TEXTURE_SLOTS: usize = 5;

pub const LINEAR_SAMPLER_BINDING: u32 = 5;
pub const SHADOW_SAMPLER_BINDING: u32 = 6;
pub const VERTEX_TEXTURE_BINDING: u32 = 7;

const SCENE_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x3,
    3 => Float32x3,
    4 => Float32x2,
];

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    5 => Float32x3,
    6 => Float32x3,
];

const SIMPLE_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x2,
];

/// Attachment shape of a pass, which is all a pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetLayout {
    BackBuffer,
    GBuffer,
    Shadow,
    Offscreen,
}

impl From<RenderTargets> for TargetLayout {
    fn from(targets: RenderTargets) -> Self {
        match targets {
            RenderTargets::BackBuffer => Self::BackBuffer,
            RenderTargets::GBuffer => Self::GBuffer,
            RenderTargets::Shadow(_) => Self::Shadow,
            RenderTargets::Offscreen(_) => Self::Offscreen,
        }
    }
}

impl TargetLayout {
    pub fn colour_count(self) -> usize {
        match self {
            Self::BackBuffer | Self::Offscreen => 1,
            Self::GBuffer => 3,
            Self::Shadow => 0,
        }
    }

    pub fn has_depth(self) -> bool {
        matches!(self, Self::GBuffer | Self::Shadow)
    }
}

/// Everything that selects a distinct render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ShaderProgram,
    pub layout: TargetLayout,
    pub raster: RasterState,
    pub depth_test: bool,
    pub blend: Option<BlendMode>,
}

impl PipelineKey {
    /// Quads ignore the wireframe toggle; only scene geometry is drawn as lines.
    pub fn polygon_mode(&self, line_mode: bool) -> wgpu::PolygonMode {
        if line_mode && self.raster == RasterState::Wireframe {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        }
    }
}

pub fn blend_state(blend: Option<BlendMode>) -> wgpu::BlendState {
    match blend {
        None => wgpu::BlendState::REPLACE,
        Some(BlendMode::Alpha) => wgpu::BlendState::ALPHA_BLENDING,
        Some(BlendMode::Additive) => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    }
}

fn vertex_layouts(program: ShaderProgram) -> Vec<wgpu::VertexBufferLayout<'static>> {
    if !program.uses_scene_vertices() {
        return vec![wgpu::VertexBufferLayout {
            array_stride: u64::from(SimpleVertex::STRIDE),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &SIMPLE_ATTRIBUTES,
        }];
    }
    let mut layouts = vec![wgpu::VertexBufferLayout {
        array_stride: u64::from(Vertex::STRIDE),
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &SCENE_ATTRIBUTES,
    }];
    if program.is_instanced() {
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: u64::from(InstanceData::STRIDE),
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &INSTANCE_ATTRIBUTES,
        });
    }
    layouts
}

/// Bind group layouts shared by every program.
pub struct Layouts {
    pub vertex_uniforms: wgpu::BindGroupLayout,
    pub fragment_uniforms: wgpu::BindGroupLayout,
    pub resources: wgpu::BindGroupLayout,
    pub pipeline: wgpu::PipelineLayout,
    pub mip: wgpu::BindGroupLayout,
    pub mip_pipeline: wgpu::PipelineLayout,
}

fn uniform_entries(visibility: wgpu::ShaderStages) -> Vec<wgpu::BindGroupLayoutEntry> {
    (0..UNIFORM_SLOTS)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect()
}

fn texture_entry(binding: u32, visibility: wgpu::ShaderStages, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vertex_uniforms_layout"),
            entries: &uniform_entries(wgpu::ShaderStages::VERTEX),
        });
        let fragment_uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fragment_uniforms_layout"),
            entries: &uniform_entries(wgpu::ShaderStages::FRAGMENT),
        });

        let colour = wgpu::TextureSampleType::Float { filterable: true };
        let fragment = wgpu::ShaderStages::FRAGMENT;
        let resources = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("resources_layout"),
            entries: &[
                texture_entry(0, fragment, colour),
                texture_entry(1, fragment, colour),
                texture_entry(2, fragment, colour),
                texture_entry(3, fragment, wgpu::TextureSampleType::Depth),
                texture_entry(4, fragment, wgpu::TextureSampleType::Depth),
                wgpu::BindGroupLayoutEntry {
                    binding: LINEAR_SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SHADOW_SAMPLER_BINDING,
                    visibility: fragment,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
                texture_entry(VERTEX_TEXTURE_BINDING, wgpu::ShaderStages::VERTEX, colour),
            ],
        });

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("deferred_pipeline_layout"),
            bind_group_layouts: &[&vertex_uniforms, &fragment_uniforms, &resources],
            push_constant_ranges: &[],
        });

        let mip = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mip_layout"),
            entries: &[
                texture_entry(0, fragment, colour),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: fragment,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let mip_pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mip_pipeline_layout"),
            bind_group_layouts: &[&mip],
            push_constant_ranges: &[],
        });

        Self {
            vertex_uniforms,
            fragment_uniforms,
            resources,
            pipeline,
            mip,
            mip_pipeline,
        }
    }
}

/// Build the pipeline for `key` from an already compiled module.
pub fn create_pipeline(
    device: &wgpu::Device,
    layouts: &Layouts,
    module: &wgpu::ShaderModule,
    key: PipelineKey,
    surface_format: wgpu::TextureFormat,
    line_mode: bool,
) -> wgpu::RenderPipeline {
    let (vertex_entry, fragment_entry) = crate::shaders::entry_points(key.program);
    let colour_format = match key.layout {
        TargetLayout::BackBuffer => surface_format,
        _ => HDR_FORMAT,
    };
    let targets: Vec<Option<wgpu::ColorTargetState>> = (0..key.layout.colour_count())
        .map(|_| {
            Some(wgpu::ColorTargetState {
                format: colour_format,
                blend: Some(blend_state(key.blend)),
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
        .collect();
    let buffers = vertex_layouts(key.program);

    let depth_stencil = key.layout.has_depth().then(|| wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: key.depth_test,
        depth_compare: if key.depth_test {
            wgpu::CompareFunction::Less
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: Default::default(),
        bias: if key.layout == TargetLayout::Shadow {
            wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            }
        } else {
            Default::default()
        },
    });

    let label = format!("{}_{:?}_pipeline", key.program, key.layout);
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(&layouts.pipeline),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vertex_entry),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: fragment_entry
            .filter(|_| !targets.is_empty())
            .map(|entry| wgpu::FragmentState {
                module,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                targets: &targets,
            }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            polygon_mode: key.polygon_mode(line_mode),
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

/// Full-screen triangle pipeline that downsamples one mip into the next.
pub fn create_mip_pipeline(device: &wgpu::Device, layouts: &Layouts) -> wgpu::RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("mip_blit_shader"),
        source: wgpu::ShaderSource::Wgsl(crate::shaders::MIP_BLIT.into()),
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("mip_blit_pipeline"),
        layout: Some(&layouts.mip_pipeline),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_render::{ShadowMap, TargetTexture};

    #[test]
    fn layouts_follow_targets() {
        assert_eq!(TargetLayout::from(RenderTargets::GBuffer).colour_count(), 3);
        assert!(TargetLayout::from(RenderTargets::Shadow(ShadowMap::Moon)).has_depth());
        assert_eq!(
            TargetLayout::from(RenderTargets::Offscreen(TargetTexture::BlurOutput)),
            TargetLayout::Offscreen
        );
        assert!(!TargetLayout::BackBuffer.has_depth());
    }

    #[test]
    fn only_wireframe_uses_line_mode() {
        let key = PipelineKey {
            program: ShaderProgram::GBuffer,
            layout: TargetLayout::GBuffer,
            raster: RasterState::Wireframe,
            depth_test: true,
            blend: None,
        };
        assert_eq!(key.polygon_mode(true), wgpu::PolygonMode::Line);
        assert_eq!(key.polygon_mode(false), wgpu::PolygonMode::Fill);
        let quad = PipelineKey {
            raster: RasterState::Quad,
            ..key
        };
        assert_eq!(quad.polygon_mode(true), wgpu::PolygonMode::Fill);
    }

    #[test]
    fn vertex_layouts_match_programs() {
        assert_eq!(vertex_layouts(ShaderProgram::GBufferInstanced).len(), 2);
        assert_eq!(vertex_layouts(ShaderProgram::SunShadow).len(), 1);
        let quad = vertex_layouts(ShaderProgram::Composite);
        assert_eq!(quad[0].array_stride, 20);
    }

    #[test]
    fn additive_blend_adds() {
        let state = blend_state(Some(BlendMode::Additive));
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend_state(None), wgpu::BlendState::REPLACE);
    }
}
