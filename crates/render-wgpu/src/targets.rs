use ember_render::{ShadowMap, TargetTexture};
use std::collections::BTreeMap;

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const ALL_TARGETS: [TargetTexture; 6] = [
    TargetTexture::GBufferDiffuse,
    TargetTexture::GBufferNormal,
    TargetTexture::GBufferEmissive,
    TargetTexture::LightOutput,
    TargetTexture::BrightOutput,
    TargetTexture::BlurOutput,
];

/// Number of mip levels in a full chain for a `width` x `height` image.
pub fn mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// One offscreen colour target with a view per mip level.
pub struct ColourTexture {
    _texture: wgpu::Texture,
    sampled: wgpu::TextureView,
    levels: Vec<wgpu::TextureView>,
}

impl ColourTexture {
    fn new(device: &wgpu::Device, label: &str, width: u32, height: u32, mips: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mips,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let sampled = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let levels = (0..mips)
            .map(|level| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    base_mip_level: level,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        Self {
            _texture: texture,
            sampled,
            levels,
        }
    }

    /// Writable view of the top level.
    pub fn attachment(&self) -> &wgpu::TextureView {
        &self.levels[0]
    }

    pub fn sampled(&self) -> &wgpu::TextureView {
        &self.sampled
    }

    pub fn levels(&self) -> &[wgpu::TextureView] {
        &self.levels
    }
}

fn depth_texture(device: &wgpu::Device, label: &str, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

/// Viewport-sized targets, rebuilt on resize.
pub struct TargetSet {
    textures: BTreeMap<TargetTexture, ColourTexture>,
    main_depth: wgpu::TextureView,
}

impl TargetSet {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let textures = ALL_TARGETS
            .into_iter()
            .map(|target| {
                // Only the light output carries a chain; the bright pass reads
                // its smallest level as the scene average.
                let mips = if target == TargetTexture::LightOutput {
                    mip_count(width, height)
                } else {
                    1
                };
                let label = format!("{target:?}");
                (target, ColourTexture::new(device, &label, width, height, mips))
            })
            .collect();
        Self {
            textures,
            main_depth: depth_texture(device, "main_depth", width, height),
        }
    }

    pub fn get(&self, target: TargetTexture) -> Option<&ColourTexture> {
        self.textures.get(&target)
    }

    pub fn main_depth(&self) -> &wgpu::TextureView {
        &self.main_depth
    }
}

/// Square sun and moon depth maps. Their size does not follow the viewport.
pub struct ShadowMaps {
    sun: wgpu::TextureView,
    moon: wgpu::TextureView,
}

impl ShadowMaps {
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        let size = size.max(1);
        Self {
            sun: depth_texture(device, "sun_shadow", size, size),
            moon: depth_texture(device, "moon_shadow", size, size),
        }
    }

    pub fn view(&self, map: ShadowMap) -> &wgpu::TextureView {
        match map {
            ShadowMap::Sun => &self.sun,
            ShadowMap::Moon => &self.moon,
        }
    }
}

/// Stand-ins bound when a slot has nothing: opaque white colour and a depth
/// texel at the far plane.
pub struct Fallbacks {
    pub white: wgpu::TextureView,
    pub far_depth: wgpu::TextureView,
}

impl Fallbacks {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        use wgpu::util::DeviceExt;

        let white = device
            .create_texture_with_data(
                queue,
                &wgpu::TextureDescriptor {
                    label: Some("fallback_white"),
                    size: wgpu::Extent3d {
                        width: 1,
                        height: 1,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                &[255; 4],
            )
            .create_view(&wgpu::TextureViewDescriptor::default());

        let far_depth = depth_texture(device, "fallback_depth", 1, 1);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("fallback_depth_clear"),
        });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fallback_depth_clear"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &far_depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        queue.submit(std::iter::once(encoder.finish()));

        Self { white, far_depth }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_length() {
        assert_eq!(mip_count(1, 1), 1);
        assert_eq!(mip_count(2, 1), 2);
        assert_eq!(mip_count(1280, 720), 11);
        assert_eq!(mip_count(0, 0), 1);
    }
}
