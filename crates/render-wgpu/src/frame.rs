//! Recorded frame commands and their grouping into render passes.
//!
//! The backend exposes immediate-context semantics but wgpu wants whole
//! passes, so commands are recorded and split into passes at present:
//! consecutive draws to the same targets share a pass, and clears become
//! the load ops of the next pass that writes the cleared attachment.

use crate::pipelines::{FRAGMENT_TEXTURE_SLOTS, PipelineKey, UNIFORM_SLOTS};
use ember_common::{BufferHandle, MeshHandle};
use ember_render::{
    ColourTarget, ConstantBuffer, DepthTarget, RenderTargets, ShaderResource, TargetTexture,
};

/// A constant buffer as seen by one draw: which buffer, and which staged
/// version of its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformRef {
    pub buffer: ConstantBuffer,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Indexed { index_count: u32, instance_count: u32 },
    Vertices { vertex_count: u32 },
}

/// A draw with a snapshot of the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub targets: RenderTargets,
    pub pipeline: PipelineKey,
    pub vertex_uniforms: [UniformRef; UNIFORM_SLOTS as usize],
    pub fragment_uniforms: [UniformRef; UNIFORM_SLOTS as usize],
    pub fragment_resources: [ShaderResource; FRAGMENT_TEXTURE_SLOTS],
    pub vertex_resource: ShaderResource,
    pub mesh: Option<MeshHandle>,
    pub vertex_buffer: Option<BufferHandle>,
    pub instances: Option<BufferHandle>,
    pub kind: DrawKind,
}

impl DrawCall {
    fn samples(&self, resource: ShaderResource) -> bool {
        self.vertex_resource == resource || self.fragment_resources.contains(&resource)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    ClearColour { target: ColourTarget, colour: [f32; 4] },
    ClearDepth(DepthTarget),
    Draw(DrawCall),
    GenerateMips(TargetTexture),
}

/// The colour and depth attachments written by a pass on `targets`.
pub fn attachments(targets: RenderTargets) -> (Option<ColourTarget>, Option<DepthTarget>) {
    match targets {
        RenderTargets::BackBuffer => (Some(ColourTarget::BackBuffer), None),
        RenderTargets::GBuffer => (Some(ColourTarget::GBuffer), Some(DepthTarget::Main)),
        RenderTargets::Shadow(map) => (None, Some(DepthTarget::Shadow(map))),
        RenderTargets::Offscreen(texture) => (Some(ColourTarget::Offscreen(texture)), None),
    }
}

fn colour_pass(target: ColourTarget) -> RenderTargets {
    match target {
        ColourTarget::BackBuffer => RenderTargets::BackBuffer,
        ColourTarget::GBuffer => RenderTargets::GBuffer,
        ColourTarget::Offscreen(texture) => RenderTargets::Offscreen(texture),
    }
}

fn depth_pass(target: DepthTarget) -> RenderTargets {
    match target {
        DepthTarget::Main => RenderTargets::GBuffer,
        DepthTarget::Shadow(map) => RenderTargets::Shadow(map),
    }
}

/// The sampled resource that reads back a cleared attachment, if any.
fn sampled_form(colour: Option<ColourTarget>, depth: Option<DepthTarget>) -> Vec<ShaderResource> {
    let mut out = Vec::new();
    match colour {
        Some(ColourTarget::Offscreen(texture)) => out.push(ShaderResource::Target(texture)),
        Some(ColourTarget::GBuffer) => out.extend([
            ShaderResource::Target(TargetTexture::GBufferDiffuse),
            ShaderResource::Target(TargetTexture::GBufferNormal),
            ShaderResource::Target(TargetTexture::GBufferEmissive),
        ]),
        _ => {}
    }
    if let Some(DepthTarget::Shadow(map)) = depth {
        out.push(ShaderResource::ShadowDepth(map));
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassPlan<'a> {
    pub targets: RenderTargets,
    pub clear_colour: Option<[f32; 4]>,
    pub clear_depth: bool,
    pub draws: Vec<&'a DrawCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassStep<'a> {
    Render(PassPlan<'a>),
    Mips(TargetTexture),
}

#[derive(Default)]
struct Planner<'a> {
    steps: Vec<PassStep<'a>>,
    open: Option<PassPlan<'a>>,
    colour_clears: Vec<(ColourTarget, [f32; 4])>,
    depth_clears: Vec<DepthTarget>,
}

impl<'a> Planner<'a> {
    fn close(&mut self) {
        if let Some(pass) = self.open.take() {
            self.steps.push(PassStep::Render(pass));
        }
    }

    fn open_writes(&self, colour: Option<ColourTarget>, depth: Option<DepthTarget>) -> bool {
        self.open.as_ref().is_some_and(|pass| {
            let (c, d) = attachments(pass.targets);
            (colour.is_some() && c == colour) || (depth.is_some() && d == depth)
        })
    }

    /// Start a pass on `targets`, folding in any pending clears it writes.
    fn begin(&mut self, targets: RenderTargets) -> PassPlan<'a> {
        let (colour, depth) = attachments(targets);
        let clear_colour = colour.and_then(|c| {
            let index = self.colour_clears.iter().position(|(t, _)| *t == c)?;
            Some(self.colour_clears.remove(index).1)
        });
        let clear_depth = depth.is_some_and(|d| {
            let before = self.depth_clears.len();
            self.depth_clears.retain(|t| *t != d);
            self.depth_clears.len() != before
        });
        PassPlan {
            targets,
            clear_colour,
            clear_depth,
            draws: Vec::new(),
        }
    }

    /// Emit a pass that only clears, for attachments about to be sampled.
    fn flush_clears_sampled_by(&mut self, draw: &DrawCall) {
        let colour: Vec<ColourTarget> = self
            .colour_clears
            .iter()
            .map(|(t, _)| *t)
            .filter(|t| sampled_form(Some(*t), None).into_iter().any(|r| draw.samples(r)))
            .collect();
        let depth: Vec<DepthTarget> = self
            .depth_clears
            .iter()
            .copied()
            .filter(|t| sampled_form(None, Some(*t)).into_iter().any(|r| draw.samples(r)))
            .collect();
        if colour.is_empty() && depth.is_empty() {
            return;
        }
        self.close();
        for target in colour {
            let pass = self.begin(colour_pass(target));
            self.steps.push(PassStep::Render(pass));
        }
        for target in depth {
            let pass = self.begin(depth_pass(target));
            self.steps.push(PassStep::Render(pass));
        }
    }

    fn push(&mut self, command: &'a Recorded) {
        match command {
            Recorded::ClearColour { target, colour } => {
                if self.open_writes(Some(*target), None) {
                    self.close();
                }
                self.colour_clears.retain(|(t, _)| t != target);
                self.colour_clears.push((*target, *colour));
            }
            Recorded::ClearDepth(target) => {
                if self.open_writes(None, Some(*target)) {
                    self.close();
                }
                if !self.depth_clears.contains(target) {
                    self.depth_clears.push(*target);
                }
            }
            Recorded::Draw(draw) => {
                self.flush_clears_sampled_by(draw);
                if self.open.as_ref().is_some_and(|p| p.targets != draw.targets) {
                    self.close();
                }
                if self.open.is_none() {
                    self.open = Some(self.begin(draw.targets));
                }
                if let Some(pass) = self.open.as_mut() {
                    pass.draws.push(draw);
                }
            }
            Recorded::GenerateMips(texture) => {
                self.close();
                self.steps.push(PassStep::Mips(*texture));
            }
        }
    }

    fn finish(mut self) -> Vec<PassStep<'a>> {
        self.close();
        while let Some(&(target, _)) = self.colour_clears.first() {
            let pass = self.begin(colour_pass(target));
            self.steps.push(PassStep::Render(pass));
        }
        while let Some(&target) = self.depth_clears.first() {
            let pass = self.begin(depth_pass(target));
            self.steps.push(PassStep::Render(pass));
        }
        self.steps
    }
}

/// Split a frame's commands into passes.
pub fn plan(commands: &[Recorded]) -> Vec<PassStep<'_>> {
    let mut planner = Planner::default();
    for command in commands {
        planner.push(command);
    }
    planner.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::TargetLayout;
    use ember_common::ShaderProgram;
    use ember_render::{RasterState, ShadowMap};

    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

    fn draw(targets: RenderTargets, program: ShaderProgram) -> Recorded {
        let uniforms = ConstantBuffer::ALL.map(|buffer| UniformRef { buffer, version: 0 });
        Recorded::Draw(DrawCall {
            targets,
            pipeline: PipelineKey {
                program,
                layout: TargetLayout::from(targets),
                raster: RasterState::Solid,
                depth_test: true,
                blend: None,
            },
            vertex_uniforms: uniforms,
            fragment_uniforms: uniforms,
            fragment_resources: [ShaderResource::None; FRAGMENT_TEXTURE_SLOTS],
            vertex_resource: ShaderResource::None,
            mesh: Some(MeshHandle(0)),
            vertex_buffer: None,
            instances: None,
            kind: DrawKind::Indexed {
                index_count: 6,
                instance_count: 1,
            },
        })
    }

    fn sampling(targets: RenderTargets, resource: ShaderResource) -> Recorded {
        let Recorded::Draw(mut call) = draw(targets, ShaderProgram::LightPass) else {
            unreachable!()
        };
        call.fragment_resources[0] = resource;
        Recorded::Draw(call)
    }

    fn render<'s, 'a>(step: &'s PassStep<'a>) -> &'s PassPlan<'a> {
        match step {
            PassStep::Render(pass) => pass,
            PassStep::Mips(_) => panic!("expected a render pass"),
        }
    }

    #[test]
    fn clears_become_load_ops() {
        let commands = vec![
            Recorded::ClearColour {
                target: ColourTarget::GBuffer,
                colour: BLUE,
            },
            Recorded::ClearDepth(DepthTarget::Main),
            draw(RenderTargets::GBuffer, ShaderProgram::GBuffer),
        ];
        let steps = plan(&commands);
        assert_eq!(steps.len(), 1);
        let pass = render(&steps[0]);
        assert_eq!(pass.clear_colour, Some(BLUE));
        assert!(pass.clear_depth);
        assert_eq!(pass.draws.len(), 1);
    }

    #[test]
    fn consecutive_draws_share_a_pass() {
        let commands = vec![
            draw(RenderTargets::GBuffer, ShaderProgram::GBuffer),
            draw(RenderTargets::GBuffer, ShaderProgram::GBuffer),
            draw(RenderTargets::Shadow(ShadowMap::Sun), ShaderProgram::SunShadow),
            draw(RenderTargets::GBuffer, ShaderProgram::GBuffer),
        ];
        let steps = plan(&commands);
        let sizes: Vec<usize> = steps.iter().map(|s| render(s).draws.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
    }

    #[test]
    fn mips_split_passes() {
        let target = RenderTargets::Offscreen(TargetTexture::BrightOutput);
        let commands = vec![
            draw(target, ShaderProgram::BrightPass),
            Recorded::GenerateMips(TargetTexture::LightOutput),
            draw(target, ShaderProgram::BrightPass),
        ];
        let steps = plan(&commands);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1], PassStep::Mips(TargetTexture::LightOutput));
    }

    #[test]
    fn unused_clears_still_run() {
        let commands = vec![
            Recorded::ClearColour {
                target: ColourTarget::Offscreen(TargetTexture::BlurOutput),
                colour: BLUE,
            },
            Recorded::ClearDepth(DepthTarget::Shadow(ShadowMap::Moon)),
            draw(RenderTargets::BackBuffer, ShaderProgram::LightPass),
        ];
        let steps = plan(&commands);
        assert_eq!(steps.len(), 3);
        let blur = render(&steps[1]);
        assert_eq!(blur.targets, RenderTargets::Offscreen(TargetTexture::BlurOutput));
        assert!(blur.draws.is_empty());
        let moon = render(&steps[2]);
        assert!(moon.clear_depth);
        assert_eq!(moon.targets, RenderTargets::Shadow(ShadowMap::Moon));
    }

    #[test]
    fn sampled_target_is_cleared_before_it_is_read() {
        let commands = vec![
            Recorded::ClearDepth(DepthTarget::Shadow(ShadowMap::Sun)),
            sampling(
                RenderTargets::Offscreen(TargetTexture::LightOutput),
                ShaderResource::ShadowDepth(ShadowMap::Sun),
            ),
        ];
        let steps = plan(&commands);
        assert_eq!(steps.len(), 2);
        assert_eq!(render(&steps[0]).targets, RenderTargets::Shadow(ShadowMap::Sun));
        assert!(render(&steps[0]).clear_depth);
        assert_eq!(render(&steps[1]).draws.len(), 1);
    }

    #[test]
    fn clear_after_draws_closes_the_pass() {
        let commands = vec![
            draw(RenderTargets::BackBuffer, ShaderProgram::Composite),
            Recorded::ClearColour {
                target: ColourTarget::BackBuffer,
                colour: BLUE,
            },
            draw(RenderTargets::BackBuffer, ShaderProgram::Composite),
        ];
        let steps = plan(&commands);
        assert_eq!(steps.len(), 2);
        assert_eq!(render(&steps[0]).clear_colour, None);
        assert_eq!(render(&steps[1]).clear_colour, Some(BLUE));
    }
}
