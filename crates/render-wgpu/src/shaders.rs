//! WGSL sources for every shader program.
//!
//! Binding convention shared by all modules:
//! - group 0: vertex-stage constant buffers, binding = slot
//! - group 1: fragment-stage constant buffers, binding = slot
//! - group 2: textures. 0..=2 colour (fragment), 3..=4 shadow depth
//!   (fragment), 5 linear sampler, 6 comparison sampler, 7 colour (vertex)

use ember_common::ShaderProgram;

/// Uniform struct declarations matching the host-side constant layouts.
pub const COMMON: &str = r#"
struct Draw {
    model: mat4x4<f32>,
    mvp: mat4x4<f32>,
    misc: vec4<f32>,
};

struct Update {
    camera_position: vec4<f32>,
    time: vec2<f32>,
    delta: vec2<f32>,
};

struct Misc {
    value: vec4<f32>,
};

struct ViewProj {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    inverse_view: mat4x4<f32>,
    inverse_projection: mat4x4<f32>,
};

struct LightData {
    position: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    attenuation: vec4<f32>,
    view_proj: mat4x4<f32>,
};

struct Lights {
    lights: array<LightData, 2>,
    count: vec4<f32>,
};

struct Particle {
    start_colour: vec4<f32>,
    end_colour: vec4<f32>,
    direction: vec4<f32>,
    emitter_position: vec4<f32>,
    misc: vec4<f32>,
};

struct GBufferOutput {
    @location(0) diffuse: vec4<f32>,
    @location(1) normal: vec4<f32>,
    @location(2) emissive: vec4<f32>,
};

fn luminance(colour: vec3<f32>) -> f32 {
    return dot(colour, vec3<f32>(0.2126, 0.7152, 0.0722));
}
"#;

/// Scene geometry into the G-buffer. The normal target's alpha carries
/// view-space depth for position reconstruction in the light pass.
pub const GBUFFER: &str = r#"
@group(0) @binding(0) var<uniform> draw: Draw;
@group(0) @binding(1) var<uniform> update: Update;
@group(0) @binding(2) var<uniform> render_state: Misc;
@group(0) @binding(3) var<uniform> camera: ViewProj;
@group(1) @binding(2) var<uniform> render_state_fs: Misc;
@group(2) @binding(0) var albedo_map: texture_2d<f32>;
@group(2) @binding(1) var normal_map: texture_2d<f32>;
@group(2) @binding(5) var linear_sampler: sampler;
@group(2) @binding(7) var displacement_map: texture_2d<f32>;

struct SceneVertex {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tangent: vec3<f32>,
    @location(3) binormal: vec3<f32>,
    @location(4) uv: vec2<f32>,
};

struct Instance {
    @location(5) offset: vec3<f32>,
    @location(6) coords: vec3<f32>,
};

struct Varyings {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) tangent: vec3<f32>,
    @location(2) binormal: vec3<f32>,
    @location(3) uv: vec2<f32>,
    @location(4) view_depth: f32,
    @location(5) tint: f32,
    @location(6) hdr: f32,
};

fn shade_vertex(vertex: SceneVertex, offset: vec3<f32>, tint: f32) -> Varyings {
    var local = vertex.position + offset;
    let displacement = textureSampleLevel(displacement_map, linear_sampler, vertex.uv, 0.0).r;
    local = local + vertex.normal * displacement * 0.1 * render_state.value.y;
    if (draw.misc.z > 0.5) {
        local.y = local.y + sin(update.time.x * 2.0 + local.x) * 0.1;
    }
    let world = draw.model * vec4<f32>(local, 1.0);

    var out: Varyings;
    out.clip = draw.mvp * vec4<f32>(local, 1.0);
    out.normal = normalize((draw.model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.tangent = normalize((draw.model * vec4<f32>(vertex.tangent, 0.0)).xyz);
    out.binormal = normalize((draw.model * vec4<f32>(vertex.binormal, 0.0)).xyz);
    out.uv = vertex.uv;
    out.view_depth = (camera.view * world).z;
    out.tint = tint;
    out.hdr = draw.misc.y;
    return out;
}

@vertex
fn vs_main(vertex: SceneVertex) -> Varyings {
    return shade_vertex(vertex, vec3<f32>(0.0), 1.0);
}

@vertex
fn vs_instanced(vertex: SceneVertex, instance: Instance) -> Varyings {
    return shade_vertex(vertex, instance.offset, mix(0.75, 1.0, instance.coords.y));
}

@fragment
fn fs_main(in: Varyings) -> GBufferOutput {
    var albedo = vec4<f32>(0.8, 0.8, 0.8, 1.0);
    if (render_state_fs.value.x > 0.5) {
        albedo = textureSample(albedo_map, linear_sampler, in.uv);
    }
    let bump = textureSample(normal_map, linear_sampler, in.uv).xyz * 2.0 - 1.0;
    var normal = normalize(in.normal);
    if (render_state_fs.value.x > 0.5 && length(bump) > 0.1) {
        normal = normalize(bump.x * in.tangent + bump.y * in.binormal + bump.z * in.normal);
    }

    var out: GBufferOutput;
    out.diffuse = vec4<f32>(albedo.rgb * in.tint, 1.0);
    out.normal = vec4<f32>(normal * 0.5 + 0.5, in.view_depth);
    out.emissive = vec4<f32>(albedo.rgb * in.hdr * 4.0, 1.0);
    return out;
}
"#;

/// Depth-only shadow programs. Sun reads light 0, moon light 1.
pub const SHADOW: &str = r#"
@group(0) @binding(0) var<uniform> draw: Draw;
@group(0) @binding(5) var<uniform> lights: Lights;

struct SceneVertex {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tangent: vec3<f32>,
    @location(3) binormal: vec3<f32>,
    @location(4) uv: vec2<f32>,
};

struct Instance {
    @location(5) offset: vec3<f32>,
    @location(6) coords: vec3<f32>,
};

fn project(light: u32, local: vec3<f32>) -> vec4<f32> {
    return lights.lights[light].view_proj * draw.model * vec4<f32>(local, 1.0);
}

@vertex
fn vs_sun(vertex: SceneVertex) -> @builtin(position) vec4<f32> {
    return project(0u, vertex.position);
}

@vertex
fn vs_sun_instanced(vertex: SceneVertex, instance: Instance) -> @builtin(position) vec4<f32> {
    return project(0u, vertex.position + instance.offset);
}

@vertex
fn vs_moon(vertex: SceneVertex) -> @builtin(position) vec4<f32> {
    return project(1u, vertex.position);
}

@vertex
fn vs_moon_instanced(vertex: SceneVertex, instance: Instance) -> @builtin(position) vec4<f32> {
    return project(1u, vertex.position + instance.offset);
}
"#;

/// Vertex stage shared by the full-screen passes. Quads are authored in
/// clip space. The MRT selector and blur parameters ride along flat.
pub const QUAD_VERTEX: &str = r#"
@group(0) @binding(4) var<uniform> mrt: Misc;
@group(0) @binding(6) var<uniform> blur: Misc;

struct QuadVertex {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct QuadVaryings {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) @interpolate(flat) view: u32,
    @location(2) @interpolate(flat) blur: vec4<f32>,
};

@vertex
fn vs_quad(vertex: QuadVertex) -> QuadVaryings {
    var out: QuadVaryings;
    out.clip = vec4<f32>(vertex.position.xy, 0.0, 1.0);
    out.uv = vertex.uv;
    out.view = u32(mrt.value.x);
    out.blur = blur.value;
    return out;
}
"#;

/// Deferred lighting with two shadow-mapped lights, plus the raw MRT views.
pub const LIGHT_PASS: &str = r#"
@group(1) @binding(0) var<uniform> draw: Draw;
@group(1) @binding(2) var<uniform> camera: ViewProj;
@group(1) @binding(5) var<uniform> lights: Lights;
@group(2) @binding(0) var gbuffer_diffuse: texture_2d<f32>;
@group(2) @binding(1) var gbuffer_normal: texture_2d<f32>;
@group(2) @binding(2) var gbuffer_emissive: texture_2d<f32>;
@group(2) @binding(3) var sun_shadow: texture_depth_2d;
@group(2) @binding(4) var moon_shadow: texture_depth_2d;
@group(2) @binding(5) var linear_sampler: sampler;
@group(2) @binding(6) var shadow_sampler: sampler_comparison;

fn world_position(uv: vec2<f32>, view_depth: f32) -> vec3<f32> {
    let ndc = vec2<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    let far = camera.inverse_projection * vec4<f32>(ndc, 1.0, 1.0);
    let ray = far.xyz / far.w;
    let view_pos = ray * (view_depth / ray.z);
    return (camera.inverse_view * vec4<f32>(view_pos, 1.0)).xyz;
}

fn shadow_uv(light: LightData, world: vec3<f32>) -> vec3<f32> {
    let clip = light.view_proj * vec4<f32>(world, 1.0);
    let ndc = clip.xyz / clip.w;
    return vec3<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5, ndc.z - 0.002);
}

fn in_bounds(coords: vec3<f32>) -> bool {
    return all(coords.xy >= vec2<f32>(0.0)) && all(coords.xy <= vec2<f32>(1.0)) && coords.z <= 1.0;
}

fn sun_visibility(world: vec3<f32>) -> f32 {
    let coords = shadow_uv(lights.lights[0], world);
    let lit = textureSampleCompareLevel(sun_shadow, shadow_sampler, coords.xy, coords.z);
    return select(1.0, lit, in_bounds(coords));
}

fn moon_visibility(world: vec3<f32>) -> f32 {
    let coords = shadow_uv(lights.lights[1], world);
    let lit = textureSampleCompareLevel(moon_shadow, shadow_sampler, coords.xy, coords.z);
    return select(1.0, lit, in_bounds(coords));
}

fn shade(light: LightData, visibility: f32, albedo: vec3<f32>, normal: vec3<f32>, world: vec3<f32>) -> vec3<f32> {
    let to_light = light.position.xyz - world;
    let distance = length(to_light);
    let l = to_light / max(distance, 0.0001);
    let v = normalize(camera.inverse_view[3].xyz - world);
    let h = normalize(l + v);
    let a = light.attenuation.xyz;
    let falloff = 1.0 / max(a.x + a.y * distance + a.z * distance * distance, 0.001);
    let diffuse = max(dot(normal, l), 0.0) * light.diffuse.rgb * albedo;
    let specular = pow(max(dot(normal, h), 0.0), 32.0) * light.specular.rgb;
    let ambient = light.ambient.rgb * albedo;
    return light.ambient.w * (ambient + (diffuse + specular) * visibility * falloff);
}

fn depth_view(map: u32, uv: vec2<f32>) -> vec4<f32> {
    let size = textureDimensions(sun_shadow);
    var depth = 1.0;
    if (map == 0u) {
        depth = textureLoad(sun_shadow, vec2<i32>(uv * vec2<f32>(size)), 0);
    } else {
        let moon_size = textureDimensions(moon_shadow);
        depth = textureLoad(moon_shadow, vec2<i32>(uv * vec2<f32>(moon_size)), 0);
    }
    return vec4<f32>(vec3<f32>(depth), 1.0);
}

@fragment
fn fs_main(in: QuadVaryings) -> @location(0) vec4<f32> {
    let diffuse = textureSample(gbuffer_diffuse, linear_sampler, in.uv);
    let packed = textureSample(gbuffer_normal, linear_sampler, in.uv);
    let emissive = textureSample(gbuffer_emissive, linear_sampler, in.uv).rgb;
    let world = world_position(in.uv, packed.w);
    let normal = normalize(packed.xyz * 2.0 - 1.0);
    let sun = sun_visibility(world);
    let moon = moon_visibility(world);

    switch in.view {
        case 1u: { return diffuse; }
        case 2u: { return vec4<f32>(packed.xyz, 1.0); }
        case 3u: { return depth_view(0u, in.uv); }
        case 7u: { return depth_view(1u, in.uv); }
        default: {}
    }

    var colour = vec3<f32>(0.0);
    if (lights.count.x > 0.5) {
        colour = colour + shade(lights.lights[0], sun, diffuse.rgb, normal, world);
    }
    if (lights.count.x > 1.5) {
        colour = colour + shade(lights.lights[1], moon, diffuse.rgb, normal, world);
    }
    if (in.view == 6u) {
        return vec4<f32>(colour, 1.0);
    }
    // Empty G-buffer texels keep the clear colour.
    if (packed.w <= 0.0) {
        return diffuse;
    }
    return vec4<f32>((colour + emissive) * draw.misc.x, 1.0);
}
"#;

/// Keeps what is brighter than the scene average.
pub const BRIGHT_PASS: &str = r#"
@group(2) @binding(0) var light_output: texture_2d<f32>;
@group(2) @binding(5) var linear_sampler: sampler;

@fragment
fn fs_main(in: QuadVaryings) -> @location(0) vec4<f32> {
    let colour = textureSample(light_output, linear_sampler, in.uv).rgb;
    let smallest = f32(textureNumLevels(light_output) - 1u);
    let average = textureSampleLevel(light_output, linear_sampler, vec2<f32>(0.5), smallest).rgb;
    let threshold = max(1.0, luminance(average) * 1.5);
    let excess = max(luminance(colour) - threshold, 0.0);
    return vec4<f32>(colour * (excess / max(luminance(colour), 0.0001)), 1.0);
}
"#;

/// Nine-tap separable gaussian. `blur.xy` is the direction, `blur.zw` the
/// viewport size.
pub const BLUR: &str = r#"
@group(2) @binding(1) var bright_output: texture_2d<f32>;
@group(2) @binding(5) var linear_sampler: sampler;

@fragment
fn fs_main(in: QuadVaryings) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let texel = in.blur.xy / max(in.blur.zw, vec2<f32>(1.0));
    var colour = textureSample(bright_output, linear_sampler, in.uv).rgb * weights[0];
    for (var i = 1; i < 5; i = i + 1) {
        let offset = texel * f32(i) * 2.0;
        colour = colour + textureSample(bright_output, linear_sampler, in.uv + offset).rgb * weights[i];
        colour = colour + textureSample(bright_output, linear_sampler, in.uv - offset).rgb * weights[i];
    }
    return vec4<f32>(colour, 1.0);
}
"#;

/// Bloom composite and tone mapping onto the back buffer.
pub const COMPOSITE: &str = r#"
@group(1) @binding(0) var<uniform> draw: Draw;
@group(2) @binding(0) var light_output: texture_2d<f32>;
@group(2) @binding(1) var blur_output: texture_2d<f32>;
@group(2) @binding(5) var linear_sampler: sampler;

@fragment
fn fs_main(in: QuadVaryings) -> @location(0) vec4<f32> {
    let lit = textureSampleLevel(light_output, linear_sampler, in.uv, 0.0).rgb;
    let bloom = textureSample(blur_output, linear_sampler, in.uv).rgb;
    switch in.view {
        case 4u: { return vec4<f32>(vec3<f32>(luminance(lit)), 1.0); }
        case 5u: { return vec4<f32>(bloom, 1.0); }
        default: {}
    }
    let exposure = max(draw.misc.x, 0.0001);
    let mapped = vec3<f32>(1.0) - exp(-(lit + bloom) * exposure);
    return vec4<f32>(mapped, 1.0);
}
"#;

/// Camera-facing particle quads. The particle index rides in position.z.
pub const PARTICLE: &str = r#"
@group(0) @binding(1) var<uniform> update: Update;
@group(0) @binding(3) var<uniform> camera: ViewProj;
@group(0) @binding(7) var<uniform> particle: Particle;

struct ParticleVertex {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct ParticleVaryings {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) colour: vec4<f32>,
    @location(2) view_depth: f32,
};

fn hash(n: f32) -> f32 {
    return fract(sin(n * 12.9898) * 43758.5453);
}

@vertex
fn vs_main(vertex: ParticleVertex) -> ParticleVaryings {
    let index = vertex.position.z;
    let lifespan = max(particle.misc.y, 0.001);
    let age = fract((update.time.x + hash(index) * lifespan) / lifespan);
    let spread = vec3<f32>(hash(index + 1.0) - 0.5, 0.0, hash(index + 2.0) - 0.5);
    let centre = particle.emitter_position.xyz
        + (normalize(particle.direction.xyz) + spread) * particle.misc.x * age * lifespan;

    let right = vec3<f32>(camera.view[0].x, camera.view[1].x, camera.view[2].x);
    let up = vec3<f32>(camera.view[0].y, camera.view[1].y, camera.view[2].y);
    let size = mix(0.3, 0.05, age);
    let world = centre + (right * vertex.position.x + up * vertex.position.y) * size;
    let view_pos = camera.view * vec4<f32>(world, 1.0);

    var out: ParticleVaryings;
    out.clip = camera.projection * view_pos;
    out.uv = vertex.uv;
    let colour = mix(particle.start_colour.rgb, particle.end_colour.rgb, age);
    out.colour = vec4<f32>(colour, 1.0 - age);
    out.view_depth = view_pos.z;
    return out;
}

@fragment
fn fs_main(in: ParticleVaryings) -> GBufferOutput {
    let d = length(in.uv - vec2<f32>(0.5)) * 2.0;
    let alpha = in.colour.a * clamp(1.0 - d, 0.0, 1.0);
    var out: GBufferOutput;
    out.diffuse = vec4<f32>(in.colour.rgb, alpha);
    out.normal = vec4<f32>(0.5, 1.0, 0.5, in.view_depth);
    out.emissive = vec4<f32>(in.colour.rgb * 2.0, alpha);
    return out;
}
"#;

/// Box downsample of one mip into the next.
pub const MIP_BLIT: &str = r#"
@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;

struct BlitVaryings {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> BlitVaryings {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: BlitVaryings;
    out.clip = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: BlitVaryings) -> @location(0) vec4<f32> {
    return textureSample(source, source_sampler, in.uv);
}
"#;

/// The shader modules programs are compiled from. Several programs share one
/// module through different entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderModuleKind {
    GBuffer,
    Shadow,
    LightPass,
    BrightPass,
    Blur,
    Composite,
    Particle,
}

impl ShaderModuleKind {
    pub fn of(program: ShaderProgram) -> Self {
        match program {
            ShaderProgram::GBuffer | ShaderProgram::GBufferInstanced => Self::GBuffer,
            ShaderProgram::SunShadow
            | ShaderProgram::SunShadowInstanced
            | ShaderProgram::MoonShadow
            | ShaderProgram::MoonShadowInstanced => Self::Shadow,
            ShaderProgram::LightPass => Self::LightPass,
            ShaderProgram::BrightPass => Self::BrightPass,
            ShaderProgram::Blur => Self::Blur,
            ShaderProgram::Composite => Self::Composite,
            ShaderProgram::Particle => Self::Particle,
        }
    }

    /// Full WGSL source: shared declarations, the quad vertex stage where
    /// needed, then the module body.
    pub fn source(self) -> String {
        let body = match self {
            Self::GBuffer => GBUFFER,
            Self::Shadow => SHADOW,
            Self::LightPass => LIGHT_PASS,
            Self::BrightPass => BRIGHT_PASS,
            Self::Blur => BLUR,
            Self::Composite => COMPOSITE,
            Self::Particle => PARTICLE,
        };
        let quad = if self.is_full_screen() { QUAD_VERTEX } else { "" };
        format!("{COMMON}{quad}{body}")
    }

    pub fn is_full_screen(self) -> bool {
        matches!(
            self,
            Self::LightPass | Self::BrightPass | Self::Blur | Self::Composite
        )
    }
}

/// Vertex and fragment entry points. Shadow programs have no fragment stage.
pub fn entry_points(program: ShaderProgram) -> (&'static str, Option<&'static str>) {
    match program {
        ShaderProgram::GBuffer => ("vs_main", Some("fs_main")),
        ShaderProgram::GBufferInstanced => ("vs_instanced", Some("fs_main")),
        ShaderProgram::SunShadow => ("vs_sun", None),
        ShaderProgram::SunShadowInstanced => ("vs_sun_instanced", None),
        ShaderProgram::MoonShadow => ("vs_moon", None),
        ShaderProgram::MoonShadowInstanced => ("vs_moon_instanced", None),
        ShaderProgram::LightPass
        | ShaderProgram::BrightPass
        | ShaderProgram::Blur
        | ShaderProgram::Composite => ("vs_quad", Some("fs_main")),
        ShaderProgram::Particle => ("vs_main", Some("fs_main")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_has_an_entry_point_in_its_module() {
        for program in ShaderProgram::ALL {
            let source = ShaderModuleKind::of(program).source();
            let (vertex, fragment) = entry_points(program);
            assert!(source.contains(&format!("fn {vertex}(")), "{program}: {vertex}");
            if let Some(fragment) = fragment {
                assert!(source.contains(&format!("fn {fragment}(")), "{program}: {fragment}");
            }
        }
    }

    #[test]
    fn only_shadow_programs_are_depth_only() {
        for program in ShaderProgram::ALL {
            let depth_only = entry_points(program).1.is_none();
            assert_eq!(depth_only, ShaderModuleKind::of(program) == ShaderModuleKind::Shadow);
        }
    }

    #[test]
    fn quad_stage_is_prepended_to_post_modules() {
        assert!(ShaderModuleKind::Blur.source().contains("fn vs_quad("));
        assert!(!ShaderModuleKind::GBuffer.source().contains("fn vs_quad("));
        assert!(ShaderModuleKind::Particle.source().starts_with(COMMON));
    }

    #[test]
    fn light_pass_shades_each_live_light() {
        assert!(LIGHT_PASS.contains("lights.count.x > 0.5"));
        assert!(LIGHT_PASS.contains("lights.count.x > 1.5"));
        assert!(LIGHT_PASS.contains("shade(lights.lights[1]"));
    }
}
