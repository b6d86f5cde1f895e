/// WGSL shader for instanced tile models.
///
/// Each instance is a cell position; the mesh is the model's box. Fragments
/// are lit by the sun, darkened where the shadow map says the sun is blocked,
/// plus every point light in the storage buffer.
pub const TILE_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    sun_view_proj: mat4x4<f32>,
    sun_direction: vec4<f32>,
    // xyz: highlighted cell centre, w: 1.0 when a cell is highlighted
    highlight: vec4<f32>,
    light_count: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

struct PointLight {
    position: vec3<f32>,
    intensity: f32,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(0) @binding(1)
var<storage, read> lights: array<PointLight>;

@group(0) @binding(2)
var shadow_map: texture_depth_2d;

@group(0) @binding(3)
var shadow_sampler: sampler_comparison;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

struct InstanceInput {
    @location(3) offset: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) @interpolate(flat) cell: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let world = vertex.position + instance.offset.xyz;

    var out: VertexOutput;
    out.clip_position = globals.view_proj * vec4<f32>(world, 1.0);
    out.world_position = world;
    out.normal = vertex.normal;
    out.color = vertex.color;
    out.cell = instance.offset.xyz;
    return out;
}

// 1.0 when the sun reaches `world`, 0.0 when it is blocked.
fn sunlit(world: vec3<f32>) -> f32 {
    let clip = globals.sun_view_proj * vec4<f32>(world, 1.0);
    let ndc = clip.xyz / clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    let lit = textureSampleCompareLevel(shadow_map, shadow_sampler, uv, ndc.z - 0.002);
    let inside = all(uv >= vec2<f32>(0.0)) && all(uv <= vec2<f32>(1.0)) && ndc.z <= 1.0;
    return select(1.0, lit, inside);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let ambient = 0.35;
    let sun = max(dot(n, -normalize(globals.sun_direction.xyz)), 0.0) * 0.65
        * sunlit(in.world_position);
    var light = vec3<f32>(ambient + sun);

    for (var i = 0u; i < globals.light_count; i = i + 1u) {
        let l = lights[i];
        let to_light = l.position - in.world_position;
        let d2 = dot(to_light, to_light);
        let facing = max(dot(n, normalize(to_light)), 0.0);
        let falloff = l.intensity / (l.intensity + d2 * 0.02);
        light += vec3<f32>(1.0, 0.7, 0.4) * falloff * facing;
    }

    var color = in.color.rgb * light;
    if (globals.highlight.w > 0.5 && all(abs(in.cell.xz - globals.highlight.xz) < vec2<f32>(0.5))) {
        color = mix(color, vec3<f32>(1.0, 0.9, 0.2), 0.45);
    }
    return vec4<f32>(color, in.color.a);
}
"#;

/// Depth-only shader rendering tile boxes from the sun camera.
///
/// Reads only the leading matrices of the tile shader's globals buffer.
pub const SHADOW_SHADER: &str = r#"
struct ShadowGlobals {
    view_proj: mat4x4<f32>,
    sun_view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: ShadowGlobals;

@vertex
fn vs_shadow(@location(0) position: vec3<f32>, @location(3) offset: vec4<f32>) -> @builtin(position) vec4<f32> {
    return globals.sun_view_proj * vec4<f32>(position + offset.xyz, 1.0);
}
"#;
