//! Render shader generation.
//!
//! The vertex shader is where the state function runs on the GPU: each
//! instance reads only its `(emission_time, seed)` pair plus the shared
//! uniforms, normalizes its age with a floor-based modulo and evaluates the
//! chosen [`Motion`].

use bytemuck::{Pod, Zeroable};

use crate::shape::Motion;

/// Uniform block shared by every instance. Layout matches `Uniforms` in
/// [`render_shader`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub(crate) struct Uniforms {
    pub view_proj: [[f32; 4]; 4],
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    pub origin: [f32; 4],
    pub time: f32,
    pub life_duration: f32,
    pub particle_size: f32,
    pub fade_out: u32,
    pub shrink_out: u32,
    pub _padding: [u32; 3],
}

const UNIFORMS_WGSL: &str = r#"struct Uniforms {
    view_proj: mat4x4<f32>,
    start_color: vec4<f32>,
    end_color: vec4<f32>,
    origin: vec4<f32>,
    time: f32,
    life_duration: f32,
    particle_size: f32,
    fade_out: u32,
    shrink_out: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;
"#;

/// Generate the instanced quad shader for `motion`.
pub fn render_shader(motion: &Motion) -> String {
    let motion_code = motion.to_wgsl();

    format!(
        r#"{UNIFORMS_WGSL}
struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) alpha: f32,
}};

// Fraction of a lifetime since emission, wrapping for negative ages.
fn normalized_age(emission_time: f32) -> f32 {{
    let x = (uniforms.time - emission_time) / uniforms.life_duration;
    return min(x - floor(x), 0.99999994);
}}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) instance_index: u32,
    @location(0) emission_time: f32,
    @location(1) seed: f32,
) -> VertexOutput {{
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let quad_pos = quad_vertices[vertex_index];

    let t = normalized_age(emission_time);
    let slot = f32(instance_index);

{motion_code}

    var alpha = 1.0;
    if uniforms.fade_out != 0u {{
        alpha = 1.0 - t;
    }}
    var scale = uniforms.particle_size;
    if uniforms.shrink_out != 0u {{
        scale = scale * (1.0 - t);
    }}

    let world_pos = vec4<f32>(uniforms.origin.xyz + offset, 1.0);
    var clip_pos = uniforms.view_proj * world_pos;
    clip_pos.x += quad_pos.x * scale * clip_pos.w;
    clip_pos.y += quad_pos.y * scale * clip_pos.w;

    var out: VertexOutput;
    out.clip_position = clip_pos;
    out.color = mix(uniforms.start_color.xyz, uniforms.end_color.xyz, t);
    out.uv = quad_pos;
    out.alpha = alpha;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let dist = length(in.uv);
    if dist > 1.0 {{
        discard;
    }}
    let edge = 1.0 - smoothstep(0.5, 1.0, dist);
    return vec4<f32>(in.color, edge * in.alpha);
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(code: &str) {
        let module = match naga::front::wgsl::parse_str(code) {
            Ok(module) => module,
            Err(e) => panic!("WGSL parse error:\n{}\n\n{}", e.emit_to_string(code), code),
        };
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        if let Err(e) = validator.validate(&module) {
            panic!("WGSL validation error: {:?}\n\n{}", e, code);
        }
    }

    #[test]
    fn test_uniforms_size() {
        // Uniform buffers need 16-byte aligned sizes.
        assert_eq!(std::mem::size_of::<Uniforms>(), 144);
        assert_eq!(std::mem::size_of::<Uniforms>() % 16, 0);
    }

    #[test]
    fn test_fall_shader_validates() {
        validate(&render_shader(&Motion::Fall { distance: 2.0, width: 1.5 }));
    }

    #[test]
    fn test_radial_shader_validates() {
        validate(&render_shader(&Motion::Radial { radius: 1.0 }));
    }

    #[test]
    fn test_fountain_shader_validates() {
        validate(&render_shader(&Motion::Fountain { height: 1.2, spread: 0.6 }));
    }

    #[test]
    fn test_spiral_shader_validates() {
        validate(&render_shader(&Motion::Spiral { radius: 0.4, turns: 2.0, rise: 1.0 }));
    }

    #[test]
    fn test_negative_parameters_validate() {
        validate(&render_shader(&Motion::Fall { distance: -2.0, width: -1.0 }));
        validate(&render_shader(&Motion::Fountain { height: -1.0, spread: -0.5 }));
    }
}
