//! WGSL declarations of the contract.
//!
//! Kernels are written against this prelude: the source handed to the backend
//! is `wgsl_prelude(lighting) + kernel_body`. The text mirrors `records`,
//! `params` and `slots`; `verify` rejects any drift.

/// Storage format of the output image, as spelled in WGSL.
pub const OUTPUT_FORMAT_WGSL: &str = "rgba8unorm";

/// The same format as naga reports it after parsing.
pub const OUTPUT_STORAGE_FORMAT: naga::StorageFormat = naga::StorageFormat::Rgba8Unorm;

const RECORDS: &str = r#"
struct Shape {
    transform: mat4x4<f32>,
    inverse_transform: mat4x4<f32>,
    size: vec3<f32>,
    kind: u32,
    color: vec4<f32>,
    alteration: u32,
    reflective: u32,
}

struct Camera {
    position: vec3<f32>,
    right: vec3<f32>,
    up: vec3<f32>,
    forward: vec3<f32>,
}

struct Light {
    position: vec3<f32>,
    kind: u32,
    direction: vec3<f32>,
    range: f32,
    color: vec3<f32>,
    cos_half_spot: f32,
}

struct Params {
    resolution: vec2<u32>,
    shape_count: u32,
    flags: u32,
    tangent: f32,
    aspect: f32,
    epsilon: f32,
    delta: f32,
    far_plane: f32,
    fog_distance: f32,
    max_steps: u32,
    max_bounces: u32,
    fog_color: vec4<f32>,
}

const FLAG_LIGHT_PRESENT: u32 = 1u;
const FLAG_FOG: u32 = 2u;
const FLAG_REFLECTIONS: u32 = 4u;
"#;

const BUFFER_BINDINGS: &str = r#"
@group(0) @binding(1) var<storage, read> shapes: array<Shape>;
@group(0) @binding(2) var<storage, read> camera: Camera;
@group(0) @binding(4) var<uniform> params: Params;
"#;

const LIGHT_BINDING: &str = r#"
@group(0) @binding(3) var<storage, read> light: Light;
"#;

/// Record, parameter and binding declarations for a kernel.
///
/// The light binding is only declared for lighting kernels; the host binds
/// exactly the slots the kernel declares.
pub fn wgsl_prelude(lighting: bool) -> String {
    let mut src = String::with_capacity(RECORDS.len() + BUFFER_BINDINGS.len() + 256);
    src.push_str(RECORDS);
    src.push_str(&format!(
        "\n@group(0) @binding(0) var output: texture_storage_2d<{OUTPUT_FORMAT_WGSL}, write>;"
    ));
    src.push_str(BUFFER_BINDINGS);
    if lighting {
        src.push_str(LIGHT_BINDING);
    }
    src
}
