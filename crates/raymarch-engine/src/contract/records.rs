//! Fixed-layout GPU records.
//!
//! Fields use plain arrays rather than `glam` types so the layout does not
//! depend on SIMD alignment of the host platform. Sizes are pinned below; the
//! per-member offsets are checked against the kernel by `verify`.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// One shape, indexed by position in the shape array (176 bytes, std430).
///
///  offset   0  transform          mat4x4<f32>  local -> world
///  offset  64  inverse_transform  mat4x4<f32>  world -> local
///  offset 128  size               vec3<f32>    half-extents
///  offset 140  kind               u32          `ShapeKind` tag
///  offset 144  color              vec4<f32>
///  offset 160  alteration         u32          `AlterationKind` tag
///  offset 164  reflective         u32          0 or 1
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ShapeRecord {
    pub transform: [[f32; 4]; 4],
    pub inverse_transform: [[f32; 4]; 4],
    pub size: [f32; 3],
    pub kind: u32,
    pub color: [f32; 4],
    pub alteration: u32,
    pub reflective: u32,
    pub _pad: [u32; 2],
}

impl ShapeRecord {
    pub const WGSL_NAME: &'static str = "Shape";

    pub(crate) const MEMBERS: &'static [(&'static str, usize)] = &[
        ("transform", offset_of!(ShapeRecord, transform)),
        ("inverse_transform", offset_of!(ShapeRecord, inverse_transform)),
        ("size", offset_of!(ShapeRecord, size)),
        ("kind", offset_of!(ShapeRecord, kind)),
        ("color", offset_of!(ShapeRecord, color)),
        ("alteration", offset_of!(ShapeRecord, alteration)),
        ("reflective", offset_of!(ShapeRecord, reflective)),
    ];

    #[inline]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.transform)
    }

    #[inline]
    pub fn inverse_transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.inverse_transform)
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        Vec3::from_array(self.size)
    }

    #[inline]
    pub fn is_reflective(&self) -> bool {
        self.reflective != 0
    }
}

/// Camera frame (64 bytes). Every vector is padded to 16 bytes, matching
/// `vec3<f32>` alignment.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct CameraRecord {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub right: [f32; 3],
    pub _pad1: f32,
    pub up: [f32; 3],
    pub _pad2: f32,
    pub forward: [f32; 3],
    pub _pad3: f32,
}

impl CameraRecord {
    pub const WGSL_NAME: &'static str = "Camera";

    pub(crate) const MEMBERS: &'static [(&'static str, usize)] = &[
        ("position", offset_of!(CameraRecord, position)),
        ("right", offset_of!(CameraRecord, right)),
        ("up", offset_of!(CameraRecord, up)),
        ("forward", offset_of!(CameraRecord, forward)),
    ];

    pub fn new(position: Vec3, right: Vec3, up: Vec3, forward: Vec3) -> Self {
        Self {
            position: position.to_array(),
            right: right.to_array(),
            up: up.to_array(),
            forward: forward.to_array(),
            ..Self::zeroed()
        }
    }
}

/// Scene light (48 bytes). Scalars fill the fourth lane of each vector.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    pub position: [f32; 3],
    pub kind: u32,
    pub direction: [f32; 3],
    pub range: f32,
    pub color: [f32; 3],
    pub cos_half_spot: f32,
}

impl LightRecord {
    pub const WGSL_NAME: &'static str = "Light";

    pub(crate) const MEMBERS: &'static [(&'static str, usize)] = &[
        ("position", offset_of!(LightRecord, position)),
        ("kind", offset_of!(LightRecord, kind)),
        ("direction", offset_of!(LightRecord, direction)),
        ("range", offset_of!(LightRecord, range)),
        ("color", offset_of!(LightRecord, color)),
        ("cos_half_spot", offset_of!(LightRecord, cos_half_spot)),
    ];
}

const _: () = assert!(size_of::<ShapeRecord>() == 176);
const _: () = assert!(size_of::<CameraRecord>() == 64);
const _: () = assert!(size_of::<LightRecord>() == 48);
