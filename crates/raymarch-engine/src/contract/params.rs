//! The uniform parameter block and its named scalar slots.

use std::mem::{offset_of, size_of};
use std::ops::BitOr;

use bytemuck::{Pod, Zeroable};

use super::ContractError;

/// Feature bits in `KernelParams::flags`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct KernelFlags(u32);

impl KernelFlags {
    /// The light buffer holds a valid record this frame.
    pub const LIGHT_PRESENT: Self = Self(1 << 0);
    /// Blend toward `fog_color` with distance.
    pub const FOG: Self = Self(1 << 1);
    /// Follow reflective hits up to `max_bounces`.
    pub const REFLECTIONS: Self = Self(1 << 2);

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for KernelFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Uniform parameter block (64 bytes).
///
///  offset  0  resolution    vec2<u32>
///  offset  8  shape_count   u32
///  offset 12  flags         u32
///  offset 16  tangent       f32   tan(fov / 2)
///  offset 20  aspect        f32
///  offset 24  epsilon       f32
///  offset 28  delta         f32
///  offset 32  far_plane     f32
///  offset 36  fog_distance  f32
///  offset 40  max_steps     u32
///  offset 44  max_bounces   u32
///  offset 48  fog_color     vec4<f32>
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    pub resolution: [u32; 2],
    pub shape_count: u32,
    pub flags: u32,
    pub tangent: f32,
    pub aspect: f32,
    pub epsilon: f32,
    pub delta: f32,
    pub far_plane: f32,
    pub fog_distance: f32,
    pub max_steps: u32,
    pub max_bounces: u32,
    pub fog_color: [f32; 4],
}

const _: () = assert!(size_of::<KernelParams>() == 64);

impl KernelParams {
    pub const WGSL_NAME: &'static str = "Params";

    #[inline]
    pub fn flags(&self) -> KernelFlags {
        KernelFlags::from_bits(self.flags)
    }

    /// Writes one named scalar/vector. The value's kind must match the slot.
    pub fn set(&mut self, slot: ParamSlot, value: ParamValue) -> Result<(), ContractError> {
        use ParamSlot as S;
        use ParamValue as V;

        match (slot, value) {
            (S::Resolution, V::UVec2(v)) => self.resolution = v,
            (S::ShapeCount, V::U32(v)) => self.shape_count = v,
            (S::Flags, V::U32(v)) => self.flags = v,
            (S::Tangent, V::F32(v)) => self.tangent = v,
            (S::Aspect, V::F32(v)) => self.aspect = v,
            (S::Epsilon, V::F32(v)) => self.epsilon = v,
            (S::Delta, V::F32(v)) => self.delta = v,
            (S::FarPlane, V::F32(v)) => self.far_plane = v,
            (S::FogDistance, V::F32(v)) => self.fog_distance = v,
            (S::MaxSteps, V::U32(v)) => self.max_steps = v,
            (S::MaxBounces, V::U32(v)) => self.max_bounces = v,
            (S::FogColor, V::Vec4(v)) => self.fog_color = v,
            (slot, value) => {
                return Err(ContractError::ParamKind {
                    slot: slot.name(),
                    expected: slot.kind(),
                    found: value.kind(),
                });
            }
        }
        Ok(())
    }

    /// Reads one named scalar/vector.
    pub fn get(&self, slot: ParamSlot) -> ParamValue {
        use ParamSlot as S;
        use ParamValue as V;

        match slot {
            S::Resolution => V::UVec2(self.resolution),
            S::ShapeCount => V::U32(self.shape_count),
            S::Flags => V::U32(self.flags),
            S::Tangent => V::F32(self.tangent),
            S::Aspect => V::F32(self.aspect),
            S::Epsilon => V::F32(self.epsilon),
            S::Delta => V::F32(self.delta),
            S::FarPlane => V::F32(self.far_plane),
            S::FogDistance => V::F32(self.fog_distance),
            S::MaxSteps => V::U32(self.max_steps),
            S::MaxBounces => V::U32(self.max_bounces),
            S::FogColor => V::Vec4(self.fog_color),
        }
    }
}

/// Shape of a parameter value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ParamKind {
    U32,
    F32,
    UVec2,
    Vec4,
}

/// A typed parameter value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParamValue {
    U32(u32),
    F32(f32),
    UVec2([u32; 2]),
    Vec4([f32; 4]),
}

impl ParamValue {
    pub const fn kind(self) -> ParamKind {
        match self {
            Self::U32(_) => ParamKind::U32,
            Self::F32(_) => ParamKind::F32,
            Self::UVec2(_) => ParamKind::UVec2,
            Self::Vec4(_) => ParamKind::Vec4,
        }
    }
}

/// Named scalar/vector members of the parameter block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ParamSlot {
    Resolution,
    ShapeCount,
    Flags,
    Tangent,
    Aspect,
    Epsilon,
    Delta,
    FarPlane,
    FogDistance,
    MaxSteps,
    MaxBounces,
    FogColor,
}

impl ParamSlot {
    pub const ALL: [ParamSlot; 12] = [
        Self::Resolution,
        Self::ShapeCount,
        Self::Flags,
        Self::Tangent,
        Self::Aspect,
        Self::Epsilon,
        Self::Delta,
        Self::FarPlane,
        Self::FogDistance,
        Self::MaxSteps,
        Self::MaxBounces,
        Self::FogColor,
    ];

    /// Member name inside the kernel's `Params` struct.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::ShapeCount => "shape_count",
            Self::Flags => "flags",
            Self::Tangent => "tangent",
            Self::Aspect => "aspect",
            Self::Epsilon => "epsilon",
            Self::Delta => "delta",
            Self::FarPlane => "far_plane",
            Self::FogDistance => "fog_distance",
            Self::MaxSteps => "max_steps",
            Self::MaxBounces => "max_bounces",
            Self::FogColor => "fog_color",
        }
    }

    pub const fn kind(self) -> ParamKind {
        match self {
            Self::Resolution => ParamKind::UVec2,
            Self::ShapeCount | Self::Flags | Self::MaxSteps | Self::MaxBounces => ParamKind::U32,
            Self::FogColor => ParamKind::Vec4,
            _ => ParamKind::F32,
        }
    }

    /// Byte offset inside `KernelParams`.
    pub const fn offset(self) -> usize {
        match self {
            Self::Resolution => offset_of!(KernelParams, resolution),
            Self::ShapeCount => offset_of!(KernelParams, shape_count),
            Self::Flags => offset_of!(KernelParams, flags),
            Self::Tangent => offset_of!(KernelParams, tangent),
            Self::Aspect => offset_of!(KernelParams, aspect),
            Self::Epsilon => offset_of!(KernelParams, epsilon),
            Self::Delta => offset_of!(KernelParams, delta),
            Self::FarPlane => offset_of!(KernelParams, far_plane),
            Self::FogDistance => offset_of!(KernelParams, fog_distance),
            Self::MaxSteps => offset_of!(KernelParams, max_steps),
            Self::MaxBounces => offset_of!(KernelParams, max_bounces),
            Self::FogColor => offset_of!(KernelParams, fog_color),
        }
    }
}
