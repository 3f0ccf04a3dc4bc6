use glam::{Quat, Vec3};

use crate::coords::ColorRgba;

/// Light type tag uploaded with the light record.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum LightKind {
    #[default]
    Directional = 0,
    Point = 1,
    Spot = 2,
}

impl LightKind {
    #[inline]
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

/// The single scene light of the lighting variant.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub rotation: Quat,
    pub color: ColorRgba,
    pub range: f32,

    /// Full cone angle in degrees. Only meaningful for `LightKind::Spot`.
    pub spot_angle_degrees: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::default(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            color: ColorRgba::white(),
            range: 10.0,
            spot_angle_degrees: 30.0,
        }
    }
}

impl Light {
    pub fn directional(rotation: Quat) -> Self {
        Self {
            kind: LightKind::Directional,
            rotation,
            ..Self::default()
        }
    }

    pub fn point(position: Vec3, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            range,
            ..Self::default()
        }
    }

    pub fn spot(position: Vec3, rotation: Quat, range: f32, spot_angle_degrees: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            position,
            rotation,
            range,
            spot_angle_degrees,
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: ColorRgba) -> Self {
        self.color = color;
        self
    }

    /// Forward axis of the light.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.rotation.normalize() * Vec3::Z
    }

    /// `cos(angle / 2)` with the angle in degrees, compared against a dot
    /// product in the kernel's cone test.
    #[inline]
    pub fn cos_half_spot(&self) -> f32 {
        (self.spot_angle_degrees * 0.5).to_radians().cos()
    }
}
