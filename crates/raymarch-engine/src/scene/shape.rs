use glam::{Mat4, Quat, Vec3};

use crate::coords::ColorRgba;

/// Primitive evaluated by the kernel for a shape record.
///
/// The discriminant is the tag uploaded to the GPU; reordering variants is a
/// contract change.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ShapeKind {
    #[default]
    Sphere = 0,
    Box = 1,
    Torus = 2,
    Cylinder = 3,
}

impl ShapeKind {
    #[inline]
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

/// Modifier applied to the primitive's distance field.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum AlterationKind {
    #[default]
    None = 0,
    Round = 1,
    Onion = 2,
    Twist = 3,
}

impl AlterationKind {
    #[inline]
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

/// One implicit surface instance.
///
/// `scale` holds the authored full extents. Evaluation works in half-extents,
/// so the snapshot halves it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Shape {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub kind: ShapeKind,
    pub alteration: AlterationKind,
    pub color: ColorRgba,
    pub reflective: bool,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            kind: ShapeKind::default(),
            alteration: AlterationKind::default(),
            color: ColorRgba::white(),
            reflective: false,
        }
    }
}

impl Shape {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_alteration(mut self, alteration: AlterationKind) -> Self {
        self.alteration = alteration;
        self
    }

    pub fn with_color(mut self, color: ColorRgba) -> Self {
        self.color = color;
        self
    }

    pub fn with_reflective(mut self, reflective: bool) -> Self {
        self.reflective = reflective;
        self
    }

    /// `translate(position) * rotate(rotation)`. Scale is not part of the
    /// transform; the kernel applies the half-extents inside the distance function.
    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_quat(self.rotation.normalize())
    }

    /// Half of the authored extents, never negative.
    pub fn half_extents(&self) -> Vec3 {
        (self.scale * 0.5).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stable() {
        assert_eq!(ShapeKind::Sphere.tag(), 0);
        assert_eq!(ShapeKind::Torus.tag(), 2);
        assert_eq!(AlterationKind::None.tag(), 0);
        assert_eq!(AlterationKind::Twist.tag(), 3);
    }

    #[test]
    fn half_extents_are_non_negative() {
        let shape = Shape::new(ShapeKind::Box).with_scale(Vec3::new(-2.0, 4.0, 0.0));
        assert_eq!(shape.half_extents(), Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn local_to_world_translates_local_origin() {
        let shape = Shape::new(ShapeKind::Sphere)
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Quat::from_rotation_y(1.0));
        let p = shape.local_to_world().transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }
}
