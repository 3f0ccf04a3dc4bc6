use glam::{Mat3, Quat, Vec3};

/// Viewing frame for the current frame.
///
/// Axes follow a left-handed convention: `+X` right, `+Y` up, `+Z` forward.
/// The basis is always derived from `rotation`, so it stays orthonormal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,

    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,

    /// Width over height. `None` follows the output resolution.
    pub aspect: Option<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y_degrees: 60.0,
            aspect: None,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, rotation: Quat, fov_y_degrees: f32) -> Self {
        Self {
            position,
            rotation,
            fov_y_degrees,
            aspect: None,
        }
    }

    /// Builds a camera at `position` facing `target`.
    ///
    /// Falls back to the identity orientation when `target` coincides with
    /// `position` or the view direction is parallel to `up`.
    pub fn looking_at(position: Vec3, target: Vec3, up: Vec3, fov_y_degrees: f32) -> Self {
        let forward = (target - position).normalize_or_zero();
        let right = up.cross(forward).normalize_or_zero();

        let rotation = if forward == Vec3::ZERO || right == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            let up = forward.cross(right);
            Quat::from_mat3(&Mat3::from_cols(right, up, forward))
        };

        Self::new(position, rotation, fov_y_degrees)
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation.normalize() * Vec3::X
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation.normalize() * Vec3::Y
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation.normalize() * Vec3::Z
    }

    /// `tan(fov / 2)`, the scale from normalized screen space to view rays.
    #[inline]
    pub fn half_fov_tangent(&self) -> f32 {
        (self.fov_y_degrees.to_radians() * 0.5).tan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn identity_camera_looks_down_positive_z() {
        let cam = Camera::default();
        assert!(cam.forward().abs_diff_eq(Vec3::Z, EPS));
        assert!(cam.right().abs_diff_eq(Vec3::X, EPS));
        assert!(cam.up().abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn basis_is_orthonormal_for_arbitrary_rotation() {
        let cam = Camera::new(
            Vec3::new(3.0, -1.0, 2.0),
            Quat::from_euler(glam::EulerRot::YXZ, 0.7, -0.3, 1.1),
            45.0,
        );
        let (r, u, f) = (cam.right(), cam.up(), cam.forward());
        assert!((r.length() - 1.0).abs() < EPS);
        assert!((u.length() - 1.0).abs() < EPS);
        assert!((f.length() - 1.0).abs() < EPS);
        assert!(r.dot(u).abs() < EPS);
        assert!(u.dot(f).abs() < EPS);
        assert!(f.dot(r).abs() < EPS);
    }

    #[test]
    fn looking_at_faces_target() {
        let cam = Camera::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y, 60.0);
        assert!(cam.forward().abs_diff_eq(Vec3::Z, EPS));

        let cam = Camera::looking_at(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::Y, 60.0);
        assert!(cam.forward().abs_diff_eq(Vec3::X, EPS));
        assert!(cam.up().abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn looking_at_degenerate_target_keeps_identity() {
        let cam = Camera::looking_at(Vec3::ONE, Vec3::ONE, Vec3::Y, 60.0);
        assert_eq!(cam.rotation, Quat::IDENTITY);
    }

    #[test]
    fn half_fov_tangent_matches_degrees() {
        let cam = Camera {
            fov_y_degrees: 90.0,
            ..Camera::default()
        };
        assert!((cam.half_fov_tangent() - 1.0).abs() < EPS);
    }
}
