use super::{Camera, Light, Shape};

/// Point-in-time view of the scene, implemented by the host.
///
/// A frame calls each method at most once and treats the results as one
/// consistent snapshot. `light` is only called when lighting is enabled. The camera is not optional: rendering without one is a caller bug,
/// and the type makes it unrepresentable.
pub trait SceneQuery {
    /// Live shapes, in the order the kernel will index them.
    fn shapes(&self) -> &[Shape];

    /// The live camera.
    fn camera(&self) -> &Camera;

    /// The active light, if any.
    fn light(&self) -> Option<&Light> {
        None
    }
}

/// Owned scene, for hosts that do not keep their own object storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub shapes: Vec<Shape>,
    pub camera: Camera,
    pub light: Option<Light>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            shapes: Vec::new(),
            camera,
            light: None,
        }
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }
}

impl SceneQuery for Scene {
    fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }
}
