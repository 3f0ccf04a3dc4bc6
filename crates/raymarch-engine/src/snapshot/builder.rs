use bytemuck::Zeroable;

use crate::contract::{CameraRecord, LightRecord, ShapeRecord};
use crate::scene::{Camera, Light, SceneQuery, Shape};

/// Records for one frame, in scene order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneSnapshot {
    pub shapes: Vec<ShapeRecord>,
    pub camera: CameraRecord,
    pub light: Option<LightRecord>,
}

impl SceneSnapshot {
    #[inline]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Light record to upload: the scene light, or zeroes when there is none.
    #[inline]
    pub fn light_or_zeroed(&self) -> LightRecord {
        self.light.unwrap_or_else(LightRecord::zeroed)
    }
}

/// Builds snapshots while keeping the shape vector's allocation between frames.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: SceneSnapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the previous snapshot with the current state of `scene`.
    ///
    /// The light is read only when `with_light` is set.
    pub fn build(&mut self, scene: &impl SceneQuery, with_light: bool) -> &SceneSnapshot {
        let light = if with_light { scene.light() } else { None };
        self.build_from(scene.shapes(), scene.camera(), light)
    }

    /// Same as [`build`](Self::build), from values the caller already queried.
    pub fn build_from(
        &mut self,
        shapes: &[Shape],
        camera: &Camera,
        light: Option<&Light>,
    ) -> &SceneSnapshot {
        let snapshot = &mut self.snapshot;

        snapshot.shapes.clear();
        snapshot.shapes.extend(shapes.iter().map(shape_record));
        snapshot.camera = camera_record(camera);
        snapshot.light = light.map(light_record);

        &self.snapshot
    }

    /// The most recently built snapshot.
    pub fn snapshot(&self) -> &SceneSnapshot {
        &self.snapshot
    }
}

pub fn shape_record(shape: &Shape) -> ShapeRecord {
    let transform = shape.local_to_world();
    ShapeRecord {
        transform: transform.to_cols_array_2d(),
        inverse_transform: transform.inverse().to_cols_array_2d(),
        size: shape.half_extents().to_array(),
        kind: shape.kind.tag(),
        color: shape.color.to_array(),
        alteration: shape.alteration.tag(),
        reflective: u32::from(shape.reflective),
        _pad: [0; 2],
    }
}

pub fn camera_record(camera: &Camera) -> CameraRecord {
    CameraRecord::new(camera.position, camera.right(), camera.up(), camera.forward())
}

pub fn light_record(light: &Light) -> LightRecord {
    LightRecord {
        position: light.position.to_array(),
        kind: light.kind.tag(),
        direction: light.direction().to_array(),
        range: light.range,
        color: light.color.to_rgb_array(),
        cos_half_spot: light.cos_half_spot(),
    }
}
