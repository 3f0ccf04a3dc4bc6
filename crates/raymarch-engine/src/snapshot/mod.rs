//! Scene snapshot: scene objects converted to GPU records.
//!
//! The builder has no side effects and never touches GPU resources; it only
//! reads the scene and fills reusable record vectors.

mod builder;

pub use builder::{camera_record, light_record, shape_record, SceneSnapshot, SnapshotBuilder};
