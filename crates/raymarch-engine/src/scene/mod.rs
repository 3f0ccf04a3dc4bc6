//! Scene objects read by the orchestrator.
//!
//! Responsibilities:
//! - describe shapes, the camera and the optional light as plain values
//! - define the query contract the host engine implements to expose them
//!
//! Objects are authored elsewhere; the orchestrator only reads a point-in-time
//! view each frame and never keeps references across frames.

mod camera;
mod light;
mod query;
mod shape;

pub use camera::Camera;
pub use light::{Light, LightKind};
pub use query::{Scene, SceneQuery};
pub use shape::{AlterationKind, Shape, ShapeKind};
