//! Ray-march engine crate.
//!
//! Keeps a signed-distance-field compute kernel fed with a current scene:
//! scene objects are snapshotted into fixed-layout records, GPU buffers and the
//! output image follow the output resolution, and the kernel is dispatched once
//! per frame over a grid covering the image.
//!
//! The kernel itself, camera control and presentation live outside this crate.

pub mod backend;
pub mod config;
pub mod contract;
pub mod coords;
pub mod device;
pub mod logging;
pub mod render;
pub mod scene;
pub mod snapshot;

pub use backend::{ComputeBackend, HeadlessBackend, WgpuBackend};
pub use config::{FogConfig, RenderConfig};
pub use render::{FrameOutcome, OutputImage, RayMarcher, SkipReason};
pub use scene::{Camera, Light, Scene, SceneQuery, Shape};
