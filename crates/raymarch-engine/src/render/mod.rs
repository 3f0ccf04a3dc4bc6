//! Scene-to-GPU orchestration.
//!
//! `RayMarcher` drives one kernel through a [`ComputeBackend`](crate::backend::ComputeBackend):
//! it keeps the Buffer Set sized to the output (`ResourceManager`), snapshots
//! the scene, uploads records and parameters, and dispatches once per frame.
//!
//! Convention:
//! - the output resolution is queried from the caller every frame
//! - failures skip the frame and are reported through `FrameOutcome`

mod error;
mod outcome;
mod raymarcher;
mod resources;

pub use error::{RenderError, RenderErrorKind};
pub use outcome::{FrameOutcome, SkipReason};
pub use raymarcher::{kernel_params, OutputImage, RayMarcher};
pub use resources::{BufferSet, ResourceManager};
