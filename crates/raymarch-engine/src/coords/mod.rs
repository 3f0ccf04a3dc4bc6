//! Value types shared by the snapshot builder, the resource manager and the
//! kernel parameter block.
//!
//! Conventions:
//! - resolutions are physical pixels of the output image
//! - colors are linear RGBA, straight alpha

mod color;
mod resolution;

pub use color::ColorRgba;
pub use resolution::Resolution;
