//! GPU device management.
//!
//! Creates the wgpu Instance/Adapter/Device/Queue used by `WgpuBackend`.
//! No surface is created; the engine renders into an offscreen storage image.

mod gpu;
mod init;

pub use gpu::Gpu;
pub use init::GpuInit;
