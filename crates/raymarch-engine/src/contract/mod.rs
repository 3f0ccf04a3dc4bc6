//! Kernel parameter contract.
//!
//! Everything the host and the kernel must agree on lives here and nowhere else:
//! - record layouts (`records`) and the uniform parameter block (`params`)
//! - slot names and binding indices (`slots`)
//! - the WGSL declarations kernels build against (`wgsl`)
//! - reflection checks that a compiled kernel honors all of the above (`verify`)
//!
//! Changing a record or a slot means changing this module; the WGSL prelude and
//! the verification follow automatically, and a kernel written against an older
//! prelude is rejected at load time instead of reading garbage on the GPU.

mod error;
mod grid;
mod params;
mod records;
mod slots;
mod verify;
mod wgsl;

pub use error::ContractError;
pub use grid::{WorkgroupGrid, WorkgroupSize};
pub use params::{KernelFlags, KernelParams, ParamKind, ParamSlot, ParamValue};
pub use records::{CameraRecord, LightRecord, ShapeRecord};
pub use slots::{BufferSlot, ImageSlot, Slot, SlotSet, BIND_GROUP};
pub use verify::{compute_entry_points, find_entry_point, verify_module};
pub use wgsl::{wgsl_prelude, OUTPUT_FORMAT_WGSL, OUTPUT_STORAGE_FORMAT};
