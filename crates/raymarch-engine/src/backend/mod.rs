//! Kernel invocation backends.
//!
//! The orchestrator talks to the GPU only through [`ComputeBackend`]:
//! - kernel lookup by entry-point name
//! - image/buffer lifetime (create, write, release)
//! - binding resources and scalar parameters to contract slots
//! - enqueueing a dispatch
//!
//! `WgpuBackend` drives a real device. `HeadlessBackend` simulates one and keeps
//! an allocation ledger, which is what the tests inspect.

mod error;
mod headless;
mod types;
mod wgpu_backend;

pub use error::{BackendError, BackendResult};
pub use headless::{AllocationLedger, DispatchRecord, HeadlessBackend, HeadlessLimits};
pub use types::{BufferDescriptor, BufferHandle, ImageDescriptor, ImageHandle, KernelHandle, KernelInfo};
pub use wgpu_backend::WgpuBackend;

use crate::contract::{BufferSlot, ImageSlot, ParamSlot, ParamValue, WorkgroupGrid};

/// Kernel invocation interface consumed by the orchestrator.
///
/// Calls are issued from a single thread, once per frame. `dispatch` enqueues
/// work and returns without waiting for completion.
pub trait ComputeBackend {
    /// Looks up a compute entry point by name.
    fn find_kernel(&mut self, name: &str) -> Option<KernelInfo>;

    fn create_image(&mut self, desc: &ImageDescriptor) -> BackendResult<ImageHandle>;

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    /// Releases an image. Releasing an unknown handle is logged and ignored.
    fn release_image(&mut self, image: ImageHandle);

    /// Releases a buffer. Releasing an unknown handle is logged and ignored.
    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Uploads `data` to the start of `buffer`.
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()>;

    fn bind_image(
        &mut self,
        kernel: KernelHandle,
        slot: ImageSlot,
        image: ImageHandle,
    ) -> BackendResult<()>;

    fn bind_buffer(
        &mut self,
        kernel: KernelHandle,
        slot: BufferSlot,
        buffer: BufferHandle,
    ) -> BackendResult<()>;

    /// Sets one member of the parameter block.
    fn set_param(&mut self, slot: ParamSlot, value: ParamValue) -> BackendResult<()>;

    /// Enqueues `kernel` over `grid` workgroups.
    fn dispatch(&mut self, kernel: KernelHandle, grid: WorkgroupGrid) -> BackendResult<()>;
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for &mut B {
    fn find_kernel(&mut self, name: &str) -> Option<KernelInfo> {
        (**self).find_kernel(name)
    }

    fn create_image(&mut self, desc: &ImageDescriptor) -> BackendResult<ImageHandle> {
        (**self).create_image(desc)
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        (**self).create_buffer(desc)
    }

    fn release_image(&mut self, image: ImageHandle) {
        (**self).release_image(image)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        (**self).release_buffer(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()> {
        (**self).write_buffer(buffer, data)
    }

    fn bind_image(
        &mut self,
        kernel: KernelHandle,
        slot: ImageSlot,
        image: ImageHandle,
    ) -> BackendResult<()> {
        (**self).bind_image(kernel, slot, image)
    }

    fn bind_buffer(
        &mut self,
        kernel: KernelHandle,
        slot: BufferSlot,
        buffer: BufferHandle,
    ) -> BackendResult<()> {
        (**self).bind_buffer(kernel, slot, buffer)
    }

    fn set_param(&mut self, slot: ParamSlot, value: ParamValue) -> BackendResult<()> {
        (**self).set_param(slot, value)
    }

    fn dispatch(&mut self, kernel: KernelHandle, grid: WorkgroupGrid) -> BackendResult<()> {
        (**self).dispatch(kernel, grid)
    }
}
