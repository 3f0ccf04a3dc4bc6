use crate::contract::{SlotSet, WorkgroupSize};
use crate::coords::Resolution;

/// Handle to a kernel entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle(pub(crate) u32);

/// Handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a GPU image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub(crate) u64);

/// What a backend knows about a kernel after lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo {
    pub handle: KernelHandle,
    pub name: String,
    pub workgroup_size: WorkgroupSize,
    /// Contract slots the kernel declares.
    pub slots: SlotSet,
}

/// Structured buffer of `element_count` records of `element_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: &'static str,
    pub element_size: u64,
    pub element_count: u64,
}

impl BufferDescriptor {
    #[inline]
    pub fn size(&self) -> u64 {
        self.element_size.saturating_mul(self.element_count)
    }
}

/// Writable output image (RGBA8 unorm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub label: &'static str,
    pub resolution: Resolution,
}
