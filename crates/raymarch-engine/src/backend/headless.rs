//! Device-free backend.
//!
//! Simulates handles and limits closely enough for the orchestrator to run
//! unchanged, and records everything that would have reached the GPU.

use std::collections::HashMap;
use std::mem::size_of;

use crate::contract::{
    BufferSlot, CameraRecord, ImageSlot, KernelParams, LightRecord, ParamSlot, ParamValue,
    ShapeRecord, Slot, SlotSet, WorkgroupGrid, WorkgroupSize,
};
use crate::coords::Resolution;

use super::{
    BackendError, BackendResult, BufferDescriptor, BufferHandle, ComputeBackend, ImageDescriptor,
    ImageHandle, KernelHandle, KernelInfo,
};

/// Simulated device limits.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HeadlessLimits {
    pub max_image_dimension: u32,
    pub max_buffer_size: u64,
}

impl Default for HeadlessLimits {
    /// Same values as `wgpu::Limits::default()`.
    fn default() -> Self {
        Self {
            max_image_dimension: 8192,
            max_buffer_size: 128 << 20,
        }
    }
}

/// Running totals of every allocation and release.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct AllocationLedger {
    pub buffers_created: u64,
    pub buffers_released: u64,
    pub images_created: u64,
    pub images_released: u64,
    /// Releases of handles that were not live (double release, foreign handle).
    pub invalid_releases: u64,
}

impl AllocationLedger {
    #[inline]
    pub fn live_buffers(&self) -> u64 {
        self.buffers_created - self.buffers_released
    }

    #[inline]
    pub fn live_images(&self) -> u64 {
        self.images_created - self.images_released
    }

    /// Everything created was released exactly once.
    pub fn is_balanced(&self) -> bool {
        self.live_buffers() == 0 && self.live_images() == 0 && self.invalid_releases == 0
    }
}

/// Snapshot of one dispatch as the kernel would have seen it.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub kernel: KernelHandle,
    pub grid: WorkgroupGrid,
    pub params: KernelParams,
    pub image: ImageHandle,
    pub resolution: Resolution,
    /// The first `params.shape_count` records of the shape buffer.
    pub shapes: Vec<ShapeRecord>,
    pub camera: CameraRecord,
    /// Present when the kernel declares the light slot.
    pub light: Option<LightRecord>,
}

struct Kernel {
    info: KernelInfo,
    image: Option<ImageHandle>,
    buffers: [Option<BufferHandle>; BufferSlot::COUNT],
}

struct Buffer {
    label: &'static str,
    data: Vec<u8>,
}

/// Backend for tests and tooling without a device.
///
/// Every successful dispatch appends a [`DispatchRecord`], including a copy of
/// the uploaded shapes. The history is kept until [`take_dispatches`] drains it.
///
/// [`take_dispatches`]: Self::take_dispatches
#[derive(Default)]
pub struct HeadlessBackend {
    limits: HeadlessLimits,
    kernels: Vec<Kernel>,
    images: HashMap<u64, Resolution>,
    buffers: HashMap<u64, Buffer>,
    next_id: u64,
    params: KernelParams,
    ledger: AllocationLedger,
    dispatches: Vec<DispatchRecord>,
    pending_failures: u32,
    pending_dispatch_failures: u32,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: HeadlessLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Registers a kernel entry point.
    pub fn with_kernel(mut self, name: &str, workgroup_size: WorkgroupSize, slots: SlotSet) -> Self {
        let handle = KernelHandle(self.kernels.len() as u32);
        self.kernels.push(Kernel {
            info: KernelInfo {
                handle,
                name: name.to_string(),
                workgroup_size,
                slots,
            },
            image: None,
            buffers: [None; BufferSlot::COUNT],
        });
        self
    }

    /// Registers a `RayMarch` kernel declaring exactly the slots `lighting` requires.
    pub fn with_raymarch_kernel(self, lighting: bool) -> Self {
        self.with_kernel("RayMarch", WorkgroupSize::RAYMARCH, SlotSet::required(lighting))
    }

    /// Makes the next `count` image/buffer creations fail with `OutOfMemory`.
    pub fn fail_next_allocations(&mut self, count: u32) {
        self.pending_failures = count;
    }

    /// Makes the next `count` dispatches fail with `OutOfMemory`.
    pub fn fail_next_dispatches(&mut self, count: u32) {
        self.pending_dispatch_failures = count;
    }

    pub fn limits(&self) -> HeadlessLimits {
        self.limits
    }

    pub fn ledger(&self) -> AllocationLedger {
        self.ledger
    }

    pub fn dispatches(&self) -> &[DispatchRecord] {
        &self.dispatches
    }

    pub fn last_dispatch(&self) -> Option<&DispatchRecord> {
        self.dispatches.last()
    }

    /// Drains the dispatch history.
    pub fn take_dispatches(&mut self) -> Vec<DispatchRecord> {
        std::mem::take(&mut self.dispatches)
    }

    /// Current parameter block.
    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    pub fn buffer_size(&self, buffer: BufferHandle) -> Option<u64> {
        self.buffers.get(&buffer.0).map(|b| b.data.len() as u64)
    }

    pub fn image_resolution(&self, image: ImageHandle) -> Option<Resolution> {
        self.images.get(&image.0).copied()
    }

    fn take_injected_failure(&mut self) -> BackendResult<()> {
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(BackendError::OutOfMemory);
        }
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn kernel_mut(&mut self, kernel: KernelHandle) -> BackendResult<&mut Kernel> {
        self.kernels
            .get_mut(kernel.0 as usize)
            .ok_or(BackendError::UnknownKernel)
    }

    fn bound_buffer(&self, kernel: &Kernel, slot: BufferSlot) -> BackendResult<&Buffer> {
        kernel.buffers[slot.index()]
            .and_then(|handle| self.buffers.get(&handle.0))
            .ok_or(BackendError::UnboundSlot(Slot::Buffer(slot).name()))
    }

    fn record_dispatch(
        &self,
        kernel: KernelHandle,
        grid: WorkgroupGrid,
    ) -> BackendResult<DispatchRecord> {
        let k = self
            .kernels
            .get(kernel.0 as usize)
            .ok_or(BackendError::UnknownKernel)?;

        let image = k
            .image
            .filter(|image| self.images.contains_key(&image.0))
            .ok_or(BackendError::UnboundSlot(Slot::Image(ImageSlot::Output).name()))?;
        let resolution = self.images[&image.0];

        let shapes_buf = self.bound_buffer(k, BufferSlot::Shapes)?;
        let needed = self.params.shape_count as usize * size_of::<ShapeRecord>();
        if shapes_buf.data.len() < needed {
            return Err(BackendError::BufferTooSmall {
                slot: shapes_buf.label,
                size: shapes_buf.data.len() as u64,
                needed: needed as u64,
            });
        }
        let shapes = shapes_buf.data[..needed]
            .chunks_exact(size_of::<ShapeRecord>())
            .map(bytemuck::pod_read_unaligned)
            .collect();

        let camera = read_record::<CameraRecord>(self.bound_buffer(k, BufferSlot::Camera)?)?;

        let light = if k.info.slots.contains(BufferSlot::Light) {
            Some(read_record::<LightRecord>(self.bound_buffer(k, BufferSlot::Light)?)?)
        } else {
            None
        };

        Ok(DispatchRecord {
            kernel,
            grid,
            params: self.params,
            image,
            resolution,
            shapes,
            camera,
            light,
        })
    }
}

fn read_record<T: bytemuck::Pod>(buffer: &Buffer) -> BackendResult<T> {
    let len = size_of::<T>();
    if buffer.data.len() < len {
        return Err(BackendError::BufferTooSmall {
            slot: buffer.label,
            size: buffer.data.len() as u64,
            needed: len as u64,
        });
    }
    Ok(bytemuck::pod_read_unaligned(&buffer.data[..len]))
}

impl ComputeBackend for HeadlessBackend {
    fn find_kernel(&mut self, name: &str) -> Option<KernelInfo> {
        self.kernels
            .iter()
            .find(|k| k.info.name == name)
            .map(|k| k.info.clone())
    }

    fn create_image(&mut self, desc: &ImageDescriptor) -> BackendResult<ImageHandle> {
        let Resolution { width, height } = desc.resolution;
        if desc.resolution.is_empty() {
            return Err(BackendError::ZeroSized("image"));
        }
        let max = self.limits.max_image_dimension;
        if width > max || height > max {
            return Err(BackendError::LimitExceeded {
                what: "image dimension",
                requested: u64::from(width.max(height)),
                limit: u64::from(max),
            });
        }
        self.take_injected_failure()?;

        let id = self.next_id();
        self.images.insert(id, desc.resolution);
        self.ledger.images_created += 1;
        log::trace!("headless: created image {} {}x{}", desc.label, width, height);
        Ok(ImageHandle(id))
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        let size = desc.size();
        if size == 0 {
            return Err(BackendError::ZeroSized("buffer"));
        }
        if size > self.limits.max_buffer_size {
            return Err(BackendError::LimitExceeded {
                what: "buffer size",
                requested: size,
                limit: self.limits.max_buffer_size,
            });
        }
        self.take_injected_failure()?;

        let id = self.next_id();
        self.buffers.insert(
            id,
            Buffer {
                label: desc.label,
                data: vec![0; size as usize],
            },
        );
        self.ledger.buffers_created += 1;
        log::trace!("headless: created buffer {} ({} bytes)", desc.label, size);
        Ok(BufferHandle(id))
    }

    fn release_image(&mut self, image: ImageHandle) {
        if self.images.remove(&image.0).is_some() {
            self.ledger.images_released += 1;
        } else {
            self.ledger.invalid_releases += 1;
            log::error!("headless: release of unknown image {:?}", image);
        }
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer.0).is_some() {
            self.ledger.buffers_released += 1;
        } else {
            self.ledger.invalid_releases += 1;
            log::error!("headless: release of unknown buffer {:?}", buffer);
        }
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()> {
        let buf = self
            .buffers
            .get_mut(&buffer.0)
            .ok_or(BackendError::UnknownBuffer)?;
        if data.len() > buf.data.len() {
            return Err(BackendError::WriteOutOfBounds {
                len: data.len() as u64,
                size: buf.data.len() as u64,
            });
        }
        buf.data[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn bind_image(
        &mut self,
        kernel: KernelHandle,
        slot: ImageSlot,
        image: ImageHandle,
    ) -> BackendResult<()> {
        if !self.images.contains_key(&image.0) {
            return Err(BackendError::UnknownImage);
        }
        let k = self.kernel_mut(kernel)?;
        if !k.info.slots.contains(slot) {
            return Err(BackendError::UndeclaredSlot(Slot::Image(slot).name()));
        }
        k.image = Some(image);
        Ok(())
    }

    fn bind_buffer(
        &mut self,
        kernel: KernelHandle,
        slot: BufferSlot,
        buffer: BufferHandle,
    ) -> BackendResult<()> {
        if !self.buffers.contains_key(&buffer.0) {
            return Err(BackendError::UnknownBuffer);
        }
        let k = self.kernel_mut(kernel)?;
        if !k.info.slots.contains(slot) {
            return Err(BackendError::UndeclaredSlot(Slot::Buffer(slot).name()));
        }
        k.buffers[slot.index()] = Some(buffer);
        Ok(())
    }

    fn set_param(&mut self, slot: ParamSlot, value: ParamValue) -> BackendResult<()> {
        self.params.set(slot, value)?;
        Ok(())
    }

    fn dispatch(&mut self, kernel: KernelHandle, grid: WorkgroupGrid) -> BackendResult<()> {
        let record = self.record_dispatch(kernel, grid)?;
        if self.pending_dispatch_failures > 0 {
            self.pending_dispatch_failures -= 1;
            return Err(BackendError::OutOfMemory);
        }
        log::trace!("headless: dispatch {:?} over {:?}", kernel, grid);
        self.dispatches.push(record);
        Ok(())
    }
}
