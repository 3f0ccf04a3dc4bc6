use std::collections::HashMap;
use std::mem::size_of;
use std::num::NonZeroU64;

use anyhow::{Context, Result};

use crate::contract::{
    compute_entry_points, verify_module, BufferSlot, CameraRecord, ContractError, ImageSlot, KernelParams, LightRecord,
    ParamSlot, ParamValue, ShapeRecord, Slot, SlotSet, WorkgroupGrid, BIND_GROUP,
    OUTPUT_STORAGE_FORMAT,
};
use crate::coords::Resolution;
use crate::device::Gpu;

use super::{
    BackendError, BackendResult, BufferDescriptor, BufferHandle, ComputeBackend, ImageDescriptor,
    ImageHandle, KernelHandle, KernelInfo,
};

const OUTPUT_FORMAT: wgpu::TextureFormat = match OUTPUT_STORAGE_FORMAT {
    naga::StorageFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
    _ => panic!("output storage format has no texture format mapping"),
};

struct Kernel {
    info: KernelInfo,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,

    image: Option<ImageHandle>,
    buffers: [Option<BufferHandle>; BufferSlot::COUNT],

    /// Dropped whenever a binding changes; rebuilt on the next dispatch.
    bind_group: Option<wgpu::BindGroup>,
}

impl Kernel {
    fn references_image(&self, image: ImageHandle) -> bool {
        self.image == Some(image)
    }

    fn references_buffer(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains(&Some(buffer))
    }
}

struct Image {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Compute backend over a wgpu device.
///
/// The kernel source is prefixed with `contract::wgsl_prelude` and checked with
/// naga before any pipeline is created, so a kernel that drifted from the host
/// layouts fails here instead of producing garbage on screen.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    max_image_dimension: u32,
    max_buffer_size: u64,
    max_workgroups: u32,

    kernels: Vec<Kernel>,
    images: HashMap<u64, Image>,
    buffers: HashMap<u64, wgpu::Buffer>,
    next_id: u64,

    params: KernelParams,
    params_dirty: bool,
    params_ubo: wgpu::Buffer,
}

impl WgpuBackend {
    /// Compiles every compute entry point in `source`.
    pub fn new(gpu: &Gpu, source: &str) -> Result<Self> {
        let device = gpu.device().clone();
        let queue = gpu.queue().clone();

        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| ContractError::Parse(e.emit_to_string(source)))
            .context("failed to parse kernel source")?;
        let slots = verify_module(&module).context("kernel does not match the host contract")?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("raymarch kernel module"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut kernels = Vec::new();
        for (name, workgroup_size) in compute_entry_points(&module) {
            let bind_group_layout = create_bind_group_layout(&device, slots);

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("raymarch pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(name),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(name),
                compilation_options: Default::default(),
                cache: None,
            });

            log::debug!(
                "compiled kernel {} (workgroup {:?}, slots {:?})",
                name,
                workgroup_size,
                slots
            );

            let handle = KernelHandle(kernels.len() as u32);
            kernels.push(Kernel {
                info: KernelInfo {
                    handle,
                    name: name.to_string(),
                    workgroup_size,
                    slots,
                },
                pipeline,
                bind_group_layout,
                image: None,
                buffers: [None; BufferSlot::COUNT],
                bind_group: None,
            });
        }
        anyhow::ensure!(!kernels.is_empty(), "kernel source has no compute entry point");

        let params_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("raymarch params ubo"),
            size: size_of::<KernelParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let limits = device.limits();

        Ok(Self {
            max_image_dimension: limits.max_texture_dimension_2d,
            max_buffer_size: u64::from(limits.max_storage_buffer_binding_size)
                .min(limits.max_buffer_size),
            max_workgroups: limits.max_compute_workgroups_per_dimension,
            device,
            queue,
            kernels,
            images: HashMap::new(),
            buffers: HashMap::new(),
            next_id: 0,
            params: KernelParams::default(),
            params_dirty: true,
            params_ubo,
        })
    }

    /// View of an output image, for sampling it onto the screen.
    pub fn texture_view(&self, image: ImageHandle) -> Option<&wgpu::TextureView> {
        self.images.get(&image.0).map(|i| &i.view)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
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

    fn ensure_bind_group(&mut self, index: usize) -> BackendResult<()> {
        let Self {
            device,
            kernels,
            images,
            buffers,
            params_ubo,
            ..
        } = self;
        let kernel = &mut kernels[index];
        if kernel.bind_group.is_some() {
            return Ok(());
        }

        let mut entries = Vec::with_capacity(Slot::ALL.len());
        for slot in kernel.info.slots.iter() {
            let resource = match slot {
                Slot::Image(_) => kernel
                    .image
                    .and_then(|h| images.get(&h.0))
                    .map(|i| wgpu::BindingResource::TextureView(&i.view)),
                Slot::Buffer(b) => kernel.buffers[b.index()]
                    .and_then(|h| buffers.get(&h.0))
                    .map(|buf| buf.as_entire_binding()),
                Slot::Params => Some(params_ubo.as_entire_binding()),
            }
            .ok_or(BackendError::UnboundSlot(slot.name()))?;

            entries.push(wgpu::BindGroupEntry {
                binding: slot.binding(),
                resource,
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("raymarch bind group"),
            layout: &kernel.bind_group_layout,
            entries: &entries,
        });
        kernel.bind_group = Some(bind_group);
        Ok(())
    }

    fn check_shape_capacity(&self, kernel: &Kernel) -> BackendResult<()> {
        let needed = u64::from(self.params.shape_count) * size_of::<ShapeRecord>() as u64;
        let size = kernel.buffers[BufferSlot::Shapes.index()]
            .and_then(|h| self.buffers.get(&h.0))
            .map(|b| b.size())
            .ok_or(BackendError::UnboundSlot(Slot::Buffer(BufferSlot::Shapes).name()))?;
        if size < needed {
            return Err(BackendError::BufferTooSmall {
                slot: Slot::Buffer(BufferSlot::Shapes).name(),
                size,
                needed,
            });
        }
        Ok(())
    }
}

fn record_size(slot: BufferSlot) -> u64 {
    match slot {
        BufferSlot::Shapes => size_of::<ShapeRecord>() as u64,
        BufferSlot::Camera => size_of::<CameraRecord>() as u64,
        BufferSlot::Light => size_of::<LightRecord>() as u64,
    }
}

fn create_bind_group_layout(device: &wgpu::Device, slots: SlotSet) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = slots
        .iter()
        .map(|slot| {
            let ty = match slot {
                Slot::Image(_) => wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: OUTPUT_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                Slot::Buffer(b) => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(record_size(b)),
                },
                Slot::Params => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(size_of::<KernelParams>() as u64),
                },
            };
            wgpu::BindGroupLayoutEntry {
                binding: slot.binding(),
                visibility: wgpu::ShaderStages::COMPUTE,
                ty,
                count: None,
            }
        })
        .collect();

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("raymarch bgl"),
        entries: &entries,
    })
}

impl ComputeBackend for WgpuBackend {
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
        if width > self.max_image_dimension || height > self.max_image_dimension {
            return Err(BackendError::LimitExceeded {
                what: "image dimension",
                requested: u64::from(width.max(height)),
                limit: u64::from(self.max_image_dimension),
            });
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = self.next_id();
        self.images.insert(
            id,
            Image {
                _texture: texture,
                view,
            },
        );
        Ok(ImageHandle(id))
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        let size = desc.size();
        if size == 0 {
            return Err(BackendError::ZeroSized("buffer"));
        }
        if size > self.max_buffer_size {
            return Err(BackendError::LimitExceeded {
                what: "buffer size",
                requested: size,
                limit: self.max_buffer_size,
            });
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let id = self.next_id();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn release_image(&mut self, image: ImageHandle) {
        if self.images.remove(&image.0).is_none() {
            log::error!("release of unknown image {:?}", image);
            return;
        }
        for kernel in self.kernels.iter_mut().filter(|k| k.references_image(image)) {
            kernel.image = None;
            kernel.bind_group = None;
        }
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer.0).is_none() {
            log::error!("release of unknown buffer {:?}", buffer);
            return;
        }
        for kernel in self.kernels.iter_mut().filter(|k| k.references_buffer(buffer)) {
            for bound in kernel.buffers.iter_mut().filter(|b| **b == Some(buffer)) {
                *bound = None;
            }
            kernel.bind_group = None;
        }
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()> {
        let buf = self
            .buffers
            .get(&buffer.0)
            .ok_or(BackendError::UnknownBuffer)?;
        if data.len() as u64 > buf.size() {
            return Err(BackendError::WriteOutOfBounds {
                len: data.len() as u64,
                size: buf.size(),
            });
        }
        if !data.is_empty() {
            self.queue.write_buffer(buf, 0, data);
        }
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
        if k.image != Some(image) {
            k.image = Some(image);
            k.bind_group = None;
        }
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
        let bound = &mut k.buffers[slot.index()];
        if *bound != Some(buffer) {
            *bound = Some(buffer);
            k.bind_group = None;
        }
        Ok(())
    }

    fn set_param(&mut self, slot: ParamSlot, value: ParamValue) -> BackendResult<()> {
        self.params.set(slot, value)?;
        self.params_dirty = true;
        Ok(())
    }

    fn dispatch(&mut self, kernel: KernelHandle, grid: WorkgroupGrid) -> BackendResult<()> {
        let index = kernel.0 as usize;
        let k = self.kernels.get(index).ok_or(BackendError::UnknownKernel)?;
        self.check_shape_capacity(k)?;

        let largest = grid.x.max(grid.y).max(grid.z);
        if largest > self.max_workgroups {
            return Err(BackendError::LimitExceeded {
                what: "workgroup count",
                requested: u64::from(largest),
                limit: u64::from(self.max_workgroups),
            });
        }

        self.ensure_bind_group(index)?;

        if self.params_dirty {
            self.queue
                .write_buffer(&self.params_ubo, 0, bytemuck::bytes_of(&self.params));
            self.params_dirty = false;
        }

        let k = &self.kernels[index];
        let Some(bind_group) = k.bind_group.as_ref() else {
            return Err(BackendError::UnboundSlot(Slot::Params.name()));
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("raymarch dispatch encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("raymarch pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&k.pipeline);
            pass.set_bind_group(BIND_GROUP, bind_group, &[]);
            pass.dispatch_workgroups(grid.x, grid.y, grid.z);
        }

        // Enqueue only; the presenter's own submission orders after this one.
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
