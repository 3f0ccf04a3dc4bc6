//! GPU Buffer Set ownership.
//!
//! The set is either fully valid or fully released. Recreation releases the
//! previous generation completely before allocating the next one.

use std::mem::size_of;

use crate::backend::{
    BackendResult, BufferDescriptor, BufferHandle, ComputeBackend, ImageDescriptor, ImageHandle,
    KernelHandle,
};
use crate::contract::{BufferSlot, CameraRecord, ImageSlot, LightRecord, ShapeRecord};
use crate::coords::Resolution;

/// Output image plus per-frame data buffers for one resolution and shape count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSet {
    pub image: ImageHandle,
    pub shapes: BufferHandle,
    pub camera: BufferHandle,
    pub light: Option<BufferHandle>,
    pub resolution: Resolution,
    /// Records the shape buffer holds. At least one, even for an empty scene.
    pub shape_capacity: u32,
}

impl BufferSet {
    /// Allocates a complete set. On failure everything allocated so far is
    /// released before the error is returned.
    fn create<B: ComputeBackend>(
        backend: &mut B,
        resolution: Resolution,
        shape_count: u32,
        lighting: bool,
    ) -> BackendResult<Self> {
        let mut partial = Partial::default();
        let result = Self::allocate(backend, &mut partial, resolution, shape_count, lighting);
        if result.is_err() {
            partial.release(backend);
        }
        result
    }

    fn allocate<B: ComputeBackend>(
        backend: &mut B,
        partial: &mut Partial,
        resolution: Resolution,
        shape_count: u32,
        lighting: bool,
    ) -> BackendResult<Self> {
        let shape_capacity = shape_count.max(1);

        let image = backend.create_image(&ImageDescriptor {
            label: "raymarch output",
            resolution,
        })?;
        partial.image = Some(image);

        let shapes = backend.create_buffer(&record_buffer::<ShapeRecord>(
            "raymarch shapes",
            shape_capacity,
        ))?;
        partial.buffers.push(shapes);

        let camera = backend.create_buffer(&record_buffer::<CameraRecord>("raymarch camera", 1))?;
        partial.buffers.push(camera);

        let light = if lighting {
            let light = backend.create_buffer(&record_buffer::<LightRecord>("raymarch light", 1))?;
            partial.buffers.push(light);
            Some(light)
        } else {
            None
        };

        Ok(Self {
            image,
            shapes,
            camera,
            light,
            resolution,
            shape_capacity,
        })
    }

    fn bind<B: ComputeBackend>(&self, backend: &mut B, kernel: KernelHandle) -> BackendResult<()> {
        backend.bind_image(kernel, ImageSlot::Output, self.image)?;
        backend.bind_buffer(kernel, BufferSlot::Shapes, self.shapes)?;
        backend.bind_buffer(kernel, BufferSlot::Camera, self.camera)?;
        if let Some(light) = self.light {
            backend.bind_buffer(kernel, BufferSlot::Light, light)?;
        }
        Ok(())
    }

    fn release<B: ComputeBackend>(self, backend: &mut B) {
        backend.release_image(self.image);
        backend.release_buffer(self.shapes);
        backend.release_buffer(self.camera);
        if let Some(light) = self.light {
            backend.release_buffer(light);
        }
    }
}

#[derive(Default)]
struct Partial {
    image: Option<ImageHandle>,
    buffers: Vec<BufferHandle>,
}

impl Partial {
    fn release<B: ComputeBackend>(self, backend: &mut B) {
        if let Some(image) = self.image {
            backend.release_image(image);
        }
        for buffer in self.buffers {
            backend.release_buffer(buffer);
        }
    }
}

fn record_buffer<T>(label: &'static str, count: u32) -> BufferDescriptor {
    BufferDescriptor {
        label,
        element_size: size_of::<T>() as u64,
        element_count: u64::from(count),
    }
}

/// Keeps a Buffer Set in lockstep with the output resolution and shape count.
#[derive(Debug)]
pub struct ResourceManager {
    lighting: bool,
    set: Option<BufferSet>,

    /// Resolution of the live set. `None` until the first successful creation
    /// and after a release.
    last_resolution: Option<Resolution>,

    /// Shape count of the live set.
    last_shape_count: Option<u32>,

    /// Bumped on every successful recreation.
    generation: u64,
}

impl ResourceManager {
    pub fn new(lighting: bool) -> Self {
        Self {
            lighting,
            set: None,
            last_resolution: None,
            last_shape_count: None,
            generation: 0,
        }
    }

    /// True when no set exists or it was built for a different size.
    pub fn needs_recreate(&self, resolution: Resolution, shape_count: u32) -> bool {
        self.set.is_none()
            || self.last_resolution != Some(resolution)
            || self.last_shape_count != Some(shape_count)
    }

    /// Makes sure a Buffer Set for `resolution` and `shape_count` exists and is
    /// bound to `kernel`. Returns `true` when it was (re)created.
    ///
    /// On error no set is live and the next call tries again.
    pub fn ensure<B: ComputeBackend>(
        &mut self,
        backend: &mut B,
        kernel: KernelHandle,
        resolution: Resolution,
        shape_count: u32,
    ) -> BackendResult<bool> {
        if !self.needs_recreate(resolution, shape_count) {
            return Ok(false);
        }

        self.release(backend);

        let set = BufferSet::create(backend, resolution, shape_count, self.lighting)?;
        if let Err(err) = set.bind(backend, kernel) {
            set.release(backend);
            return Err(err);
        }

        self.generation += 1;
        log::info!(
            "buffer set #{} created: {}x{}, {} shape record(s)",
            self.generation,
            resolution.width,
            resolution.height,
            set.shape_capacity
        );

        self.last_resolution = Some(resolution);
        self.last_shape_count = Some(shape_count);
        self.set = Some(set);
        Ok(true)
    }

    /// Releases the live set, if any. Safe to call repeatedly.
    pub fn release<B: ComputeBackend>(&mut self, backend: &mut B) {
        if let Some(set) = self.set.take() {
            log::debug!("buffer set #{} released", self.generation);
            set.release(backend);
        }
        self.last_resolution = None;
        self.last_shape_count = None;
    }

    pub fn buffer_set(&self) -> Option<&BufferSet> {
        self.set.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_resolution(&self) -> Option<Resolution> {
        self.last_resolution
    }

    pub fn last_shape_count(&self) -> Option<u32> {
        self.last_shape_count
    }
}
