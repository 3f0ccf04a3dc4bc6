use crate::backend::{BackendResult, ComputeBackend, ImageHandle, KernelInfo};
use crate::config::RenderConfig;
use crate::contract::{
    ContractError, KernelFlags, KernelParams, ParamSlot, SlotSet, WorkgroupGrid,
};
use crate::coords::Resolution;
use crate::scene::{Camera, SceneQuery};
use crate::snapshot::{SceneSnapshot, SnapshotBuilder};

use super::resources::{BufferSet, ResourceManager};
use super::{FrameOutcome, RenderError, SkipReason};

/// What a presenter needs to show the latest output.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OutputImage {
    pub handle: ImageHandle,
    pub resolution: Resolution,
    /// Changes whenever the image is recreated; rebind when it does.
    pub generation: u64,
}

/// Per-frame scene-to-GPU orchestrator.
///
/// Owns the Buffer Set and feeds the kernel once per frame:
/// 1. skip if the kernel is unavailable or the output is empty
/// 2. recreate the Buffer Set if resolution or shape count changed
/// 3. snapshot the scene and upload the records
/// 4. set the parameter block
/// 5. dispatch over a grid covering the output
///
/// Dropping the orchestrator releases the Buffer Set.
pub struct RayMarcher<B: ComputeBackend> {
    backend: B,
    config: RenderConfig,

    /// `None` when lookup or the contract check failed; see `disabled`.
    kernel: Option<KernelInfo>,
    disabled: Option<RenderError>,

    resources: ResourceManager,
    snapshot: SnapshotBuilder,

    frame_index: u64,
    consecutive_failures: u32,
}

impl<B: ComputeBackend> RayMarcher<B> {
    /// Looks up the configured kernel and checks it against the contract.
    ///
    /// Construction never fails. A configuration error is logged once and
    /// every later frame is skipped.
    pub fn new(mut backend: B, config: RenderConfig) -> Self {
        let (kernel, disabled) = match resolve_kernel(&mut backend, &config) {
            Ok(info) => {
                log::debug!(
                    "kernel {} ready: workgroup {:?}, slots {:?}",
                    info.name,
                    info.workgroup_size,
                    info.slots
                );
                (Some(info), None)
            }
            Err(err) => {
                log::error!("ray marching disabled: {err}");
                (None, Some(err))
            }
        };

        Self {
            backend,
            resources: ResourceManager::new(config.lighting),
            config,
            kernel,
            disabled,
            snapshot: SnapshotBuilder::new(),
            frame_index: 0,
            consecutive_failures: 0,
        }
    }

    /// Runs one orchestration pass for `scene` at `resolution`.
    pub fn render_frame(&mut self, scene: &impl SceneQuery, resolution: Resolution) -> FrameOutcome {
        self.frame_index += 1;

        let Some(kernel) = self.kernel.as_ref() else {
            return FrameOutcome::Skipped(SkipReason::KernelUnavailable);
        };
        let (handle, workgroup_size) = (kernel.handle, kernel.workgroup_size);

        if resolution.is_empty() {
            log::trace!("frame {}: empty output, skipped", self.frame_index);
            return FrameOutcome::Skipped(SkipReason::EmptyOutput);
        }

        let shapes = scene.shapes();
        let camera = scene.camera();

        // Counts past u32::MAX cannot be addressed by the kernel; the
        // allocation below fails on the buffer limit long before that.
        let shape_count = u32::try_from(shapes.len()).unwrap_or(u32::MAX);

        let recreated = match self
            .resources
            .ensure(&mut self.backend, handle, resolution, shape_count)
        {
            Ok(recreated) => recreated,
            Err(err) => {
                self.report_failure(&RenderError::Resource(err));
                return FrameOutcome::Skipped(SkipReason::ResourceAllocation);
            }
        };
        let Some(set) = self.resources.buffer_set() else {
            return FrameOutcome::Skipped(SkipReason::ResourceAllocation);
        };

        let light = if self.config.lighting { scene.light() } else { None };
        let snapshot = self.snapshot.build_from(shapes, camera, light);
        let params = kernel_params(&self.config, camera, resolution, snapshot);
        let grid = WorkgroupGrid::covering(resolution, workgroup_size);

        let submitted = upload(&mut self.backend, set, snapshot, &params)
            .and_then(|()| self.backend.dispatch(handle, grid));
        if let Err(err) = submitted {
            self.report_failure(&RenderError::Dispatch(err));
            return FrameOutcome::Skipped(SkipReason::DispatchFailed);
        }

        if self.consecutive_failures > 0 {
            log::info!(
                "frame {}: dispatching again after {} skipped frame(s)",
                self.frame_index,
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
        }

        log::trace!(
            "frame {}: dispatched {:?} for {} shape(s)",
            self.frame_index,
            grid,
            shape_count
        );

        FrameOutcome::Dispatched {
            grid,
            resolution,
            shape_count,
            generation: self.resources.generation(),
            recreated,
        }
    }

    /// The image the kernel writes to, for presentation.
    pub fn output_image(&self) -> Option<OutputImage> {
        self.resources.buffer_set().map(|set| OutputImage {
            handle: set.image,
            resolution: set.resolution,
            generation: self.resources.generation(),
        })
    }

    /// False once a configuration error disabled rendering.
    pub fn is_enabled(&self) -> bool {
        self.kernel.is_some()
    }

    /// The configuration error that disabled rendering, if any.
    pub fn disabled_reason(&self) -> Option<&RenderError> {
        self.disabled.as_ref()
    }

    pub fn kernel(&self) -> Option<&KernelInfo> {
        self.kernel.as_ref()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Releases the Buffer Set now instead of on drop. The next frame
    /// allocates a fresh one.
    pub fn release_resources(&mut self) {
        self.resources.release(&mut self.backend);
    }

    fn report_failure(&mut self, err: &RenderError) {
        self.consecutive_failures += 1;
        if self.consecutive_failures == 1 {
            log::warn!("frame {}: skipped, {err}", self.frame_index);
        } else {
            log::debug!(
                "frame {}: skipped ({} in a row), {err}",
                self.frame_index,
                self.consecutive_failures
            );
        }
    }
}

impl<B: ComputeBackend> Drop for RayMarcher<B> {
    fn drop(&mut self) {
        self.resources.release(&mut self.backend);
    }
}

fn resolve_kernel<B: ComputeBackend>(
    backend: &mut B,
    config: &RenderConfig,
) -> Result<KernelInfo, RenderError> {
    config.validate()?;

    let info = backend
        .find_kernel(&config.kernel_name)
        .ok_or_else(|| RenderError::KernelNotFound(config.kernel_name.clone()))?;

    let required = SlotSet::required(config.lighting);
    if info.slots != required {
        return Err(RenderError::Contract {
            name: info.name,
            source: ContractError::SlotSetMismatch {
                declared: info.slots,
                required,
            },
        });
    }
    Ok(info)
}

/// Parameter block for one frame.
pub fn kernel_params(
    config: &RenderConfig,
    camera: &Camera,
    resolution: Resolution,
    snapshot: &SceneSnapshot,
) -> KernelParams {
    let mut flags = KernelFlags::empty();
    if config.lighting && snapshot.light.is_some() {
        flags = flags | KernelFlags::LIGHT_PRESENT;
    }
    if config.fog.is_some() {
        flags = flags | KernelFlags::FOG;
    }
    if config.max_bounces > 0 {
        flags = flags | KernelFlags::REFLECTIONS;
    }

    let (fog_distance, fog_color) = config
        .fog
        .map(|fog| (fog.distance, fog.color.to_array()))
        .unwrap_or((0.0, [0.0; 4]));

    KernelParams {
        resolution: resolution.to_array(),
        shape_count: snapshot.shapes.len() as u32,
        flags: flags.bits(),
        tangent: camera.half_fov_tangent(),
        aspect: camera.aspect.unwrap_or_else(|| resolution.aspect()),
        epsilon: config.epsilon,
        delta: config.delta,
        far_plane: config.far_plane,
        fog_distance,
        max_steps: config.max_steps,
        max_bounces: config.max_bounces,
        fog_color,
    }
}

fn upload<B: ComputeBackend>(
    backend: &mut B,
    set: &BufferSet,
    snapshot: &SceneSnapshot,
    params: &KernelParams,
) -> BackendResult<()> {
    backend.write_buffer(set.shapes, bytemuck::cast_slice(&snapshot.shapes))?;
    backend.write_buffer(set.camera, bytemuck::bytes_of(&snapshot.camera))?;
    if let Some(light) = set.light {
        backend.write_buffer(light, bytemuck::bytes_of(&snapshot.light_or_zeroed()))?;
    }

    for slot in ParamSlot::ALL {
        backend.set_param(slot, params.get(slot))?;
    }
    Ok(())
}
