use crate::contract::WorkgroupGrid;
use crate::coords::Resolution;

/// Result of one `RayMarcher::render_frame` call.
///
/// Frames never fail loudly: anything that prevents a dispatch is reported as
/// `Skipped` and logged.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// The kernel was enqueued.
    Dispatched {
        grid: WorkgroupGrid,
        resolution: Resolution,
        shape_count: u32,
        /// Buffer Set generation the dispatch used.
        generation: u64,
        /// The Buffer Set was recreated this frame.
        recreated: bool,
    },
    /// Nothing was enqueued this frame.
    Skipped(SkipReason),
}

/// Why a frame was skipped.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SkipReason {
    /// Kernel lookup or contract check failed at construction. Permanent.
    KernelUnavailable,
    /// Zero-area output; existing resources are kept.
    EmptyOutput,
    /// Buffer Set creation failed; retried next frame.
    ResourceAllocation,
    /// Upload, parameter or dispatch call failed; the frame is dropped.
    DispatchFailed,
}

impl FrameOutcome {
    #[inline]
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }

    pub fn grid(&self) -> Option<WorkgroupGrid> {
        match self {
            Self::Dispatched { grid, .. } => Some(*grid),
            Self::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Dispatched { .. } => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}
