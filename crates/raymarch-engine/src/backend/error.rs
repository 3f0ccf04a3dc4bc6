use thiserror::Error;

use crate::contract::ContractError;

/// Failures reported by a [`ComputeBackend`](super::ComputeBackend).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{what} of {requested} exceeds device limit {limit}")]
    LimitExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },
    #[error("out of device memory")]
    OutOfMemory,
    #[error("zero-sized {0}")]
    ZeroSized(&'static str),
    #[error("unknown buffer handle")]
    UnknownBuffer,
    #[error("unknown image handle")]
    UnknownImage,
    #[error("unknown kernel handle")]
    UnknownKernel,
    #[error("write of {len} bytes exceeds buffer size {size}")]
    WriteOutOfBounds { len: u64, size: u64 },
    #[error("kernel does not declare slot `{0}`")]
    UndeclaredSlot(&'static str),
    #[error("slot `{0}` has no live resource bound")]
    UnboundSlot(&'static str),
    #[error("buffer bound to `{slot}` holds {size} bytes, dispatch needs {needed}")]
    BufferTooSmall {
        slot: &'static str,
        size: u64,
        needed: u64,
    },
    #[error(transparent)]
    Contract(#[from] ContractError),
}

pub type BackendResult<T> = Result<T, BackendError>;
