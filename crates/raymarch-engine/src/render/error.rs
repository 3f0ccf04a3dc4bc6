use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::contract::ContractError;

/// Broad class of a [`RenderError`], which decides how the orchestrator reacts.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderErrorKind {
    /// Rendering is disabled for the session.
    Configuration,
    /// The frame is skipped and allocation retried next frame.
    Resource,
    /// The frame is dropped.
    Dispatch,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("invalid render configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("kernel `{0}` not found")]
    KernelNotFound(String),

    #[error("kernel `{name}` does not honor the contract: {source}")]
    Contract {
        name: String,
        #[source]
        source: ContractError,
    },

    #[error("resource allocation failed: {0}")]
    Resource(#[source] BackendError),

    #[error("dispatch failed: {0}")]
    Dispatch(#[source] BackendError),
}

impl RenderError {
    pub fn kind(&self) -> RenderErrorKind {
        match self {
            Self::Config(_) | Self::KernelNotFound(_) | Self::Contract { .. } => {
                RenderErrorKind::Configuration
            }
            Self::Resource(_) => RenderErrorKind::Resource,
            Self::Dispatch(_) => RenderErrorKind::Dispatch,
        }
    }
}
