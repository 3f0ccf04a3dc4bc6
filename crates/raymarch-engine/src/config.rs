//! Ray marcher configuration.
//!
//! The lighting, fog and reflection variants of the kernel are one
//! configuration with optional features, not separate code paths.

use thiserror::Error;

use crate::coords::ColorRgba;

/// Distance fog.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FogConfig {
    /// Distance at which a miss is fully fogged.
    pub distance: f32,
    pub color: ColorRgba,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            distance: 500.0,
            color: ColorRgba::new(0.2, 0.2, 0.2, 1.0),
        }
    }
}

/// Per-session ray marcher settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Compute entry point looked up once at construction.
    pub kernel_name: String,

    /// Surface hit threshold.
    pub epsilon: f32,

    /// Finite-difference step for normals.
    pub delta: f32,

    pub far_plane: f32,

    /// `None` disables fog.
    pub fog: Option<FogConfig>,

    pub max_steps: u32,

    /// Reflection bounces; `0` disables reflections.
    pub max_bounces: u32,

    /// Bind and upload the light record. The kernel must declare the light slot.
    pub lighting: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            kernel_name: "RayMarch".to_string(),
            epsilon: 1e-4,
            delta: 1e-4,
            far_plane: 1000.0,
            fog: Some(FogConfig::default()),
            max_steps: 128,
            max_bounces: 4,
            lighting: false,
        }
    }
}

impl RenderConfig {
    pub fn with_lighting(mut self, lighting: bool) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_fog(mut self, fog: Option<FogConfig>) -> Self {
        self.fog = fog;
        self
    }

    pub fn with_kernel_name(mut self, name: impl Into<String>) -> Self {
        self.kernel_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kernel_name.is_empty() {
            return Err(ConfigError::EmptyKernelName);
        }
        positive("epsilon", self.epsilon)?;
        positive("delta", self.delta)?;
        positive("far_plane", self.far_plane)?;
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }
        if let Some(fog) = &self.fog {
            positive("fog.distance", fog.distance)?;
            if !fog.color.is_finite() {
                return Err(ConfigError::NonFiniteFogColor);
            }
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("kernel name is empty")]
    EmptyKernelName,
    #[error("`{field}` must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("`max_steps` must be at least 1")]
    ZeroMaxSteps,
    #[error("fog color has non-finite components")]
    NonFiniteFogColor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RenderConfig::default();
        assert_eq!(config.kernel_name, "RayMarch");
        assert_eq!(config.max_steps, 128);
        assert_eq!(config.fog.map(|f| f.distance), Some(500.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_epsilon() {
        let config = RenderConfig {
            epsilon: 0.0,
            ..RenderConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "epsilon",
                value: 0.0
            })
        );
    }

    #[test]
    fn rejects_nan_far_plane() {
        let config = RenderConfig {
            far_plane: f32::NAN,
            ..RenderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "far_plane", .. })
        ));
    }

    #[test]
    fn fog_is_only_checked_when_enabled() {
        let bad_fog = FogConfig {
            distance: -1.0,
            ..FogConfig::default()
        };
        let config = RenderConfig::default().with_fog(Some(bad_fog));
        assert!(config.validate().is_err());
        assert!(config.with_fog(None).validate().is_ok());
    }

    #[test]
    fn zero_steps_is_rejected() {
        let config = RenderConfig {
            max_steps: 0,
            ..RenderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxSteps));
    }
}
