use std::sync::Once;

/// Filter applied when neither `env_filter` nor `RUST_LOG` is set.
///
/// wgpu and naga log every pipeline and bind group at `info`; keep them quiet.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "raymarch_engine=debug,wgpu_core=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Route output through the test harness capture.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    /// Captured, per-frame detail for test runs.
    pub fn for_tests() -> Self {
        Self {
            env_filter: Some("raymarch_engine=trace".to_string()),
            write_style: env_logger::WriteStyle::Never,
            is_test: true,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored, so every test may call it.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.parse_filters(DEFAULT_FILTER);
        }

        builder.write_style(config.write_style);
        builder.is_test(config.is_test);

        // Another logger may already be installed by the host application.
        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized");
    });
}
