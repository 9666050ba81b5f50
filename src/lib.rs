//! # flowsim
//!
//! Filament flow simulator for testing flow sensor firmware:
//! - Converts G-code into time-bucketed extrusion samples
//! - Replays samples to WebSocket clients as printer status frames
//! - Extracts flow metrics from firmware debug logs into test vectors
//!
//! ## Architecture
//!
//! 1. **flowsim-core** - Errors, sample model, status codes, lenient input
//! 2. **flowsim-gcode** - Extrusion extraction, chunking, formatting
//! 3. **flowsim-logs** - Debug-log parsing and CSV extraction
//! 4. **flowsim-communication** - Status frames, replay scheduling, WebSocket server
//! 5. **flowsim-settings** - Configuration files
//! 6. **flowsim** - Command-line binary that integrates all crates

pub mod cli;

pub use flowsim_communication::{
    serve, CancellationToken, FrameIdentity, ReplaySchedule, ReplaySettings, ServerConfig,
    StatusFrame, TelemetryServer,
};
pub use flowsim_core::{Error, FlowSample, Result, SourceFile};
pub use flowsim_gcode::{generate_samples, stream_samples, ChunkerConfig, OutputFormat};
pub use flowsim_logs::{extract_log_file, LogExtractor, LogMetricRecord};
pub use flowsim_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Logs go to stderr so stdout stays clean for sample output. `RUST_LOG`
/// takes precedence; otherwise the level is `info`, or `debug` when
/// `verbose` is set.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(verbose);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!(version = VERSION, build_date = BUILD_DATE, "Logging initialized");
    Ok(())
}
