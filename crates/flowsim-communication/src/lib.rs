//! # flowsim Communication
//!
//! Replays flow samples to WebSocket clients as printer status frames.
//! Each client gets its own paced replay of the full sample list.

pub mod frame;
pub mod replay;
pub mod server;

pub use frame::{
    progress_percent, FrameIdentity, PrintInfo, StatusBody, StatusFrame, DEFAULT_MAINBOARD_ID,
    DEFAULT_TOPIC, EXTRUSION_DECIMALS,
};
pub use replay::{
    clamp_speed, scaled_delay, ReplaySchedule, ReplaySettings, ReplayState, ReplayStep, MIN_SPEED,
};
pub use server::{serve, ServerConfig, TelemetryServer, DEFAULT_PATH};
pub use tokio_util::sync::CancellationToken;
