//! Flow sample model shared by the generator, formatter and replay server

use serde::{Deserialize, Serialize};

/// Tolerance below which an extrusion quantity is treated as zero
pub const EXTRUSION_EPSILON: f64 = 1e-6;

/// One time-bucketed extrusion measurement
///
/// `total_mm` is the running sum of every `delta_mm` emitted so far,
/// including this one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowSample {
    /// Simulated time since the start of the print (ms)
    pub timestamp_ms: u64,
    /// Filament extruded in this tick (mm, negative for retractions)
    pub delta_mm: f64,
    /// Running extrusion total (mm)
    pub total_mm: f64,
}

impl FlowSample {
    /// Create a new sample
    pub fn new(timestamp_ms: u64, delta_mm: f64, total_mm: f64) -> Self {
        Self {
            timestamp_ms,
            delta_mm,
            total_mm,
        }
    }
}

impl From<(u64, f64, f64)> for FlowSample {
    fn from((timestamp_ms, delta_mm, total_mm): (u64, f64, f64)) -> Self {
        Self::new(timestamp_ms, delta_mm, total_mm)
    }
}

/// Round `value` to `places` decimal digits
///
/// Used wherever the wire format carries a fixed number of decimals as a JSON
/// number rather than a formatted string.
pub fn round_decimals(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
