//! Log metric rows and their CSV rendering

use flowsim_core::PrintStatus;

/// CSV header for extracted log metrics
pub const METRICS_HEADER: &str =
    "timestamp_ms,expected_mm,actual_mm,deficit_mm,ratio,hard_pct,soft_pct,jam_state,print_status";

/// One row reconstructed from a firmware `Flow:` debug line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogMetricRecord {
    /// Timestamp of the most recent timestamp-bearing line
    pub timestamp_ms: u64,
    /// Expected extrusion over the detection window (mm)
    pub expected_mm: f64,
    /// Sensor-measured extrusion over the window (mm)
    pub actual_mm: f64,
    /// Reported deficit, if the line carried one (mm)
    pub deficit_mm: Option<f64>,
    /// Pass ratio (`pass=`, falling back to `ratio=`)
    pub ratio: f64,
    /// Hard-jam progress (%)
    pub hard_pct: f64,
    /// Soft-jam progress (%)
    pub soft_pct: f64,
    /// Jam flag as reported by the firmware
    pub jam_state: u32,
    /// Printer status the row is replayed under
    pub print_status: PrintStatus,
}

impl LogMetricRecord {
    /// Render as a CSV row (no trailing newline)
    ///
    /// A missing deficit renders as `0.00`.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{:.2},{:.2},{:.2},{:.3},{:.1},{:.1},{},{}",
            self.timestamp_ms,
            self.expected_mm,
            self.actual_mm,
            self.deficit_mm.unwrap_or(0.0),
            self.ratio,
            self.hard_pct,
            self.soft_pct,
            self.jam_state,
            self.print_status.code()
        )
    }
}
