//! Printer status frames
//!
//! One frame is sent per flow sample. The shape mirrors the status topic the
//! real printer publishes, so a sensor board under test cannot tell the
//! simulator apart from a printer:
//!
//! ```json
//! {"Topic":"status/simulator","Status":{"CurrentStatus":[1],"PrintInfo":{"Status":13,
//!  "CurrentLayer":0,"TotalLayer":0,"Progress":50,"CurrentTicks":2,"TotalTicks":4,
//!  "PrintSpeedPct":100,"CurrentExtrusion":3.0,"TotalExtrusion":9.0}},"MainboardID":"SIMULATOR"}
//! ```

use flowsim_core::{round_decimals, FlowSample, MachineStatus, PrintStatus, Result};
use serde::{Deserialize, Serialize};

/// Default `Topic` value
pub const DEFAULT_TOPIC: &str = "status/simulator";

/// Default `MainboardID` value
pub const DEFAULT_MAINBOARD_ID: &str = "SIMULATOR";

/// Decimal places kept for extrusion values on the wire
pub const EXTRUSION_DECIMALS: i32 = 6;

/// Identity fields stamped on every frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameIdentity {
    pub topic: String,
    pub mainboard_id: String,
}

impl Default for FrameIdentity {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            mainboard_id: DEFAULT_MAINBOARD_ID.to_string(),
        }
    }
}

/// `Status.PrintInfo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrintInfo {
    pub status: u8,
    pub current_layer: u32,
    pub total_layer: u32,
    pub progress: u8,
    pub current_ticks: u64,
    pub total_ticks: u64,
    pub print_speed_pct: u32,
    pub current_extrusion: f64,
    pub total_extrusion: f64,
}

/// `Status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusBody {
    pub current_status: Vec<u8>,
    pub print_info: PrintInfo,
}

/// A complete status message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusFrame {
    pub topic: String,
    pub status: StatusBody,
    #[serde(rename = "MainboardID")]
    pub mainboard_id: String,
}

/// Progress percentage for sample `index` of `count`
///
/// The final sample of a pass always reports 100 so a replay visibly
/// completes even when `count` does not divide evenly.
pub fn progress_percent(index: usize, count: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    if index + 1 >= count {
        return 100;
    }
    let pct = (index as u128 * 100) / count as u128;
    pct.min(100) as u8
}

impl StatusFrame {
    /// Build the frame for sample `index` of a `count`-sample replay
    pub fn build(
        identity: &FrameIdentity,
        index: usize,
        delta_mm: f64,
        total_mm: f64,
        count: usize,
    ) -> Self {
        Self {
            topic: identity.topic.clone(),
            status: StatusBody {
                current_status: vec![MachineStatus::Printing.code()],
                print_info: PrintInfo {
                    status: PrintStatus::Printing.code(),
                    current_layer: 0,
                    total_layer: 0,
                    progress: progress_percent(index, count),
                    current_ticks: index.min(count) as u64,
                    total_ticks: count as u64,
                    print_speed_pct: 100,
                    current_extrusion: round_decimals(delta_mm, EXTRUSION_DECIMALS),
                    total_extrusion: round_decimals(total_mm, EXTRUSION_DECIMALS),
                },
            },
            mainboard_id: identity.mainboard_id.clone(),
        }
    }

    /// Build the frame for `sample`
    pub fn for_sample(
        identity: &FrameIdentity,
        index: usize,
        sample: &FlowSample,
        count: usize,
    ) -> Self {
        Self::build(identity, index, sample.delta_mm, sample.total_mm, count)
    }

    /// Serialize to the JSON text sent over the socket
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(0, 4), 0);
        assert_eq!(progress_percent(1, 4), 25);
        assert_eq!(progress_percent(2, 3), 100);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(0, 1), 100);
        assert_eq!(progress_percent(9, 4), 100);
    }

    #[test]
    fn test_frame_json_shape() {
        let frame = StatusFrame::build(&FrameIdentity::default(), 2, 3.0, 9.0, 4);
        let json = frame.to_json().unwrap();
        assert_eq!(
            json,
            "{\"Topic\":\"status/simulator\",\"Status\":{\"CurrentStatus\":[1],\"PrintInfo\":{\
             \"Status\":13,\"CurrentLayer\":0,\"TotalLayer\":0,\"Progress\":50,\"CurrentTicks\":2,\
             \"TotalTicks\":4,\"PrintSpeedPct\":100,\"CurrentExtrusion\":3.0,\"TotalExtrusion\":9.0}},\
             \"MainboardID\":\"SIMULATOR\"}"
        );
    }

    #[test]
    fn test_extrusion_rounding() {
        let frame = StatusFrame::build(&FrameIdentity::default(), 0, 0.12345678, 1.00000049, 10);
        assert_eq!(frame.status.print_info.current_extrusion, 0.123457);
        assert_eq!(frame.status.print_info.total_extrusion, 1.0);
    }

    #[test]
    fn test_ticks_and_identity() {
        let identity = FrameIdentity {
            topic: "status/bench".to_string(),
            mainboard_id: "BENCH-01".to_string(),
        };
        let frame = StatusFrame::build(&identity, 7, -0.8, 4.2, 5);
        assert_eq!(frame.topic, "status/bench");
        assert_eq!(frame.mainboard_id, "BENCH-01");
        assert_eq!(frame.status.print_info.current_ticks, 5);
        assert_eq!(frame.status.print_info.total_ticks, 5);
        assert_eq!(frame.status.print_info.current_extrusion, -0.8);

        let empty = StatusFrame::build(&identity, 0, 0.0, 0.0, 0);
        assert_eq!(empty.status.print_info.current_ticks, 0);
        assert_eq!(empty.status.print_info.progress, 0);
    }

    #[test]
    fn test_frame_parses_back() {
        let frame = StatusFrame::build(&FrameIdentity::default(), 1, 0.5, 1.5, 3);
        let parsed: StatusFrame = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(parsed, frame);
    }
}
