//! # flowsim Logs
//!
//! Reconstructs flow metric rows from captured firmware debug logs so that
//! real-world prints can be replayed through the same test harness as
//! G-code-derived samples.

pub mod extractor;
pub mod parser;
pub mod record;

pub use extractor::{
    extract_log_file, resolve_output_path, write_metrics, ExtractionStats, LogExtractor,
    DEFAULT_OUTPUT_DIR,
};
pub use parser::{
    detect_jam_event, extract_timestamp, parse_flow_line, FlowLine, JamEvent, FLOW_MARKER,
    JAM_MARKER,
};
pub use record::{LogMetricRecord, METRICS_HEADER};
