//! # flowsim G-code
//!
//! Converts G-code into synthetic filament-flow samples:
//! - Extrusion extraction with absolute/relative mode tracking
//! - Fixed-interval chunking with a per-sample ceiling
//! - CSV and JSON-lines rendering

pub mod chunker;
pub mod extractor;
pub mod format;
pub mod pipeline;

pub use chunker::{
    chunk_extrusion, ChunkerConfig, FlowChunker, DEFAULT_INTERVAL_MS, DEFAULT_MAX_CHUNK_MM,
};
pub use extractor::{
    extract_extrusion_value, strip_comment, ExtractStats, ExtrusionCommand, ExtrusionExtractor,
    ExtrusionState,
};
pub use format::{
    format_json, format_json_line, format_table, format_table_row, write_json_lines,
    write_samples, write_table, ExtrusionInfo, JsonSample, OutputFormat, TABLE_HEADER,
};
pub use pipeline::{generate_samples, samples_from_text, stream_samples, GeneratedSamples};
