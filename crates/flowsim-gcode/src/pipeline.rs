//! G-code to flow-sample pipeline
//!
//! Wires the extractor into the chunker for the two consumers: the formatter,
//! which streams straight to a writer, and the replay server, which needs the
//! whole sequence up front.

use std::io::Write;

use flowsim_core::{FlowSample, Result, SourceFile};

use crate::chunker::{ChunkerConfig, FlowChunker};
use crate::extractor::{ExtractStats, ExtrusionExtractor};
use crate::format::{write_samples, OutputFormat};

/// A materialized sample sequence and the counters that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSamples {
    /// Samples in emission order
    pub samples: Vec<FlowSample>,
    /// Extraction counters
    pub stats: ExtractStats,
}

impl GeneratedSamples {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no extrusion was found
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Extract and chunk a whole G-code file into memory
pub fn generate_samples(source: &SourceFile, config: ChunkerConfig) -> Result<GeneratedSamples> {
    let mut extractor = ExtrusionExtractor::from_source(source)?;
    let samples: Vec<FlowSample> = FlowChunker::new(extractor.by_ref(), config)?.collect();
    let stats = extractor.finish()?;

    tracing::debug!(
        path = %source.path().display(),
        lines = stats.lines_read,
        deltas = stats.deltas,
        samples = samples.len(),
        "Generated flow samples"
    );

    Ok(GeneratedSamples { samples, stats })
}

/// Extract, chunk and format a G-code file without materializing the samples
///
/// Returns the number of samples written.
pub fn stream_samples<W: Write>(
    source: &SourceFile,
    config: ChunkerConfig,
    format: OutputFormat,
    writer: &mut W,
) -> Result<usize> {
    let mut extractor = ExtrusionExtractor::from_source(source)?;
    let written = write_samples(writer, format, FlowChunker::new(extractor.by_ref(), config)?)?;
    let stats = extractor.finish()?;

    tracing::debug!(
        path = %source.path().display(),
        lines = stats.lines_read,
        deltas = stats.deltas,
        samples = written,
        "Streamed flow samples"
    );

    Ok(written)
}

/// Extract and chunk in-memory G-code text
pub fn samples_from_text(text: &str, config: ChunkerConfig) -> Result<Vec<FlowSample>> {
    Ok(FlowChunker::new(ExtrusionExtractor::from_text(text), config)?.collect())
}
