//! Log-to-test-vector extraction
//!
//! Walks a captured debug log, carrying the most recent timestamp forward to
//! every `Flow:` line, and produces [`LogMetricRecord`] rows in the same CSV
//! contract the firmware test harness replays.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flowsim_core::{LossyLines, PrintStatus, Result, SourceFile};

use crate::parser::{detect_jam_event, extract_timestamp, parse_flow_line, JamEvent};
use crate::record::{LogMetricRecord, METRICS_HEADER};

/// Default directory for extracted CSV files
pub const DEFAULT_OUTPUT_DIR: &str = "./condensed";

/// Counters reported after an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Lines scanned
    pub lines_scanned: u64,
    /// Valid data rows extracted
    pub records: u64,
    /// Jam announcements seen, by kind
    pub jam_events: HashMap<JamEvent, u64>,
}

impl ExtractionStats {
    /// Total jam announcements of any kind
    pub fn total_jam_events(&self) -> u64 {
        self.jam_events.values().sum()
    }
}

impl fmt::Display for ExtractionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} lines, extracted {} data points",
            self.lines_scanned, self.records
        )
    }
}

/// Lazy iterator of metric rows over a debug log
pub struct LogExtractor<R> {
    lines: LossyLines<R>,
    last_timestamp: u64,
    stats: ExtractionStats,
    error: Option<io::Error>,
}

impl LogExtractor<BufReader<File>> {
    /// Open a log file for extraction
    pub fn from_source(source: &SourceFile) -> Result<Self> {
        Ok(Self::new(source.open()?))
    }
}

impl<'a> LogExtractor<&'a [u8]> {
    /// Extract from in-memory log text
    pub fn from_text(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<R: BufRead> LogExtractor<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: LossyLines::new(reader),
            last_timestamp: 0,
            stats: ExtractionStats::default(),
            error: None,
        }
    }

    /// Timestamp that the next data line would carry
    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Counters so far
    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    /// Consume the extractor, surfacing any I/O error that ended iteration
    pub fn finish(self) -> Result<ExtractionStats> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.stats),
        }
    }
}

impl<R: BufRead> Iterator for LogExtractor<R> {
    type Item = LogMetricRecord;

    fn next(&mut self) -> Option<LogMetricRecord> {
        if self.error.is_some() {
            return None;
        }

        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!("Log read failed after {} lines: {}", self.stats.lines_scanned, err);
                    self.error = Some(err);
                    return None;
                }
            };
            self.stats.lines_scanned += 1;

            if let Some(ts) = extract_timestamp(&line) {
                self.last_timestamp = ts;
            }

            if let Some(event) = detect_jam_event(&line) {
                tracing::debug!(timestamp = self.last_timestamp, kind = %event, "Jam event in log");
                *self.stats.jam_events.entry(event).or_insert(0) += 1;
            }

            if let Some(flow) = parse_flow_line(&line) {
                self.stats.records += 1;
                return Some(LogMetricRecord {
                    timestamp_ms: self.last_timestamp,
                    expected_mm: flow.expected,
                    actual_mm: flow.actual,
                    deficit_mm: flow.deficit,
                    ratio: flow.pass_ratio,
                    hard_pct: flow.hard_pct,
                    soft_pct: flow.soft_pct,
                    jam_state: flow.jam_state,
                    print_status: PrintStatus::Printing,
                });
            }
        }
    }
}

/// Write the metrics CSV for everything `extractor` yields
pub fn write_metrics<W, R>(writer: &mut W, extractor: &mut LogExtractor<R>) -> Result<u64>
where
    W: Write,
    R: BufRead,
{
    writeln!(writer, "{}", METRICS_HEADER)?;
    let mut rows = 0;
    for record in extractor {
        writeln!(writer, "{}", record.to_csv_row())?;
        rows += 1;
    }
    Ok(rows)
}

/// Decide where the CSV for `input` goes
///
/// The file name defaults to the input's stem with a `.csv` extension. The
/// result is `output_dir` joined with the file name, so an absolute `output`
/// path is used as-is.
pub fn resolve_output_path(input: &Path, output: Option<&Path>, output_dir: &Path) -> PathBuf {
    let file_name = match output {
        Some(output) => output.to_path_buf(),
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            PathBuf::from(format!("{}.csv", stem))
        }
    };
    output_dir.join(file_name)
}

/// Extract `source` into a CSV file at `output_path`
///
/// Parent directories are created as needed.
pub fn extract_log_file(source: &SourceFile, output_path: &Path) -> Result<ExtractionStats> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut extractor = LogExtractor::from_source(source)?;
    let mut writer = BufWriter::new(File::create(output_path)?);
    write_metrics(&mut writer, &mut extractor)?;
    writer.flush()?;

    let stats = extractor.finish()?;
    tracing::info!(
        input = %source.path().display(),
        output = %output_path.display(),
        lines = stats.lines_scanned,
        records = stats.records,
        jam_events = stats.total_jam_events(),
        "Log extraction complete"
    );
    Ok(stats)
}
