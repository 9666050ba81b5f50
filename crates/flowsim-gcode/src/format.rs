//! Rendering of flow samples as CSV tables or JSON lines

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use flowsim_core::{round_decimals, Error, FlowSample, Result};
use serde::{Deserialize, Serialize};

/// CSV header for sample tables
pub const TABLE_HEADER: &str = "timestamp_ms,delta_mm,total_mm";

/// Sample output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// CSV table
    #[default]
    Table,
    /// Newline-delimited JSON objects
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" | "csv" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(Error::invalid_parameter(
                "output",
                format!("unknown format '{}', expected table or json", other),
            )),
        }
    }
}

/// `PrintInfo` block of a JSON sample line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtrusionInfo {
    /// Extrusion in this tick, rounded to 6 decimals
    pub current_extrusion: f64,
    /// Running total, rounded to 6 decimals
    pub total_extrusion: f64,
}

/// One JSON sample line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JsonSample {
    /// Simulated time (ms)
    pub timestamp_ms: u64,
    /// Extrusion values
    #[serde(rename = "PrintInfo")]
    pub print_info: ExtrusionInfo,
}

impl From<FlowSample> for JsonSample {
    fn from(sample: FlowSample) -> Self {
        Self {
            timestamp_ms: sample.timestamp_ms,
            print_info: ExtrusionInfo {
                current_extrusion: round_decimals(sample.delta_mm, 6),
                total_extrusion: round_decimals(sample.total_mm, 6),
            },
        }
    }
}

/// Render one CSV row (no trailing newline)
pub fn format_table_row(sample: &FlowSample) -> String {
    format!(
        "{},{:.4},{:.4}",
        sample.timestamp_ms, sample.delta_mm, sample.total_mm
    )
}

/// Render one JSON line (no trailing newline)
pub fn format_json_line(sample: &FlowSample) -> Result<String> {
    Ok(serde_json::to_string(&JsonSample::from(*sample))?)
}

/// Stream a CSV table to `writer`, returning the number of rows written
pub fn write_table<W, I>(writer: &mut W, samples: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = FlowSample>,
{
    writeln!(writer, "{}", TABLE_HEADER)?;
    let mut rows = 0;
    for sample in samples {
        writeln!(writer, "{}", format_table_row(&sample))?;
        rows += 1;
    }
    Ok(rows)
}

/// Stream JSON lines to `writer`, returning the number of lines written
pub fn write_json_lines<W, I>(writer: &mut W, samples: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = FlowSample>,
{
    let mut rows = 0;
    for sample in samples {
        serde_json::to_writer(&mut *writer, &JsonSample::from(sample))?;
        writeln!(writer)?;
        rows += 1;
    }
    Ok(rows)
}

/// Stream samples in the requested format
pub fn write_samples<W, I>(writer: &mut W, format: OutputFormat, samples: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = FlowSample>,
{
    match format {
        OutputFormat::Table => write_table(writer, samples),
        OutputFormat::Json => write_json_lines(writer, samples),
    }
}

/// Render a CSV table as a string (rows joined by `\n`, no trailing newline)
pub fn format_table<I>(samples: I) -> String
where
    I: IntoIterator<Item = FlowSample>,
{
    std::iter::once(TABLE_HEADER.to_string())
        .chain(samples.into_iter().map(|s| format_table_row(&s)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render JSON lines as a string (no trailing newline)
pub fn format_json<I>(samples: I) -> Result<String>
where
    I: IntoIterator<Item = FlowSample>,
{
    let lines = samples
        .into_iter()
        .map(|s| format_json_line(&s))
        .collect::<Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}
