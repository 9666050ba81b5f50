//! Extrusion extraction and positioning-mode tracking
//!
//! Only the extrusion axis is interpreted. Motion, feed rates and tool changes
//! are ignored; the extractor only needs to know how far the filament moved on
//! each `G0`/`G1` and whether that coordinate was absolute or relative.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::OnceLock;

use flowsim_core::{LossyLines, Result, SourceFile, EXTRUSION_EPSILON};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Commands that affect extrusion bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrusionCommand {
    /// `G90` / `M82`
    AbsoluteMode,
    /// `G91` / `M83`
    RelativeMode,
    /// `G92`
    SetPosition,
    /// `G0` / `G1`
    Move,
    /// Anything else
    Other,
}

impl ExtrusionCommand {
    /// Classify the command token of a line
    ///
    /// Tokens are matched exactly; `g1` is not a move.
    pub fn from_token(token: &str) -> Self {
        match token {
            "G90" | "M82" => Self::AbsoluteMode,
            "G91" | "M83" => Self::RelativeMode,
            "G92" => Self::SetPosition,
            "G0" | "G1" => Self::Move,
            _ => Self::Other,
        }
    }
}

/// Extract the first `E` word value from a fragment of G-code
///
/// Returns `None` when there is no `E` word or its value does not parse to a
/// finite number.
pub fn extract_extrusion_value(text: &str) -> Option<f64> {
    static E_WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = E_WORD_REGEX
        .get_or_init(|| Regex::new(r"[Ee]([+-]?\d*\.?\d+)").expect("invalid regex pattern"));

    let value = regex.captures(text)?.get(1)?.as_str().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Strip the `;` comment from a line and trim surrounding whitespace
pub fn strip_comment(line: &str) -> &str {
    line.split(';').next().unwrap_or_default().trim()
}

/// Extrusion parse state
///
/// Tracks the extruder positioning mode and the last absolute `E`
/// coordinate seen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionState {
    /// Whether `E` words are absolute coordinates (`M82`/`G90`)
    pub absolute_mode: bool,
    /// Last absolute extruder coordinate (mm)
    pub last_e: f64,
}

impl Default for ExtrusionState {
    fn default() -> Self {
        Self {
            absolute_mode: true,
            last_e: 0.0,
        }
    }
}

impl ExtrusionState {
    /// Create a new state with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one raw G-code line, returning the extrusion delta it produces
    ///
    /// Deltas with a magnitude at or below [`EXTRUSION_EPSILON`] are dropped.
    pub fn apply_line(&mut self, line: &str) -> Option<f64> {
        let stripped = strip_comment(line);
        let mut parts = stripped.splitn(2, char::is_whitespace);
        let token = parts.next().filter(|t| !t.is_empty())?;
        let rest = parts.next().unwrap_or_default();

        match ExtrusionCommand::from_token(token) {
            ExtrusionCommand::AbsoluteMode => {
                self.absolute_mode = true;
                None
            }
            ExtrusionCommand::RelativeMode => {
                self.absolute_mode = false;
                None
            }
            ExtrusionCommand::SetPosition => {
                if let Some(value) = extract_extrusion_value(rest) {
                    self.last_e = value;
                }
                None
            }
            ExtrusionCommand::Move => {
                let value = extract_extrusion_value(rest)?;
                let delta = if self.absolute_mode {
                    let delta = value - self.last_e;
                    self.last_e = value;
                    delta
                } else {
                    value
                };
                (delta.abs() > EXTRUSION_EPSILON).then_some(delta)
            }
            ExtrusionCommand::Other => None,
        }
    }
}

/// Counters collected while extracting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Lines read from the source
    pub lines_read: u64,
    /// Lines carrying a command after comment stripping
    pub commands: u64,
    /// Extrusion deltas emitted
    pub deltas: u64,
}

/// Lazy extrusion-delta iterator over a G-code source
///
/// The iterator is forward-only; create a new extractor to walk the source
/// again. An I/O failure ends iteration early and is reported by
/// [`ExtrusionExtractor::finish`].
pub struct ExtrusionExtractor<R> {
    lines: LossyLines<R>,
    state: ExtrusionState,
    stats: ExtractStats,
    error: Option<io::Error>,
}

impl ExtrusionExtractor<BufReader<File>> {
    /// Open a G-code file for extraction
    pub fn from_source(source: &SourceFile) -> Result<Self> {
        Ok(Self::new(source.open()?))
    }
}

impl<'a> ExtrusionExtractor<&'a [u8]> {
    /// Extract from in-memory G-code text
    pub fn from_text(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<R: BufRead> ExtrusionExtractor<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: LossyLines::new(reader),
            state: ExtrusionState::default(),
            stats: ExtractStats::default(),
            error: None,
        }
    }

    /// Current parse state
    pub fn state(&self) -> ExtrusionState {
        self.state
    }

    /// Counters so far
    pub fn stats(&self) -> ExtractStats {
        self.stats
    }

    /// Consume the extractor, surfacing any I/O error that ended iteration
    pub fn finish(self) -> Result<ExtractStats> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.stats),
        }
    }
}

impl<R: BufRead> Iterator for ExtrusionExtractor<R> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.error.is_some() {
            return None;
        }

        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!("G-code read failed after {} lines: {}", self.stats.lines_read, err);
                    self.error = Some(err);
                    return None;
                }
            };
            self.stats.lines_read += 1;

            if strip_comment(&line).is_empty() {
                continue;
            }
            self.stats.commands += 1;

            if let Some(delta) = self.state.apply_line(&line) {
                self.stats.deltas += 1;
                return Some(delta);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deltas(text: &str) -> Vec<f64> {
        ExtrusionExtractor::from_text(text).collect()
    }

    #[test]
    fn test_extract_value() {
        assert_eq!(extract_extrusion_value("X10 Y5 E1.25"), Some(1.25));
        assert_eq!(extract_extrusion_value("X10 e-.5"), Some(-0.5));
        assert_eq!(extract_extrusion_value("X10 E+3"), Some(3.0));
        assert_eq!(extract_extrusion_value("X10 Y5 F1200"), None);
        assert_eq!(extract_extrusion_value("X10 E"), None);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(extract_extrusion_value("E1 E2"), Some(1.0));
    }

    #[test]
    fn test_command_classification() {
        assert_eq!(ExtrusionCommand::from_token("M82"), ExtrusionCommand::AbsoluteMode);
        assert_eq!(ExtrusionCommand::from_token("G91"), ExtrusionCommand::RelativeMode);
        assert_eq!(ExtrusionCommand::from_token("G92"), ExtrusionCommand::SetPosition);
        assert_eq!(ExtrusionCommand::from_token("G1"), ExtrusionCommand::Move);
        assert_eq!(ExtrusionCommand::from_token("g1"), ExtrusionCommand::Other);
        assert_eq!(ExtrusionCommand::from_token("G2"), ExtrusionCommand::Other);
        assert_eq!(ExtrusionCommand::from_token("M104"), ExtrusionCommand::Other);
    }

    #[test]
    fn test_set_position_then_absolute_move() {
        assert_eq!(deltas("G92 E0\nG1 E5\n"), vec![5.0]);
    }

    #[test]
    fn test_repeated_absolute_move_is_suppressed() {
        assert_eq!(deltas("G1 E5\nG1 E5\n"), vec![5.0]);
    }

    #[test]
    fn test_relative_mode() {
        assert_eq!(deltas("M83\nG1 X1 E0.5\nG1 X2 E-0.8\n"), vec![0.5, -0.8]);
    }

    #[test]
    fn test_mode_switching() {
        let out = deltas("G1 E2\nM83\nG1 E1\nM82\nG1 E4\n");
        assert_eq!(out, vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_set_position_emits_nothing() {
        let mut state = ExtrusionState::new();
        assert_eq!(state.apply_line("G92 E12.5"), None);
        assert_eq!(state.last_e, 12.5);
        assert_eq!(state.apply_line("G92 X0"), None);
        assert_eq!(state.last_e, 12.5);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let out = deltas("; header E99\n\n   \nG1 E1 ; prime E50\n");
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let out = deltas("G1 E\nG1 Efoo\n#!@\nG1 E3\n");
        assert_eq!(out, vec![3.0]);
    }

    #[test]
    fn test_unrelated_commands_ignored() {
        let out = deltas("M104 S200\nG28\nT0\nG1 X5 Y5\nG1 E1\n");
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_stats() {
        let mut extractor = ExtrusionExtractor::from_text("; c\nG1 E1\nG1 E1\nM83\n");
        let collected: Vec<f64> = extractor.by_ref().collect();
        assert_eq!(collected, vec![1.0]);
        let stats = extractor.finish().unwrap();
        assert_eq!(stats.lines_read, 4);
        assert_eq!(stats.commands, 3);
        assert_eq!(stats.deltas, 1);
    }

    #[test]
    fn test_lowercase_commands_ignored() {
        let mut state = ExtrusionState::new();
        assert_eq!(state.apply_line("m83"), None);
        assert!(state.absolute_mode);
        assert_eq!(deltas("g1 E5
m83
G1 E2
"), vec![2.0]);
    }
}
