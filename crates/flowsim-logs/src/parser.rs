//! Parsing of free-text firmware debug lines
//!
//! The verbose flow line looks like
//!
//! ```text
//! 1764214927 Flow: win_exp=10.00 win_sns=9.50 deficit=0.50 | cumul=120.4 pulses=410 | thr=0.50 ratio=0.950 jam=0 hard=0.0 soft=5.0 pass=0.950 heap=181234
//! ```
//!
//! Serial captures are frequently truncated mid-line, so every field is
//! searched for independently and only the two window totals are required.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Marker that identifies a flow data line
pub const FLOW_MARKER: &str = "Flow:";

/// Marker that identifies a jam detection event
pub const JAM_MARKER: &str = "Filament jam detected";

/// Fields recovered from one `Flow:` line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowLine {
    /// `win_exp=`
    pub expected: f64,
    /// `win_sns=`
    pub actual: f64,
    /// `deficit=`
    pub deficit: Option<f64>,
    /// `ratio=`
    pub ratio: Option<f64>,
    /// `jam=`, default 0
    pub jam_state: u32,
    /// `hard=`, default 0.0
    pub hard_pct: f64,
    /// `soft=`, default 0.0
    pub soft_pct: f64,
    /// `pass=`, falling back to `ratio=`, then 0.0
    pub pass_ratio: f64,
}

/// Kind of jam announced by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JamEvent {
    /// Both detectors tripped
    HardAndSoft,
    /// Hard (sudden stop) detector
    Hard,
    /// Soft (gradual under-extrusion) detector
    Soft,
}

impl fmt::Display for JamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardAndSoft => write!(f, "hard+soft"),
            Self::Hard => write!(f, "hard"),
            Self::Soft => write!(f, "soft"),
        }
    }
}

fn field_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("invalid regex pattern"))
}

fn capture<'a>(regex: &Regex, line: &'a str) -> Option<&'a str> {
    Some(regex.captures(line)?.get(1)?.as_str())
}

fn float_field(regex: &Regex, line: &str) -> Option<f64> {
    capture(regex, line)?.parse::<f64>().ok()
}

/// Extract the timestamp that leads a log line
///
/// Accepts a bare integer of at least 10 digits followed by whitespace (or
/// the end of the line), or a bracketed integer such as `[12345]`.
pub fn extract_timestamp(line: &str) -> Option<u64> {
    static RAW: OnceLock<Regex> = OnceLock::new();
    static BRACKETED: OnceLock<Regex> = OnceLock::new();

    let raw = field_regex(&RAW, r"^(\d{10,})(?:\s|$)");
    if let Some(ts) = capture(raw, line).and_then(|s| s.parse::<u64>().ok()) {
        return Some(ts);
    }

    let bracketed = field_regex(&BRACKETED, r"^\[(\d+)\]");
    capture(bracketed, line).and_then(|s| s.parse::<u64>().ok())
}

/// Parse a `Flow:` line
///
/// Returns `None` when the line is not a flow line or lacks a parseable
/// `win_exp=` or `win_sns=` value. Optional fields that fail to parse are
/// treated as absent.
pub fn parse_flow_line(line: &str) -> Option<FlowLine> {
    static WIN_EXP: OnceLock<Regex> = OnceLock::new();
    static WIN_SNS: OnceLock<Regex> = OnceLock::new();
    static DEFICIT: OnceLock<Regex> = OnceLock::new();
    static RATIO: OnceLock<Regex> = OnceLock::new();
    static JAM: OnceLock<Regex> = OnceLock::new();
    static HARD: OnceLock<Regex> = OnceLock::new();
    static SOFT: OnceLock<Regex> = OnceLock::new();
    static PASS: OnceLock<Regex> = OnceLock::new();

    if !line.contains(FLOW_MARKER) {
        return None;
    }

    let expected = float_field(field_regex(&WIN_EXP, r"win_exp=([\d.]+)"), line)?;
    let actual = float_field(field_regex(&WIN_SNS, r"win_sns=([\d.]+)"), line)?;

    let deficit = float_field(field_regex(&DEFICIT, r"deficit=([\d.]+)"), line);
    let ratio = float_field(field_regex(&RATIO, r"ratio=([\d.]+)"), line);
    let jam_state = capture(field_regex(&JAM, r"jam=(\d+)"), line)
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);
    let hard_pct = float_field(field_regex(&HARD, r"hard=([\d.]+)"), line).unwrap_or(0.0);
    let soft_pct = float_field(field_regex(&SOFT, r"soft=([\d.]+)"), line).unwrap_or(0.0);
    let pass_ratio = float_field(field_regex(&PASS, r"pass=([\d.]+)"), line)
        .or(ratio)
        .unwrap_or(0.0);

    Some(FlowLine {
        expected,
        actual,
        deficit,
        ratio,
        jam_state,
        hard_pct,
        soft_pct,
        pass_ratio,
    })
}

/// Classify a jam announcement line
pub fn detect_jam_event(line: &str) -> Option<JamEvent> {
    if !line.contains(JAM_MARKER) {
        return None;
    }

    let lower = line.to_lowercase();
    if lower.contains("hard+soft") {
        Some(JamEvent::HardAndSoft)
    } else if lower.contains("hard") {
        Some(JamEvent::Hard)
    } else if lower.contains("soft") {
        Some(JamEvent::Soft)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_LINE: &str = "1764214927 Flow: win_exp=10.00 win_sns=9.50 deficit=0.50 ratio=0.950 jam=0 hard=0.0 soft=5.0 pass=0.950";

    #[test]
    fn test_full_line() {
        let flow = parse_flow_line(FULL_LINE).unwrap();
        assert_eq!(flow.expected, 10.0);
        assert_eq!(flow.actual, 9.5);
        assert_eq!(flow.deficit, Some(0.5));
        assert_eq!(flow.ratio, Some(0.95));
        assert_eq!(flow.jam_state, 0);
        assert_eq!(flow.hard_pct, 0.0);
        assert_eq!(flow.soft_pct, 5.0);
        assert_eq!(flow.pass_ratio, 0.95);
    }

    #[test]
    fn test_missing_mandatory_fields() {
        assert!(parse_flow_line("Flow: win_sns=9.50 deficit=0.50").is_none());
        assert!(parse_flow_line("Flow: win_exp=10.00 deficit=0.50").is_none());
        assert!(parse_flow_line("win_exp=10.00 win_sns=9.50").is_none());
    }

    #[test]
    fn test_unparseable_mandatory_field_skips_line() {
        assert!(parse_flow_line("Flow: win_exp=1.2.3 win_sns=9.50").is_none());
    }

    #[test]
    fn test_truncated_line_defaults() {
        let flow = parse_flow_line("[5000] Flow: win_exp=4.20 win_sns=4.10 def").unwrap();
        assert_eq!(flow.deficit, None);
        assert_eq!(flow.ratio, None);
        assert_eq!(flow.jam_state, 0);
        assert_eq!(flow.hard_pct, 0.0);
        assert_eq!(flow.soft_pct, 0.0);
        assert_eq!(flow.pass_ratio, 0.0);
    }

    #[test]
    fn test_pass_falls_back_to_ratio() {
        let flow = parse_flow_line("Flow: win_exp=4.0 win_sns=3.0 ratio=0.750 jam=1").unwrap();
        assert_eq!(flow.pass_ratio, 0.75);
        assert_eq!(flow.jam_state, 1);
    }

    #[test]
    fn test_bad_optional_field_is_absent() {
        let flow = parse_flow_line("Flow: win_exp=4.0 win_sns=3.0 hard=1..2 soft=3.5").unwrap();
        assert_eq!(flow.hard_pct, 0.0);
        assert_eq!(flow.soft_pct, 3.5);
    }

    #[test]
    fn test_extract_timestamp() {
        assert_eq!(extract_timestamp(FULL_LINE), Some(1764214927));
        assert_eq!(extract_timestamp("[12345] Flow: x"), Some(12345));
        assert_eq!(extract_timestamp("1764214927"), Some(1764214927));
        assert_eq!(extract_timestamp("123456789 Flow:"), None);
        assert_eq!(extract_timestamp("I (123) Flow:"), None);
        assert_eq!(extract_timestamp(" 1764214927 Flow:"), None);
    }

    #[test]
    fn test_detect_jam_event() {
        assert_eq!(
            detect_jam_event("Filament jam detected (HARD+SOFT)"),
            Some(JamEvent::HardAndSoft)
        );
        assert_eq!(detect_jam_event("Filament jam detected: hard"), Some(JamEvent::Hard));
        assert_eq!(detect_jam_event("Filament jam detected: soft"), Some(JamEvent::Soft));
        assert_eq!(detect_jam_event("Filament jam detected"), None);
        assert_eq!(detect_jam_event("jam hard"), None);
        assert_eq!(JamEvent::HardAndSoft.to_string(), "hard+soft");
    }
}
