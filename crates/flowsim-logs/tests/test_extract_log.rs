//! File-level tests for debug-log extraction

use std::fs;
use std::io::Write;

use flowsim_core::SourceFile;
use flowsim_logs::{extract_log_file, resolve_output_path, JamEvent, METRICS_HEADER};
use tempfile::TempDir;

const SOFT_SNAG_LOG: &str = "\
[1000] I (1000) main: print started
1764215000 Flow: win_exp=12.40 win_sns=12.10 deficit=0.30 | cumul=40.2 pulses=140 | thr=0.50 ratio=0.976 jam=0 hard=0.0 soft=0.0 pass=0.976 heap=181234
1764215001 Flow: win_exp=12.80 win_sns=9.20 deficit=3.60 | cumul=52.9 pulses=173 | thr=0.50 ratio=0.719 jam=0 hard=0.0 soft=45.0 pass=0.719 heap=181002
1764215002 Flow: win_exp=13.10 win_sns=4.05 deficit=9.05 | cumul=65.1 pul
1764215003 Filament jam detected (soft)
1764215003 Flow: win_exp=13.00 win_sns=3.90 deficit=9.10 | cumul=78.0 pulses=221 | thr=0.50 ratio=0.300 jam=1 hard=10.0 soft=100.0 pass=0.300 heap=180880
";

#[test]
fn test_extract_log_file_writes_csv() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("soft_snag.log");
    fs::write(&input_path, SOFT_SNAG_LOG).unwrap();

    let source = SourceFile::new(&input_path).unwrap();
    let output_path = resolve_output_path(&input_path, None, &dir.path().join("condensed"));
    let stats = extract_log_file(&source, &output_path).unwrap();

    assert_eq!(stats.lines_scanned, 6);
    assert_eq!(stats.records, 4);
    assert_eq!(stats.jam_events.get(&JamEvent::Soft), Some(&1));
    assert_eq!(output_path.file_name().unwrap(), "soft_snag.csv");

    let csv = fs::read_to_string(&output_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], METRICS_HEADER);
    assert_eq!(lines[1], "1764215000,12.40,12.10,0.30,0.976,0.0,0.0,0,13");
    assert_eq!(lines[2], "1764215001,12.80,9.20,3.60,0.719,0.0,45.0,0,13");
    assert_eq!(lines[3], "1764215002,13.10,4.05,9.05,0.000,0.0,0.0,0,13");
    assert_eq!(lines[4], "1764215003,13.00,3.90,9.10,0.300,10.0,100.0,1,13");
}

#[test]
fn test_log_with_no_flow_lines() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("boot.log");
    fs::write(&input_path, "boot\nwifi connected\nFlow: only noise\n").unwrap();

    let source = SourceFile::new(&input_path).unwrap();
    let output_path = dir.path().join("boot.csv");
    let stats = extract_log_file(&source, &output_path).unwrap();

    assert_eq!(stats.records, 0);
    assert_eq!(fs::read_to_string(&output_path).unwrap(), format!("{}\n", METRICS_HEADER));
}

#[test]
fn test_invalid_utf8_in_log() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("noisy.log");
    let mut file = fs::File::create(&input_path).unwrap();
    file.write_all(b"\xff\xfe\x00\n1764215000 Flow: win_exp=1.00 win_sns=0.90\n")
        .unwrap();
    drop(file);

    let source = SourceFile::new(&input_path).unwrap();
    let stats = extract_log_file(&source, &dir.path().join("noisy.csv")).unwrap();
    assert_eq!(stats.lines_scanned, 2);
    assert_eq!(stats.records, 1);
}

#[test]
fn test_missing_log_is_input_absent() {
    let err = SourceFile::new("/no/such/capture.log").unwrap_err();
    assert!(err.is_input_absent());
}
