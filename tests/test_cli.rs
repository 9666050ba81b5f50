use std::fs;

use clap::Parser;
use flowsim::cli::{self, Cli, Command};
use flowsim::{Config, OutputFormat};
use flowsim_core::SimulationError;
use tempfile::TempDir;

const GCODE: &str = "\
; generated by a slicer
M82
G92 E0
G1 X10 Y10 E2.5 ; first line
G1 X20 Y10 E5.0
G1 E4.2 F2400 ; retract
G1 E5.0
";

#[test]
fn test_generate_table_output() {
    let dir = TempDir::new().unwrap();
    let gcode = dir.path().join("part.gcode");
    fs::write(&gcode, GCODE).unwrap();

    let mut out = Vec::new();
    let written = cli::generate_to_writer(&gcode, &Config::default(), &mut out).unwrap();
    assert_eq!(written, 3);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "timestamp_ms,delta_mm,total_mm");
    assert_eq!(lines[1], "0,2.5000,2.5000");
    assert_eq!(lines[2], "250,2.5000,5.0000");
    assert_eq!(lines[3], "750,0.8000,5.8000");
}

#[test]
fn test_generate_json_output() {
    let dir = TempDir::new().unwrap();
    let gcode = dir.path().join("part.gcode");
    fs::write(&gcode, GCODE).unwrap();

    let mut config = Config::default();
    config.generator.output = OutputFormat::Json;
    config.generator.include_retractions = true;

    let mut out = Vec::new();
    let written = cli::generate_to_writer(&gcode, &config, &mut out).unwrap();
    assert_eq!(written, 4);

    let text = String::from_utf8(out).unwrap();
    let retraction: serde_json::Value = serde_json::from_str(text.lines().nth(2).unwrap()).unwrap();
    assert_eq!(retraction["PrintInfo"]["CurrentExtrusion"], -0.8);
}

#[test]
fn test_generate_missing_file_is_input_absent() {
    let dir = TempDir::new().unwrap();
    let err = cli::generate_to_writer(
        &dir.path().join("absent.gcode"),
        &Config::default(),
        &mut Vec::new(),
    )
    .unwrap_err();
    let err = err.downcast::<flowsim_core::Error>().unwrap();
    assert!(err.is_input_absent());
}

#[test]
fn test_extract_log_to_output_dir() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("normal_print.log");
    fs::write(
        &log,
        "1764214927 Flow: win_exp=10.00 win_sns=9.50 deficit=0.50 ratio=0.950 jam=0 hard=0.0 soft=5.0 pass=0.950\n",
    )
    .unwrap();
    let output_dir = dir.path().join("condensed");

    let cli = Cli::try_parse_from([
        "flowsim",
        "extract-log",
        log.to_str().unwrap(),
        "-d",
        output_dir.to_str().unwrap(),
    ])
    .unwrap();
    let Command::ExtractLog(args) = cli.command else {
        panic!("expected extract-log");
    };

    let (output_path, stats) = cli::extract_log(&args, &Config::default()).unwrap();
    assert_eq!(output_path, output_dir.join("normal_print.csv"));
    assert_eq!(stats.records, 1);

    let csv = fs::read_to_string(&output_path).unwrap();
    assert_eq!(
        csv.lines().nth(1),
        Some("1764214927,10.00,9.50,0.50,0.950,0.0,5.0,0,13")
    );
}

#[test]
fn test_extract_log_requires_input() {
    let cli = Cli::try_parse_from(["flowsim", "extract-log"]).unwrap();
    let Command::ExtractLog(args) = cli.command else {
        panic!("expected extract-log");
    };
    assert!(cli::extract_log(&args, &Config::default()).is_err());
}

#[test]
fn test_config_file_then_flag_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flowsim.toml");
    fs::write(&path, "[generator]\ninterval_ms = 100\nmax_chunk_mm = 1.0\n").unwrap();

    let mut config = cli::load_config(Some(&path)).unwrap();
    let cli = Cli::try_parse_from(["flowsim", "generate", "x.gcode", "--max-chunk-mm", "2.0"])
        .unwrap();
    let Command::Generate(args) = cli.command else {
        panic!("expected generate");
    };
    args.apply(&mut config);

    assert_eq!(config.generator.interval_ms, 100);
    assert_eq!(config.generator.max_chunk_mm, 2.0);
}

#[tokio::test]
async fn test_serving_without_extrusion_fails() {
    let dir = TempDir::new().unwrap();
    let gcode = dir.path().join("travel_only.gcode");
    fs::write(&gcode, "G28\nG1 X10 Y10 F3000\n").unwrap();

    let cli = Cli::try_parse_from([
        "flowsim",
        "generate",
        gcode.to_str().unwrap(),
        "--serve",
        "--host",
        "127.0.0.1",
        "--port",
        "0",
    ])
    .unwrap();

    let err = cli::run(cli).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SimulationError>(),
        Some(SimulationError::EmptySamples { .. })
    ));
}

#[tokio::test]
async fn test_invalid_flag_value_fails_validation() {
    let cli = Cli::try_parse_from(["flowsim", "generate", "x.gcode", "--max-chunk-mm", "0"])
        .unwrap();
    assert!(cli::run(cli).await.is_err());
}
