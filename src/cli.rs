//! Command-line interface
//!
//! `generate` turns G-code into flow samples (printed, or served over
//! WebSocket) and `extract-log` turns a firmware debug capture into a
//! replayable metrics CSV. Flags override values from `--config`.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use flowsim_communication::{
    CancellationToken, FrameIdentity, ReplaySettings, ServerConfig, TelemetryServer,
};
use flowsim_core::{SimulationError, SourceFile};
use flowsim_gcode::{generate_samples, stream_samples, OutputFormat};
use flowsim_logs::{extract_log_file, resolve_output_path, ExtractionStats};
use flowsim_settings::Config;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("BUILD_DATE"),
    ")"
);

/// Filament flow simulator for flow sensor firmware testing
#[derive(Debug, Parser)]
#[command(name = "flowsim", version, long_version = LONG_VERSION, about)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate flow samples from a G-code file
    Generate(GenerateArgs),
    /// Extract flow metrics from a firmware debug log
    ExtractLog(ExtractLogArgs),
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// G-code file to simulate
    pub gcode: PathBuf,

    /// Sampling window in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Maximum filament per sample in millimetres
    #[arg(long, value_name = "MM")]
    pub max_chunk_mm: Option<f64>,

    /// Emit retractions as negative samples
    #[arg(long)]
    pub include_retractions: bool,

    /// Output format: table or json
    #[arg(long, value_name = "FORMAT")]
    pub output: Option<OutputFormat>,

    /// Serve samples over WebSocket instead of printing them
    #[arg(long)]
    pub serve: bool,

    /// Bind host when serving
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port when serving
    #[arg(long)]
    pub port: Option<u16>,

    /// Loop the replay indefinitely
    #[arg(long)]
    pub repeat: bool,

    /// Replay speed multiplier
    #[arg(long)]
    pub speed: Option<f64>,
}

impl GenerateArgs {
    /// Overlay the flags onto `config`
    pub fn apply(&self, config: &mut Config) {
        let generator = &mut config.generator;
        if let Some(interval_ms) = self.interval_ms {
            generator.interval_ms = interval_ms;
        }
        if let Some(max_chunk_mm) = self.max_chunk_mm {
            generator.max_chunk_mm = max_chunk_mm;
        }
        if self.include_retractions {
            generator.include_retractions = true;
        }
        if let Some(output) = self.output {
            generator.output = output;
        }

        let server = &mut config.server;
        if let Some(host) = &self.host {
            server.host = host.clone();
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if self.repeat {
            server.repeat = true;
        }
        if let Some(speed) = self.speed {
            server.speed = speed;
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ExtractLogArgs {
    /// Debug log to extract
    pub input: Option<PathBuf>,

    /// Debug log to extract (used when no positional input is given)
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Output CSV file name, relative to the output directory
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'd', long = "outputdir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl ExtractLogArgs {
    /// Input path, positional first
    pub fn input_path(&self) -> Option<&Path> {
        self.input.as_deref().or(self.input_file.as_deref())
    }
}

/// Load `--config` (or defaults)
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Server parameters from resolved configuration
pub fn server_config(config: &Config) -> ServerConfig {
    let server = &config.server;
    ServerConfig {
        host: server.host.clone(),
        port: server.port,
        path: server.path.clone(),
        replay: ReplaySettings {
            repeat: server.repeat,
            speed: server.speed,
            identity: FrameIdentity {
                topic: server.topic.clone(),
                mainboard_id: server.mainboard_id.clone(),
            },
        },
    }
}

/// Write samples for `gcode` to `writer` in the configured format
///
/// Returns the number of samples written.
pub fn generate_to_writer<W: Write>(
    gcode: &Path,
    config: &Config,
    writer: &mut W,
) -> anyhow::Result<usize> {
    let source = SourceFile::new(gcode)?;
    let written = stream_samples(
        &source,
        config.generator.chunker_config(),
        config.generator.output,
        writer,
    )?;
    writer.flush()?;
    Ok(written)
}

/// Extract a debug log as directed by `args`
pub fn extract_log(
    args: &ExtractLogArgs,
    config: &Config,
) -> anyhow::Result<(PathBuf, ExtractionStats)> {
    let Some(input) = args.input_path() else {
        bail!("No input log given; pass it as an argument or with --input");
    };
    let output_dir = args
        .output_dir
        .as_deref()
        .unwrap_or(config.extractor.output_dir.as_path());

    let source = SourceFile::new(input)?;
    let output_path = resolve_output_path(input, args.output.as_deref(), output_dir);
    let stats = extract_log_file(&source, &output_path)
        .with_context(|| format!("Failed to extract {}", input.display()))?;
    Ok((output_path, stats))
}

async fn serve_samples(gcode: &Path, config: &Config) -> anyhow::Result<()> {
    let source = SourceFile::new(gcode)?;
    let generated = generate_samples(&source, config.generator.chunker_config())?;
    if generated.is_empty() {
        return Err(SimulationError::EmptySamples {
            source_name: source.path().display().to_string(),
        }
        .into());
    }
    eprintln!("Generated {} samples.", generated.len());

    let server = TelemetryServer::bind(server_config(config), generated.samples).await?;
    eprintln!("Serving on ws://{}{}", server.local_addr(), config.server.path);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Interrupt received"),
            Err(e) => {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
        }
        shutdown.cancel();
    });

    server.run(cancel).await?;
    Ok(())
}

/// Execute a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Generate(args) => {
            args.apply(&mut config);
            config.validate().context("Invalid generator settings")?;

            if args.serve {
                serve_samples(&args.gcode, &config).await
            } else {
                let mut stdout = BufWriter::new(std::io::stdout().lock());
                let written = generate_to_writer(&args.gcode, &config, &mut stdout)?;
                eprintln!("Generated {} samples.", written);
                Ok(())
            }
        }
        Command::ExtractLog(args) => {
            let (output_path, stats) = extract_log(&args, &config)?;
            println!("{}", stats);
            println!("Output saved to: {}", output_path.display());
            Ok(())
        }
    }
}
