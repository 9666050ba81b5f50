//! Configuration for the flow simulator
//!
//! Supports JSON and TOML files, selected by extension. Every section and
//! field has a default, so a file only needs to name what it changes.
//!
//! Configuration is organized into sections:
//! - Generator settings (tick size, chunk ceiling, retractions, output format)
//! - Server settings (bind address, endpoint, replay pacing, frame identity)
//! - Extractor settings (output directory)

use std::path::{Path, PathBuf};

use flowsim_gcode::{ChunkerConfig, OutputFormat, DEFAULT_INTERVAL_MS, DEFAULT_MAX_CHUNK_MM};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SettingsResult};

/// G-code sample generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Sampling window (ms)
    pub interval_ms: u64,
    /// Maximum filament emitted per sample (mm)
    pub max_chunk_mm: f64,
    /// Emit negative samples for retractions instead of skipping them
    pub include_retractions: bool,
    /// Output format when not serving
    pub output: OutputFormat,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            max_chunk_mm: DEFAULT_MAX_CHUNK_MM,
            include_retractions: false,
            output: OutputFormat::Table,
        }
    }
}

impl GeneratorSettings {
    /// Chunker parameters for these settings
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            interval_ms: self.interval_ms,
            max_chunk_mm: self.max_chunk_mm,
            include_retractions: self.include_retractions,
        }
    }
}

/// Telemetry replay server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// WebSocket endpoint path
    pub path: String,
    /// Loop the sample stream indefinitely
    pub repeat: bool,
    /// Replay speed multiplier
    pub speed: f64,
    /// `Topic` field of every frame
    pub topic: String,
    /// `MainboardID` field of every frame
    pub mainboard_id: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
            path: "/websocket".to_string(),
            repeat: false,
            speed: 1.0,
            topic: "status/simulator".to_string(),
            mainboard_id: "SIMULATOR".to_string(),
        }
    }
}

/// Log extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// Directory extracted CSV files are written to
    pub output_dir: PathBuf,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./condensed"),
        }
    }
}

/// Complete simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Sample generation
    pub generator: GeneratorSettings,
    /// Replay server
    pub server: ServerSettings,
    /// Log extraction
    pub extractor: ExtractorSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Json,
    Toml,
}

fn file_kind(path: &Path) -> SettingsResult<FileKind> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(FileKind::Json),
        Some("toml") => Ok(FileKind::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string()).into()),
    }
}

fn out_of_range(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let kind = file_kind(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match kind {
            FileKind::Json => serde_json::from_str(&content)?,
            FileKind::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match file_kind(path)? {
            FileKind::Json => serde_json::to_string_pretty(self)?,
            FileKind::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generator = &self.generator;
        if generator.interval_ms == 0 {
            return Err(out_of_range("generator.interval_ms", generator.interval_ms));
        }
        if !generator.max_chunk_mm.is_finite() || generator.max_chunk_mm <= 0.0 {
            return Err(out_of_range("generator.max_chunk_mm", generator.max_chunk_mm));
        }

        let server = &self.server;
        if server.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "server.host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !server.path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "server.path".to_string(),
                reason: format!("'{}' must start with '/'", server.path),
            });
        }
        if !server.speed.is_finite() || server.speed <= 0.0 {
            return Err(out_of_range("server.speed", server.speed));
        }

        Ok(())
    }
}
