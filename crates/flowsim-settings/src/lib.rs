//! flowsim Settings Crate
//!
//! Handles simulator configuration files and their validation.

pub mod config;
pub mod error;

pub use config::{Config, ExtractorSettings, GeneratorSettings, ServerSettings};
pub use error::{ConfigError, SettingsError, SettingsResult};
