//! Error handling for flowsim
//!
//! Provides error types for every layer of the simulator:
//! - Input errors (missing or unreadable source files)
//! - Simulation errors (invalid chunking/replay parameters, empty sample sets)
//! - Connection errors (listener and WebSocket client failures)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Input error type
///
/// Raised when a G-code or debug-log source cannot be opened. These are the
/// only fatal input conditions; malformed lines inside a readable source are
/// skipped rather than reported.
#[derive(Error, Debug, Clone)]
pub enum InputError {
    /// The source file does not exist
    #[error("Source file not found: {path}")]
    SourceNotFound {
        /// The path that was requested.
        path: String,
    },

    /// The source path exists but is not a regular file
    #[error("Path is not a file: {path}")]
    NotAFile {
        /// The offending path.
        path: String,
    },

    /// The source file exists but could not be opened
    #[error("Failed to open {path}: {reason}")]
    Unreadable {
        /// The path that failed to open.
        path: String,
        /// The underlying reason.
        reason: String,
    },
}

/// Simulation error type
///
/// Represents invalid parameters for the chunker or replay scheduler, and the
/// empty-result condition when serving is requested.
#[derive(Error, Debug, Clone)]
pub enum SimulationError {
    /// A tuning parameter is outside its valid range
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// No samples were produced but a replay was requested
    #[error("No extrusion moves found in {source_name}")]
    EmptySamples {
        /// Human-readable name of the source that produced nothing.
        source_name: String,
    },
}

/// Connection error type
///
/// Represents errors from the telemetry listener and its WebSocket clients.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// The listener could not bind its address
    #[error("Failed to bind {address}: {reason}")]
    BindFailed {
        /// The address that was requested.
        address: String,
        /// The reason the bind failed.
        reason: String,
    },

    /// The WebSocket upgrade handshake failed
    #[error("WebSocket handshake failed: {reason}")]
    HandshakeFailed {
        /// The reason for the failure.
        reason: String,
    },

    /// A frame could not be delivered to the client
    #[error("Failed to send frame: {reason}")]
    SendFailed {
        /// The reason for the failure.
        reason: String,
    },

    /// The client closed the connection
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },
}

/// Main error type for flowsim
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Input error
    #[error(transparent)]
    Input(#[from] InputError),

    /// Simulation error
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid-parameter error
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Simulation(SimulationError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        })
    }

    /// Check if this error means the requested input does not exist
    pub fn is_input_absent(&self) -> bool {
        matches!(
            self,
            Error::Input(InputError::SourceNotFound { .. } | InputError::NotAFile { .. })
        )
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this error reports an empty sample set
    pub fn is_empty_samples(&self) -> bool {
        matches!(self, Error::Simulation(SimulationError::EmptySamples { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
