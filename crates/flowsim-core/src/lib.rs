//! # flowsim Core
//!
//! Core types and utilities shared by the flowsim crates: the unified error
//! type, the flow sample model, printer status codes and lenient text input.

pub mod error;
pub mod io;
pub mod sample;
pub mod status;

pub use error::{ConnectionError, Error, InputError, Result, SimulationError};
pub use io::{LossyLines, SourceFile};
pub use sample::{round_decimals, FlowSample, EXTRUSION_EPSILON};
pub use status::{MachineStatus, PrintStatus};
