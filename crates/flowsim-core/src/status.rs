//! Printer status codes
//!
//! Numeric codes used by the printer's status protocol. The simulator only
//! reports an active print.

/// `Status.PrintInfo.Status` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrintStatus {
    /// Job actively printing
    Printing,
}

impl PrintStatus {
    /// Wire code for this status
    pub fn code(self) -> u8 {
        match self {
            Self::Printing => 13,
        }
    }
}

/// `Status.CurrentStatus` entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineStatus {
    /// Executing a print task
    Printing,
}

impl MachineStatus {
    /// Wire code for this status
    pub fn code(self) -> u8 {
        match self {
            Self::Printing => 1,
        }
    }
}
