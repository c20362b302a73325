//! Console error types

use crate::config::ParamSetError;

/// Console error with code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// E01: Unknown command
    UnknownCommand,
    /// E02: Invalid value format
    InvalidValue,
    /// E03: Missing required argument
    MissingArg,
    /// E04: Value out of allowed range
    OutOfRange,
    /// E05: Dangerous command requires 'confirm'
    RequiresConfirm,
    /// E06: NVS storage error
    NvsError,
    /// E07: Unknown parameter
    UnknownParam,
    /// E08: SDA and SCL on the same pin
    PinConflict,
    /// E09: Pin used by a UART, flash or USB
    PinReserved,
}

impl ConsoleError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "E01",
            Self::InvalidValue => "E02",
            Self::MissingArg => "E03",
            Self::OutOfRange => "E04",
            Self::RequiresConfirm => "E05",
            Self::NvsError => "E06",
            Self::UnknownParam => "E07",
            Self::PinConflict => "E08",
            Self::PinReserved => "E09",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "unknown command",
            Self::InvalidValue => "invalid value",
            Self::MissingArg => "missing argument",
            Self::OutOfRange => "out of range",
            Self::RequiresConfirm => "requires 'confirm'",
            Self::NvsError => "NVS error",
            Self::UnknownParam => "unknown parameter",
            Self::PinConflict => "SDA and SCL must differ",
            Self::PinReserved => "pin is reserved",
        }
    }
}

impl From<ParamSetError> for ConsoleError {
    fn from(e: ParamSetError) -> Self {
        match e {
            ParamSetError::OutOfRange => Self::OutOfRange,
            ParamSetError::TypeMismatch => Self::InvalidValue,
            ParamSetError::PinConflict => Self::PinConflict,
            ParamSetError::PinReserved => Self::PinReserved,
        }
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}
