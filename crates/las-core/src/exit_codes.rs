//! Exit codes for the las-core CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.

use las_common::Error;

/// Exit codes for las-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Configuration error
    ConfigError = 10,

    /// Malformed batch or inconsistent input
    InputError = 11,

    /// Numerical failure inside a round
    NumericalError = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.code() {
            10..=19 => ExitCode::ConfigError,
            20..=29 => ExitCode::InputError,
            30..=39 => ExitCode::NumericalError,
            60..=61 => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes_map_to_codes() {
        assert_eq!(ExitCode::from(&Error::Config("x".into())), ExitCode::ConfigError);
        assert_eq!(
            ExitCode::from(&Error::InvalidBatch("x".into())),
            ExitCode::InputError
        );
        assert_eq!(
            ExitCode::from(&Error::NumericalInstability("x".into())),
            ExitCode::NumericalError
        );
        assert_eq!(
            ExitCode::from(&Error::ThreadPool("x".into())),
            ExitCode::InternalError
        );
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::IoError.is_error());
    }
}
