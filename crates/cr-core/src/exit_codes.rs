//! Exit codes for the crisk CLI.
//!
//! Ranges:
//! - 0: success
//! - 10-19: user or environment errors (fixable by the caller)
//! - 20-29: internal, structural and I/O failures

use cr_common::Error;

/// Process exit codes. Stable contract for scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed.
    Ok = 0,

    /// Invalid arguments.
    ArgsError = 10,

    /// Configuration missing, malformed or inconsistent.
    ConfigError = 11,

    /// Evidence or query rejected.
    EvidenceError = 12,

    /// Structural or internal failure.
    InternalError = 20,

    /// I/O or persistence failure; learning state was not committed.
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Ok
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    /// Codes 20 and above.
    pub fn is_internal_error(self) -> bool {
        self.as_i32() >= 20
    }

    /// Name used in JSON error output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::EvidenceError => "ERR_EVIDENCE",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_)
            | Error::InvalidModel(_)
            | Error::InvalidPolicy(_)
            | Error::AdviceLookup { .. } => ExitCode::ConfigError,
            Error::Evidence(_) | Error::UnknownVariable { .. } => ExitCode::EvidenceError,
            Error::Structural(_) | Error::NumericalInstability(_) | Error::Json(_) => {
                ExitCode::InternalError
            }
            Error::Persistence(_) | Error::StateCorrupted(_) | Error::Io(_) => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Ok.as_i32(), 0);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::ConfigError.as_i32(), 11);
        assert_eq!(ExitCode::EvidenceError.as_i32(), 12);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
        assert_eq!(ExitCode::IoError.as_i32(), 21);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(ExitCode::from(&Error::evidence("x")), ExitCode::EvidenceError);
        assert_eq!(
            ExitCode::from(&Error::unknown_variable("X")),
            ExitCode::EvidenceError
        );
        assert_eq!(
            ExitCode::from(&Error::structural("cycle at A -> A")),
            ExitCode::InternalError
        );
        assert_eq!(
            ExitCode::from(&Error::Persistence("disk".into())),
            ExitCode::IoError
        );
        assert_eq!(
            ExitCode::from(&Error::AdviceLookup {
                factor: "Overworked".into()
            }),
            ExitCode::ConfigError
        );
    }

    #[test]
    fn test_categories() {
        assert!(ExitCode::Ok.is_success());
        assert!(ExitCode::EvidenceError.is_user_error());
        assert!(!ExitCode::IoError.is_user_error());
        assert!(ExitCode::IoError.is_internal_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::EvidenceError.to_string(), "ERR_EVIDENCE (12)");
    }
}
