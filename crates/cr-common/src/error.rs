//! Error types for concentration risk inference.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Propagation
//!
//! - `Structural` errors come from network construction and abort startup.
//! - `Evidence`, `UnknownVariable` and `AdviceLookup` are per-request and
//!   never touch persisted state.
//! - `Persistence` means a learning update did NOT durably commit; callers
//!   must not acknowledge the feedback.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 30,
//!   "category": "request",
//!   "message": "evidence error: unknown variable 'Caffeine'",
//!   "recoverable": true,
//!   "suggested_action": "fix_input"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for concentration risk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors (model, policy, schema).
    Config,
    /// Malformed network structure or tables.
    Model,
    /// Per-request input errors (evidence, target, advice lookup).
    Request,
    /// Learning store persistence errors.
    Learning,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Request => write!(f, "request"),
            ErrorCategory::Learning => write!(f, "learning"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for agents to take in response to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation (possibly with backoff).
    Retry,
    /// Reset configuration to defaults.
    ResetConfig,
    /// Run validation/check command.
    RunCheck,
    /// Correct the request input and resend.
    FixInput,
    /// Abort the operation.
    Abort,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::Abort => write!(f, "abort"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for concentration risk inference.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid model file: {0}")]
    InvalidModel(String),

    #[error("invalid policy file: {0}")]
    InvalidPolicy(String),

    // Model structure errors (20-29)
    #[error("structural error: {0}")]
    Structural(String),

    // Request errors (30-39)
    #[error("evidence error: {0}")]
    Evidence(String),

    #[error("unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("no advice configured for actionable factor '{factor}'")]
    AdviceLookup { factor: String },

    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    // Learning / persistence errors (40-49)
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("learning state corrupted: {0}")]
    StateCorrupted(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an evidence error.
    pub fn evidence(message: impl Into<String>) -> Self {
        Error::Evidence(message.into())
    }

    /// Shorthand for a structural error.
    pub fn structural(message: impl Into<String>) -> Self {
        Error::Structural(message.into())
    }

    /// Shorthand for an unknown variable error.
    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Error::UnknownVariable { name: name.into() }
    }

    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Model structure errors
    /// - 30-39: Request errors
    /// - 40-49: Learning / persistence errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidModel(_) => 11,
            Error::InvalidPolicy(_) => 12,
            Error::Structural(_) => 20,
            Error::Evidence(_) => 30,
            Error::UnknownVariable { .. } => 31,
            Error::AdviceLookup { .. } => 32,
            Error::NumericalInstability(_) => 33,
            Error::Persistence(_) => 40,
            Error::StateCorrupted(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidModel(_) | Error::InvalidPolicy(_) => {
                ErrorCategory::Config
            }
            Error::Structural(_) => ErrorCategory::Model,
            Error::Evidence(_)
            | Error::UnknownVariable { .. }
            | Error::AdviceLookup { .. }
            | Error::NumericalInstability(_) => ErrorCategory::Request,
            Error::Persistence(_) | Error::StateCorrupted(_) => ErrorCategory::Learning,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Config errors: recoverable by fixing/resetting config
            Error::Config(_) => true,
            Error::InvalidModel(_) => true,
            Error::InvalidPolicy(_) => true,

            // A malformed network must never serve
            Error::Structural(_) => false,

            // Request errors: resend with corrected input
            Error::Evidence(_) => true,
            Error::UnknownVariable { .. } => true,
            Error::AdviceLookup { .. } => true,
            Error::NumericalInstability(_) => false,

            // Persistence: the update did not commit, retry is safe
            Error::Persistence(_) => true,
            Error::StateCorrupted(_) => false,

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns the suggested action for agents.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidModel(_) => SuggestedAction::ResetConfig,
            Error::InvalidPolicy(_) => SuggestedAction::ResetConfig,

            Error::Structural(_) => SuggestedAction::Abort,

            Error::Evidence(_) => SuggestedAction::FixInput,
            Error::UnknownVariable { .. } => SuggestedAction::FixInput,
            Error::AdviceLookup { .. } => SuggestedAction::RunCheck,
            Error::NumericalInstability(_) => SuggestedAction::ManualIntervention,

            Error::Persistence(_) => SuggestedAction::Retry,
            Error::StateCorrupted(_) => SuggestedAction::ManualIntervention,

            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Run 'crisk check' to validate configuration, or check syntax in config files."
            }
            Error::InvalidModel(_) => {
                "Run 'crisk check' to locate the bad node, or remove model.json to use the builtin model."
            }
            Error::InvalidPolicy(_) => {
                "Run 'crisk check' to validate, or remove policy.json to use the builtin policy."
            }

            Error::Structural(_) => {
                "The network is malformed (cycle, scope mismatch or non-normalized table). Fix model.json; nothing was served."
            }

            Error::Evidence(_) => {
                "Check observation names against 'crisk check' output and use true/false values."
            }
            Error::UnknownVariable { .. } => {
                "The requested variable is not part of the model. Use a declared node name."
            }
            Error::AdviceLookup { .. } => {
                "Every actionable factor needs advice text in policy.json."
            }
            Error::NumericalInstability(_) => {
                "Internal numerical issue. Report with the model and evidence that triggered it."
            }

            Error::Persistence(_) => {
                "The feedback was NOT recorded. Check that the state directory is writable and retry."
            }
            Error::StateCorrupted(_) => {
                "The learning state file is unreadable. Restore it from backup or delete it to restart from the prior."
            }

            Error::Io(_) => {
                "Check disk space, permissions, and that config directories exist. Retry the operation."
            }
            Error::Json(_) => {
                "Invalid JSON in file. Check syntax with 'jq . <file>' or restore from backup."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidModel(_) => "Invalid Model Configuration",
            Error::InvalidPolicy(_) => "Invalid Policy Configuration",
            Error::Structural(_) => "Malformed Network",
            Error::Evidence(_) => "Invalid Evidence",
            Error::UnknownVariable { .. } => "Unknown Variable",
            Error::AdviceLookup { .. } => "Missing Advice",
            Error::NumericalInstability(_) => "Numerical Instability",
            Error::Persistence(_) => "Learning Update Not Saved",
            Error::StateCorrupted(_) => "Learning State Corrupted",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for agents.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., variable name).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::UnknownVariable { name } => {
                context.insert("variable".to_string(), serde_json::json!(name));
            }
            Error::AdviceLookup { factor } => {
                context.insert("factor".to_string(), serde_json::json!(factor));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
