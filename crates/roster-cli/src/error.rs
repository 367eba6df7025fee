//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use roster_core::{FailureKind, RequestFailure};
use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from roster-core library
    #[error("Core error: {0}")]
    Core(#[from] roster_core::Error),

    /// A backend call failed
    #[error("{0}")]
    Request(#[from] RequestFailure),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {} format", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// No way to obtain an access token
    #[error("Access token required. Set via --token, ROSTER_ACCESS_TOKEN, or auth.token_command in the config file")]
    TokenMissing,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(_) => 2,
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::InvalidArgs(_) => 6,
            Self::TokenMissing => 7,
            Self::Request(failure) => match failure.kind() {
                FailureKind::Credential => 20,
                FailureKind::Transport => 21,
                FailureKind::Authentication => 22,
                FailureKind::Application => 23,
            },
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Other { .. } => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidArgs(_))
    }
}

/// Format an error for display to the user
///
/// Backend failures are rendered from their normalized record so that
/// every kind reads the same: status, message, then details.
pub fn format_error(error: &Error, use_color: bool) -> String {
    use colored::Colorize;

    if let Error::Request(failure) = error {
        let record = failure.to_record();
        let heading = format!("Error {}", record.status);
        let heading = if use_color {
            heading.red().bold().to_string()
        } else {
            heading
        };

        let mut out = format!("{}: {}", heading, record.message);
        if let Some(code) = &record.error {
            out.push_str(&format!(" ({})", code));
        }
        if let Some(details) = &record.details {
            let rendered = serde_json::to_string_pretty(details).unwrap_or_else(|_| details.to_string());
            out.push_str(&format!("\nDetails: {}", rendered));
        }
        return out;
    }

    if use_color {
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    }
}
