//! Logging setup for the roster CLI
//!
//! This module provides:
//! - Session ID generation and tracking
//! - Credential redaction for anything echoed to the terminal
//! - Operation timing spans
//! - Subscriber setup (compact, full, json; stderr or a log file)

use crate::config;
use crate::error::{Error, Result};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{field, Span};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Session ID for this invocation
static SESSION_ID: OnceLock<String> = OnceLock::new();

/// Effective logging settings
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Log level filter
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Optional file output path
    pub file: Option<PathBuf>,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Include file and line numbers
    pub source_location: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line events
    Compact,
    /// Full format with all details
    Full,
    /// JSON structured format
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "full" => Some(Self::Full),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            file: None,
            thread_ids: false,
            source_location: false,
        }
    }
}

impl LogSettings {
    /// Settings implied by the `-v` count
    pub fn from_verbosity(verbosity: u8) -> Self {
        let mut settings = Self::default();

        match verbosity {
            0 => {}
            1 => settings.level = "info".to_string(),
            2 => {
                settings.level = "debug".to_string();
                settings.source_location = true;
            }
            _ => {
                settings.level = "trace".to_string();
                settings.format = LogFormat::Full;
                settings.source_location = true;
                settings.thread_ids = true;
            }
        }

        settings
    }

    /// Apply the config file's logging section
    ///
    /// The file only raises verbosity; `-v` flags are never quietened by it.
    pub fn merge_with_file(&mut self, file: &config::LoggingConfig) {
        if level_rank(&file.level) > level_rank(&self.level) {
            self.level = file.level.clone();
        }
        if let Some(format) = LogFormat::parse(&file.format) {
            if self.format == LogFormat::Compact {
                self.format = format;
            }
        }
        if file.file.is_some() {
            self.file = file.file.clone();
        }
    }

    /// Apply environment overrides
    pub fn merge_with_env(&mut self) {
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            self.level = rust_log;
        }

        if let Ok(format) = std::env::var("ROSTER_LOG_FORMAT") {
            match LogFormat::parse(&format) {
                Some(format) => self.format = format,
                None => eprintln!("Warning: invalid ROSTER_LOG_FORMAT '{}', using default", format),
            }
        }

        if let Ok(file) = std::env::var("ROSTER_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
    }
}

fn level_rank(level: &str) -> u8 {
    match level.to_lowercase().as_str() {
        "error" => 1,
        "warn" => 2,
        "info" => 3,
        "debug" => 4,
        "trace" => 5,
        _ => 0,
    }
}

/// Initialize the global subscriber
pub fn init_logging(settings: LogSettings) -> Result<()> {
    let env_filter = create_env_filter(&settings)?;

    let (writer, ansi) = match &settings.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| Error::config(format!("invalid log file path {}", path.display())))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            (BoxMakeWriter::new(appender), false)
        }
        None => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        ),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(settings.thread_ids)
        .with_file(settings.source_location)
        .with_line_number(settings.source_location);

    let installed = match settings.format {
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(builder.with_ansi(ansi).compact().finish())
        }
        LogFormat::Full => tracing::subscriber::set_global_default(builder.with_ansi(ansi).finish()),
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.with_ansi(false).json().finish())
        }
    };
    installed.map_err(|e| Error::other(format!("Failed to initialize logging: {}", e)))?;

    let session_id = generate_session_id();
    SESSION_ID
        .set(session_id.clone())
        .map_err(|_| Error::other("Logging was already initialized"))?;

    tracing::debug!(
        session_id = %session_id,
        level = %settings.level,
        format = ?settings.format,
        "logging initialized"
    );

    Ok(())
}

fn create_env_filter(settings: &LogSettings) -> Result<EnvFilter> {
    EnvFilter::try_new(&settings.level)
        .map_err(|e| Error::config(format!("invalid log level '{}': {}", settings.level, e)))
}

/// Generate a unique ID for this invocation
pub fn generate_session_id() -> String {
    format!("ses_{}", Uuid::new_v4().simple())
}

/// The current session ID
pub fn current_session_id() -> Option<&'static str> {
    SESSION_ID.get().map(|s| s.as_str())
}

/// Create a span with session ID and timing
pub fn create_operation_span(operation: &str, details: Option<&str>) -> Span {
    tracing::info_span!(
        "operation",
        operation = operation,
        session_id = current_session_id().unwrap_or("unknown"),
        details = details.unwrap_or(""),
        duration_ms = field::Empty,
    )
}

/// Credential redaction for terminal output
pub mod redaction {
    use regex::Regex;
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    fn patterns() -> &'static [Regex] {
        PATTERNS.get_or_init(|| {
            [
                r#"(?i)(bearer)\s+([a-zA-Z0-9_.~+/=-]{8,})"#,
                r#"(?i)((?:access|refresh|id)_?token)["']?\s*[=:]\s*["']?([a-zA-Z0-9_.~+/=-]{8,})"#,
                r#"(?i)(password|passwd|secret)["']?\s*[=:]\s*["']?([^\s'",]{3,})"#,
            ]
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
        })
    }

    /// Redact credentials from free text
    pub fn redact_sensitive(input: &str) -> String {
        patterns().iter().fold(input.to_string(), |text, regex| {
            regex.replace_all(&text, "$1 ***").into_owned()
        })
    }

    /// Redact credential-looking members of a JSON document in place
    pub fn redact_json_value(value: &mut serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    if is_sensitive_key(key) && !val.is_object() && !val.is_array() {
                        *val = serde_json::Value::String("***".to_string());
                    } else {
                        redact_json_value(val);
                    }
                }
            }
            serde_json::Value::Array(items) => items.iter_mut().for_each(redact_json_value),
            serde_json::Value::String(s) => *s = redact_sensitive(s),
            _ => {}
        }
    }

    fn is_sensitive_key(key: &str) -> bool {
        let key = key.to_lowercase();
        key.contains("token")
            || key.contains("password")
            || key.contains("secret")
            || key == "authorization"
    }
}

/// Operation timing
pub mod timing {
    use std::time::Instant;
    use tracing::Span;

    /// Logs its duration when finished or dropped
    pub struct Timer {
        start: Instant,
        span: Span,
        operation: String,
        finished: bool,
    }

    impl Timer {
        pub fn new(operation: &str) -> Self {
            Self::start(operation, None)
        }

        pub fn with_details(operation: &str, details: &str) -> Self {
            Self::start(operation, Some(details))
        }

        fn start(operation: &str, details: Option<&str>) -> Self {
            Self {
                start: Instant::now(),
                span: super::create_operation_span(operation, details),
                operation: operation.to_string(),
                finished: false,
            }
        }

        /// Finish the timer and log the duration
        pub fn finish(mut self) {
            self.record();
            self.finished = true;
        }

        fn record(&self) {
            let duration_ms = self.start.elapsed().as_millis() as u64;
            self.span.record("duration_ms", duration_ms);
            tracing::debug!(operation = %self.operation, duration_ms, "operation completed");
        }
    }

    impl Drop for Timer {
        fn drop(&mut self) {
            if !self.finished {
                self.record();
            }
        }
    }
}
