//! Output formatting and writing utilities
//!
//! Results go to stdout in the selected format (human, json, json-pretty,
//! yaml). Human output knows how to lay out backend responses and the
//! debug snapshot; machine formats serialize them as-is.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use roster_core::{DebugSnapshot, ResponseBody};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use std::time::Duration;
use tracing::trace;

/// Formatting for the values the CLI prints
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a decoded response body
    fn format_body(&self, body: &ResponseBody) -> Result<String>;

    /// Format the last request/response trace
    fn format_snapshot(&self, snapshot: &DebugSnapshot) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_body(&self, body: &ResponseBody) -> Result<String> {
        match (self, body) {
            (OutputFormat::Human, ResponseBody::Text(text)) => Ok(text.clone()),
            (_, ResponseBody::Json(value)) => self.format(value),
            (_, ResponseBody::Text(text)) => self.format(text),
        }
    }

    fn format_snapshot(&self, snapshot: &DebugSnapshot) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_snapshot_human(snapshot)),
            _ => self.format(snapshot),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        let mut output = Self::with_writer(format, use_color, quiet, Box::new(io::stdout()));
        output.show_progress = !quiet && io::stderr().is_terminal();
        output
    }

    /// Create an output writer with a custom writer; progress spinners stay off
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color,
            show_progress: false,
            quiet,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut redacted = serde_json::to_value(value)?;
        redaction::redact_json_value(&mut redacted);
        trace!(data = %redacted, "writing output");

        let formatted = self.format.format(value)?;
        self.finish_block(&formatted)
    }

    /// Write a backend response body
    pub fn body(&mut self, body: &ResponseBody) -> Result<()> {
        let formatted = self.format.format_body(body)?;
        self.finish_block(&formatted)
    }

    /// Write the debug snapshot
    pub fn snapshot(&mut self, snapshot: &DebugSnapshot) -> Result<()> {
        let formatted = self.format.format_snapshot(snapshot)?;
        self.finish_block(&formatted)
    }

    fn finish_block(&mut self, formatted: &str) -> Result<()> {
        if formatted.ends_with('\n') {
            self.write(formatted)
        } else {
            self.writeln(formatted)
        }
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(default_spinner_style());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Spinner style used while a call is in flight
pub fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn format_snapshot_human(snapshot: &DebugSnapshot) -> String {
    let mut output = String::new();

    match &snapshot.request {
        None => output.push_str("No request yet.\n"),
        Some(request) => {
            output.push_str("Last request\n");
            output.push_str(&format!("  URL:     {}\n", request.url));
            output.push_str(&format!("  Method:  {}\n", request.method));
            output.push_str(&format!("  Sent at: {}\n", request.sent_at.to_rfc3339()));
            if !request.headers.is_empty() {
                output.push_str("  Headers:\n");
                for (name, value) in &request.headers {
                    output.push_str(&format!("    {}: {}\n", name, value));
                }
            }
        }
    }

    if let Some(response) = &snapshot.response {
        output.push_str("Last response\n");
        output.push_str(&format!("  Status:      {}\n", response.status));
        output.push_str(&format!("  Received at: {}\n", response.received_at.to_rfc3339()));
        output.push_str(&format!("  Body:        {}\n", response.body_snippet));
    } else if snapshot.request.is_some() {
        output.push_str("No response recorded.\n");
    }

    output
}

/// One-line summary of a JSON value
pub fn format_value_compact(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) if items.len() <= 3 => format!(
            "[{}]",
            items.iter().map(format_value_compact).collect::<Vec<_>>().join(", ")
        ),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(fields) if fields.len() <= 2 => format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value_compact(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Object(fields) => format!("{{{} fields}}", fields.len()),
    }
}
