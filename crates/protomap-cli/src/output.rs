//! Output formatting and writing utilities
//!
//! This module provides utilities for formatting and writing output
//! in various formats (JSON, YAML, human-readable), with dedicated human
//! renderings for validation results, table checks and module inspection.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use protomap_core::{CompatibilityInfo, ValidationResult};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// Summary of a compiled mapping table, printed by `check`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub name: String,
    pub version: String,
    pub description: String,
    pub source_format: String,
    pub target_format: String,
    pub field_mappings: usize,
    pub transforms: usize,
    pub required_fields: Vec<String>,
    pub reverse: ReverseSummary,
}

/// How the reverse side of a table is obtained
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseSummary {
    pub authored: bool,
    pub field_mappings: usize,
    pub warnings: Vec<String>,
}

/// One row of the field mapping listing printed by `inspect`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRow {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    pub required: bool,
}

/// Module description printed by `inspect`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    #[serde(flatten)]
    pub info: CompatibilityInfo,
    pub field_mappings: Vec<FieldRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reverse_warnings: Vec<String>,
}

/// Trait for formatting output with specialized support for common types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a validation result with its errors and warnings
    fn format_validation_result(&self, result: &ValidationResult) -> Result<String>;

    /// Format a table check report
    fn format_check_report(&self, report: &CheckReport) -> Result<String>;

    /// Format a module inspection report
    fn format_inspect_report(&self, report: &InspectReport) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Human => {
                // For human format, use pretty JSON as fallback
                Ok(serde_json::to_string_pretty(value)?)
            }
        }
    }

    fn format_validation_result(&self, result: &ValidationResult) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_validation_result_human(result)),
            _ => self.format(result),
        }
    }

    fn format_check_report(&self, report: &CheckReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_check_report_human(report)),
            _ => self.format(report),
        }
    }

    fn format_inspect_report(&self, report: &InspectReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_inspect_report_human(report)),
            _ => self.format(report),
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
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, progress: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: progress && !quiet && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    #[cfg(test)]
    pub fn with_writer(format: OutputFormat, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color: false,
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
        debug!("Output info: {}", message);

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
        if tracing::enabled!(tracing::Level::TRACE) {
            let value_json = serde_json::to_value(value)?;
            trace!("Outputting data: {}", redaction::redacted(&value_json));
        }

        let formatted = self.format.format(value)?;
        if self.format == OutputFormat::Yaml {
            // serde_yaml output already ends with a newline
            self.write(&formatted)
        } else {
            self.writeln(&formatted)
        }
    }

    /// Write a validation result with specialized formatting
    pub fn validation_result(&mut self, result: &ValidationResult) -> Result<()> {
        let formatted = self.format.format_validation_result(result)?;
        self.writeln(formatted.trim_end())
    }

    /// Write a table check report
    pub fn check_report(&mut self, report: &CheckReport) -> Result<()> {
        let formatted = self.format.format_check_report(report)?;
        self.writeln(formatted.trim_end())
    }

    /// Write a module inspection report
    pub fn inspect_report(&mut self, report: &InspectReport) -> Result<()> {
        let formatted = self.format.format_inspect_report(report)?;
        self.writeln(formatted.trim_end())
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }
        let rendered = render_table(headers, &rows);
        let mut lines = rendered.lines();
        if let Some(header) = lines.next() {
            if self.use_color {
                self.writeln(&header.bold().to_string())?;
            } else {
                self.writeln(header)?;
            }
        }
        for line in lines {
            self.writeln(line)?;
        }
        Ok(())
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

/// Helper function to create a spinner style
pub fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Render rows as aligned columns separated by `│`
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let render_row = |cells: Vec<&str>| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match widths.get(i) {
                Some(width) => format!("{:width$}", cell, width = *width),
                None => cell.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut output = render_row(headers.to_vec());
    output.push('\n');
    output.push_str(
        &widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    for row in rows {
        output.push('\n');
        output.push_str(&render_row(row.iter().map(String::as_str).collect()));
    }
    output
}

/// Format a ValidationResult for human reading
fn format_validation_result_human(result: &ValidationResult) -> String {
    let mut output = String::new();

    if result.is_valid {
        output.push_str("✅ Input is valid\n");
    } else {
        output.push_str(&format!(
            "❌ Validation Failed - {} Error(s)\n",
            result.errors.len()
        ));
        for (i, error) in result.errors.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, error));
        }
    }

    if !result.warnings.is_empty() {
        output.push_str(&format!("⚠️ {} Warning(s)\n", result.warnings.len()));
        for warning in &result.warnings {
            output.push_str(&format!("  • {}\n", warning));
        }
    }

    output
}

/// Format a CheckReport for human reading
fn format_check_report_human(report: &CheckReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("✅ Mapping table '{}' compiled\n\n", report.name));
    if !report.version.is_empty() {
        output.push_str(&format!("  Version: {}\n", report.version));
    }
    if !report.description.is_empty() {
        output.push_str(&format!("  Description: {}\n", report.description));
    }
    output.push_str(&format!(
        "  Formats: {} -> {}\n",
        report.source_format, report.target_format
    ));
    output.push_str(&format!("  Field mappings: {}\n", report.field_mappings));
    output.push_str(&format!("  Transforms: {}\n", report.transforms));
    if !report.required_fields.is_empty() {
        output.push_str(&format!(
            "  Required fields: {}\n",
            report.required_fields.join(", ")
        ));
    }

    output.push('\n');
    if report.reverse.authored {
        output.push_str(&format!(
            "🔁 Reverse mapping: authored ({} field mappings)\n",
            report.reverse.field_mappings
        ));
    } else {
        output.push_str(&format!(
            "🔁 Reverse mapping: derived ({} field mappings)\n",
            report.reverse.field_mappings
        ));
    }
    for warning in &report.reverse.warnings {
        output.push_str(&format!("  ⚠️ {}\n", warning));
    }

    output
}

/// Format an InspectReport for human reading
fn format_inspect_report_human(report: &InspectReport) -> String {
    let info = &report.info;
    let mut output = String::new();

    output.push_str(&format!("🔧 Mapping table: {}\n", info.mapping_table));
    output.push_str(&format!("  Direction: {}\n", info.direction));
    output.push_str(&format!(
        "  Conversions: {}\n",
        info.supported_conversions.join(", ")
    ));
    if info.agent_enabled {
        output.push_str(&format!(
            "  Agents: {}\n",
            info.available_agents.join(", ")
        ));
    } else {
        output.push_str("  Agents: disabled\n");
    }

    if !info.model_mappings.is_empty() {
        output.push_str("\n📋 Model mappings:\n");
        for (from, to) in &info.model_mappings {
            let to = to.as_str().map(str::to_string).unwrap_or_else(|| to.to_string());
            output.push_str(&format!("  {} -> {}\n", from, to));
        }
    }

    output.push_str("\n📝 Field mappings:\n");
    let rows = report
        .field_mappings
        .iter()
        .map(|row| {
            vec![
                row.source.clone(),
                row.target.clone(),
                row.transform.clone().unwrap_or_default(),
                if row.required { "yes".to_string() } else { String::new() },
            ]
        })
        .collect::<Vec<_>>();
    output.push_str(&render_table(&["Source", "Target", "Transform", "Required"], &rows));
    output.push('\n');

    for warning in &report.reverse_warnings {
        output.push_str(&format!("⚠️ {}\n", warning));
    }

    output
}
