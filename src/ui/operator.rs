//! Operator-facing output: notices, proposed edits, run output and the
//! cross-check panel.
//!
//! The orchestrator only talks to the [`Operator`] trait. [`TerminalOperator`]
//! prints to the terminal; tests record what would have been shown.

use console::style;
use std::fmt;
use terminal_size::{Width, terminal_size};

use crate::edit::EditSet;
use crate::presenter::ReportSurface;
use crate::services::RunOutput;
use crate::status::StatusSignal;
use crate::ui::icons::{CHECK, CROSS, EDITS, INFO, RUN, WARN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A short message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Info => write!(f, "{}{}", INFO, self.message),
            NoticeLevel::Warning => write!(f, "{}{}", WARN, style(&self.message).yellow()),
            NoticeLevel::Error => write!(f, "{}{}", CROSS, style(&self.message).red()),
        }
    }
}

pub trait Operator: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Present edits that were proposed but not applied.
    fn show_edits(&self, edits: &EditSet);

    fn show_run_output(&self, output: &RunOutput);

    fn show_report(&self, surface: &ReportSurface);
}

/// Prints to the terminal, keeping output clear of the status spinner.
pub struct TerminalOperator {
    status: StatusSignal,
}

impl TerminalOperator {
    pub fn new(status: StatusSignal) -> Self {
        Self { status }
    }

    fn print_lines(&self, lines: &[String]) {
        self.status.suspend(|| {
            for line in lines {
                println!("{}", line);
            }
        });
    }
}

fn term_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

pub(crate) fn edit_lines(edits: &EditSet) -> Vec<String> {
    let mut lines = vec![format!(
        "{}{} proposed edit(s){}",
        EDITS,
        style(edits.len()).cyan(),
        edits
            .file
            .as_deref()
            .map(|f| format!(" for {}", style(f).bold()))
            .unwrap_or_default()
    )];
    if let Some(explanation) = &edits.explanation {
        lines.push(format!("  {}", style(explanation).dim()));
    }
    for edit in &edits.edits {
        lines.push(format!("  {}", edit.as_value()));
    }
    lines
}

pub(crate) fn run_output_lines(output: &RunOutput) -> Vec<String> {
    let marker = if output.exit_code == 0 { CHECK } else { CROSS };
    let mut lines = vec![format!(
        "{}{}exit code {}",
        RUN,
        marker,
        style(output.exit_code).bold()
    )];
    if !output.stdout.is_empty() {
        lines.push(style("stdout:").dim().to_string());
        lines.extend(output.stdout.lines().map(str::to_string));
    }
    if !output.stderr.is_empty() {
        lines.push(style("stderr:").dim().to_string());
        lines.extend(output.stderr.lines().map(|l| style(l).red().to_string()));
    }
    lines
}

impl Operator for TerminalOperator {
    fn notify(&self, notice: Notice) {
        let line = notice.to_string();
        self.status.suspend(|| eprintln!("{}", line));
    }

    fn show_edits(&self, edits: &EditSet) {
        self.print_lines(&edit_lines(edits));
    }

    fn show_run_output(&self, output: &RunOutput) {
        self.print_lines(&run_output_lines(output));
    }

    fn show_report(&self, surface: &ReportSurface) {
        if surface.is_open() {
            self.print_lines(&surface.lines(term_width()));
        }
    }
}
