//! Cross-check report presentation.
//!
//! [`Presenter::render`] writes a [`CrossCheckReport`] into a
//! [`ReportSurface`], which holds exactly what the operator sees: badge text,
//! count labels, summary and one entry per test. [`Presenter::extract`] reads
//! the surface back into a report.
//!
//! The round trip keeps `overall`, `summary` and every test's
//! name/description/status/reason. Counts are parsed from the visible labels,
//! so they only survive while the labels are untouched.

use console::style;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::edit::{Counts, CrossCheckReport, Overall, TestOutcome, TestStatus};
use crate::ui::icons::{CHECK, CROSS};

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").expect("static regex is valid"));

const DEFAULT_WIDTH: usize = 80;

/// One displayed test. `passed` is the visual marker, independent of any text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceEntry {
    pub name: String,
    pub description: String,
    pub reason: String,
    pub passed: bool,
}

/// The display state of the cross-check panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSurface {
    badge: String,
    pass_label: String,
    fail_label: String,
    summary: String,
    entries: Vec<SurfaceEntry>,
    open: bool,
}

impl ReportSurface {
    pub fn badge(&self) -> &str {
        &self.badge
    }

    pub fn pass_label(&self) -> &str {
        &self.pass_label
    }

    pub fn fail_label(&self) -> &str {
        &self.fail_label
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn entries(&self) -> &[SurfaceEntry] {
        &self.entries
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Overwrite the visible pass label, as an operator editing the panel would.
    pub fn set_pass_label(&mut self, label: impl Into<String>) {
        self.pass_label = label.into();
    }

    pub fn set_fail_label(&mut self, label: impl Into<String>) {
        self.fail_label = label.into();
    }

    /// Terminal lines for the panel, wrapped to `width` columns.
    pub fn lines(&self, width: Option<usize>) -> Vec<String> {
        let width = width.unwrap_or(DEFAULT_WIDTH).max(20);
        let badge = match Overall::from_label(&self.badge) {
            Overall::Pass => style(self.badge.to_uppercase()).green().bold(),
            Overall::Fail => style(self.badge.to_uppercase()).red().bold(),
            Overall::Mixed => style(self.badge.to_uppercase()).yellow().bold(),
        };

        let mut lines = vec![format!(
            "Cross-check: {}  {}  {}",
            badge,
            style(&self.pass_label).green(),
            style(&self.fail_label).red()
        )];
        if !self.summary.is_empty() {
            lines.extend(textwrap::wrap(&self.summary, width).into_iter().map(|l| l.into_owned()));
        }
        lines.push(String::new());

        let indent = "      ";
        let options = textwrap::Options::new(width)
            .initial_indent(indent)
            .subsequent_indent(indent);
        for entry in &self.entries {
            let marker = if entry.passed { CHECK } else { CROSS };
            lines.push(format!("  {}{}", marker, style(&entry.name).bold()));
            if !entry.description.is_empty() {
                lines.extend(
                    textwrap::wrap(&entry.description, &options)
                        .into_iter()
                        .map(|l| l.into_owned()),
                );
            }
            if !entry.reason.is_empty() {
                let reason = format!("reason: {}", entry.reason);
                lines.extend(
                    textwrap::wrap(&reason, &options)
                        .into_iter()
                        .map(|l| style(l).dim().to_string()),
                );
            }
        }
        lines
    }
}

/// Parse the leading integer of a count label. Never fails.
fn parse_count(label: &str) -> u32 {
    LEADING_NUMBER
        .captures(label)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Owns the report surface and keeps it in sync with the last rendered report.
#[derive(Debug, Default)]
pub struct Presenter {
    surface: ReportSurface,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a presenter around a previously saved surface.
    pub fn from_surface(surface: ReportSurface) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &ReportSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut ReportSurface {
        &mut self.surface
    }

    /// Replace the whole surface with `report` and open it.
    pub fn render(&mut self, report: &CrossCheckReport) {
        self.surface = ReportSurface {
            badge: report.overall.to_string(),
            pass_label: format!("{} passed", report.counts.pass_count),
            fail_label: format!("{} failed", report.counts.fail_count),
            summary: report.summary.clone(),
            entries: report
                .tests
                .iter()
                .map(|t| SurfaceEntry {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    reason: t.reason.clone(),
                    passed: t.status.is_pass(),
                })
                .collect(),
            open: true,
        };
    }

    /// Rebuild a report from what is currently displayed.
    pub fn extract(&self) -> CrossCheckReport {
        let surface = &self.surface;
        CrossCheckReport {
            overall: Overall::from_label(&surface.badge),
            counts: Counts {
                pass_count: parse_count(&surface.pass_label),
                fail_count: parse_count(&surface.fail_label),
            },
            summary: surface.summary.clone(),
            tests: surface
                .entries
                .iter()
                .map(|e| TestOutcome {
                    name: e.name.clone(),
                    description: e.description.clone(),
                    status: if e.passed {
                        TestStatus::Pass
                    } else {
                        TestStatus::Fail
                    },
                    reason: e.reason.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> CrossCheckReport {
        CrossCheckReport::new(
            Overall::Mixed,
            "Division is guarded but negative input is not handled.",
            vec![
                TestOutcome {
                    name: "divide by zero".to_string(),
                    description: "calls f(0)".to_string(),
                    status: TestStatus::Pass,
                    reason: "guard returns None".to_string(),
                },
                TestOutcome {
                    name: "negative input".to_string(),
                    description: "calls f(-1)".to_string(),
                    status: TestStatus::Fail,
                    reason: "raises ValueError".to_string(),
                },
            ],
        )
    }

    #[test]
    fn test_render_writes_badge_labels_and_entries() {
        let mut presenter = Presenter::new();
        presenter.render(&sample_report());
        let surface = presenter.surface();
        assert!(surface.is_open());
        assert_eq!(surface.badge(), "mixed");
        assert_eq!(surface.pass_label(), "1 passed");
        assert_eq!(surface.fail_label(), "1 failed");
        assert_eq!(surface.entries().len(), 2);
        assert!(surface.entries()[0].passed);
        assert!(!surface.entries()[1].passed);
    }

    #[test]
    fn test_render_scenario_single_passing_test() {
        let report = CrossCheckReport::new(
            Overall::Pass,
            "",
            vec![TestOutcome {
                name: "t1".to_string(),
                description: String::new(),
                status: TestStatus::Pass,
                reason: String::new(),
            }],
        );
        let mut presenter = Presenter::new();
        presenter.render(&report);
        assert_eq!(presenter.surface().badge(), "pass");
        assert_eq!(presenter.surface().pass_label(), "1 passed");
        assert_eq!(presenter.surface().fail_label(), "0 failed");
    }

    #[test]
    fn test_round_trip_preserves_report() {
        let report = sample_report();
        let mut presenter = Presenter::new();
        presenter.render(&report);
        let extracted = presenter.extract();
        assert_eq!(extracted.overall, report.overall);
        assert_eq!(extracted.summary, report.summary);
        assert_eq!(extracted.tests, report.tests);
        assert_eq!(extracted.counts, report.counts);
    }

    #[test]
    fn test_render_is_idempotent() {
        let report = sample_report();
        let mut once = Presenter::new();
        once.render(&report);

        let mut twice = Presenter::new();
        twice.render(&report);
        twice.render(&report);

        assert_eq!(once.surface(), twice.surface());
        assert_eq!(twice.surface().entries().len(), 2);
    }

    #[test]
    fn test_render_replaces_previous_report() {
        let mut presenter = Presenter::new();
        presenter.render(&sample_report());
        let smaller = CrossCheckReport::new(Overall::Fail, "broken", Vec::new());
        presenter.render(&smaller);
        assert!(presenter.surface().entries().is_empty());
        assert_eq!(presenter.surface().badge(), "fail");
        assert_eq!(presenter.extract(), smaller);
    }

    #[test]
    fn test_hand_edited_label_makes_counts_drift() {
        let report = sample_report();
        let mut presenter = Presenter::new();
        presenter.render(&report);
        presenter.surface_mut().set_pass_label("5 passed");

        let extracted = presenter.extract();
        assert_eq!(extracted.tests, report.tests);
        assert_eq!(extracted.counts.pass_count, 5);
        assert!(!extracted.counts_consistent());
    }

    #[test]
    fn test_non_numeric_labels_parse_to_zero() {
        let mut presenter = Presenter::new();
        presenter.render(&sample_report());
        presenter.surface_mut().set_pass_label("all of them");
        presenter.surface_mut().set_fail_label("");

        let extracted = presenter.extract();
        assert_eq!(extracted.counts.pass_count, 0);
        assert_eq!(extracted.counts.fail_count, 0);
    }

    #[test]
    fn test_extract_from_empty_surface() {
        let presenter = Presenter::new();
        let extracted = presenter.extract();
        assert_eq!(extracted.overall, Overall::Mixed);
        assert!(extracted.tests.is_empty());
        assert_eq!(extracted.counts, Counts::default());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12 passed"), 12);
        assert_eq!(parse_count("  3 failed"), 3);
        assert_eq!(parse_count("passed: 3"), 0);
        assert_eq!(parse_count("99999999999 passed"), 0);
    }

    #[test]
    fn test_lines_include_entries_in_order() {
        console::set_colors_enabled(false);
        let mut presenter = Presenter::new();
        presenter.render(&sample_report());
        let text = presenter.surface().lines(Some(60)).join("\n");
        let zero = text.find("divide by zero").unwrap();
        let negative = text.find("negative input").unwrap();
        assert!(zero < negative);
        assert!(text.contains("MIXED"));
        assert!(text.contains("reason: raises ValueError"));
    }
}
