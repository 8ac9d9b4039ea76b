// src/workflows/mod.rs
//! The two page-iteration workflows run against an authenticated session.
//!
//! Both engines treat the absence of an expected element as a signal, not a
//! failure: in Approve it marks a single item as failed, in Submit it is
//! the only way the loop ever terminates. Which meaning applies depends on
//! the step, so the interpretation lives at each call site.

pub mod approve;
pub mod submit;

pub use approve::approve;
pub use submit::submit;

use std::fmt;

use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

/// What happened to a single timesheet page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    Approved,
    Submitted,
    /// Dry-run: the action was reported but not performed.
    Skipped,
    Failed,
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionResult::Approved => "APPROVED",
            ActionResult::Submitted => "SUBMITTED",
            ActionResult::Skipped => "SKIPPED (test mode)",
            ActionResult::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Per-page record accumulated for operator-visible output only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub employee: Option<String>,
    pub period: Option<String>,
    pub result: ActionResult,
}

/// End-of-run summary table.
pub fn print_summary(outcomes: &[WorkflowOutcome]) {
    if outcomes.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Employee", "Time period", "Result"]);

    for (i, outcome) in outcomes.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            outcome.employee.clone().unwrap_or_else(|| "-".to_string()),
            outcome.period.clone().unwrap_or_else(|| "-".to_string()),
            outcome.result.to_string(),
        ]);
    }

    println!("\n{}", "Run Summary".bold().underline());
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_results_render_as_operator_labels() {
        assert_eq!(ActionResult::Approved.to_string(), "APPROVED");
        assert_eq!(ActionResult::Submitted.to_string(), "SUBMITTED");
        assert_eq!(ActionResult::Skipped.to_string(), "SKIPPED (test mode)");
        assert_eq!(ActionResult::Failed.to_string(), "FAILED");
    }
}
