// src/workflows/approve.rs
//! Bulk approval of overdue timesheets for direct reports.

use colored::Colorize;
use log::debug;

use super::{ActionResult, WorkflowOutcome};
use crate::browser::{Browse, Locator, SessionError};

pub const APPROVAL_LINKS: Locator =
    Locator::XPath("//a[contains(@href, \"timeentryapprove.asp\")]");
pub const EMPLOYEE_NAME: Locator = Locator::XPath(
    "/html/body/font/div/table[3]/tbody/tr/td/font/font/form/p[1]/table/tbody/tr[1]/td[2]/font",
);
pub const TIME_PERIOD: Locator = Locator::XPath(
    "/html/body/font/div/table[3]/tbody/tr/td/font/p[2]/table/tbody/tr/td/font/b/font",
);
pub const APPROVE_BUTTON: Locator = Locator::Name("btnTA_Approve");

/// Approve every timesheet linked from the current listing page.
///
/// The link list is captured once as a snapshot and never re-queried: the
/// first navigation leaves the listing page, so re-deriving the list
/// mid-loop would read stale state. A per-item locate failure records a
/// `Failed` outcome and iteration continues with the next snapshot entry.
pub async fn approve(
    page: &dyn Browse,
    dry_run: bool,
) -> Result<Vec<WorkflowOutcome>, SessionError> {
    let links = page.collect_links(&APPROVAL_LINKS).await?;
    debug!("Identified {} matching links...", links.len());

    if links.is_empty() {
        println!("\nNo unapproved timesheets found.");
        return Ok(Vec::new());
    }

    let mut outcomes = Vec::with_capacity(links.len());
    for link in &links {
        outcomes.push(approve_one(page, link, dry_run).await?);
    }
    Ok(outcomes)
}

async fn approve_one(
    page: &dyn Browse,
    link: &str,
    dry_run: bool,
) -> Result<WorkflowOutcome, SessionError> {
    page.navigate(link).await?;

    // Labels are read best-effort, for reporting only.
    let employee = page.try_read(&EMPLOYEE_NAME).await?;
    let period = page.try_read(&TIME_PERIOD).await?;
    match (&employee, &period) {
        (Some(name), Some(date)) => {
            println!("Employee: {name}");
            println!("Time period: {date}");
        }
        _ => {
            println!("\nCould not read employee data from webapp.\n");
            debug!("Employee or period label missing on {link}");
        }
    }

    let result = if dry_run {
        if page.exists(&APPROVE_BUTTON).await? {
            println!("{}\n", "WOULD APPROVE (test mode)".yellow());
            ActionResult::Skipped
        } else {
            println!("{}", "Could not locate the approve control.".red());
            ActionResult::Failed
        }
    } else if page.try_activate(&APPROVE_BUTTON).await? {
        println!("{}\n", "APPROVED".green());
        ActionResult::Approved
    } else {
        println!("{}", "Could not locate the approve control.".red());
        ActionResult::Failed
    };

    Ok(WorkflowOutcome {
        employee,
        period,
        result,
    })
}
