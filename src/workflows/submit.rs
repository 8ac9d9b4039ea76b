// src/workflows/submit.rs
//! Submission of the operator's own timesheets.

use colored::Colorize;
use log::debug;

use super::{ActionResult, WorkflowOutcome};
use crate::browser::{Browse, Locator, SessionError};

pub const SUBMIT_BUTTON: Locator = Locator::Name("btnTE_TimeSubmit");
pub const CONFIRM_BUTTON: Locator = Locator::Name("btnTE_TimeConfirm");
pub const TIME_PERIOD: Locator = Locator::XPath(
    "/html/body/font/div/table[3]/tbody/tr/td/font/p/table/tbody/tr[1]/td/table/tbody/tr/td/font/b/font",
);
pub const NEXT_LINK: Locator = Locator::XPath("/html/body/font/div/table[3]/tbody/tr/td/font/p[3]/b/a");

/// Submit timesheets from the current page until the sequence is exhausted.
///
/// The loop has no iteration bound; it only terminates through one of its
/// three locate steps coming up empty. A missing submit control or next
/// link means no more work (normal termination); a missing period label or
/// confirm control mid-cycle is an anomalous page and also exits the loop,
/// recorded as a failed item rather than a failed run.
pub async fn submit(
    page: &dyn Browse,
    dry_run: bool,
) -> Result<Vec<WorkflowOutcome>, SessionError> {
    let mut outcomes = Vec::new();

    loop {
        // Step 1: absence of the submit control means nothing left to do.
        if !page.try_activate(&SUBMIT_BUTTON).await? {
            println!("No timesheets are available for submission.");
            break;
        }

        // Step 2: from here until the confirmation, an absent element is an
        // anomaly, not a normal termination.
        let period = match page.try_read(&TIME_PERIOD).await? {
            Some(period) => {
                println!("Time period: {period}");
                period
            }
            None => {
                println!("{}", "Something went wrong.".red());
                debug!("Period label missing after pressing submit");
                outcomes.push(failed());
                break;
            }
        };

        if dry_run {
            println!("{}\n", "WOULD SUBMIT (test mode)".yellow());
            outcomes.push(cycle_outcome(period, ActionResult::Skipped));
        } else if page.try_activate(&CONFIRM_BUTTON).await? {
            println!("{}\n", "SUBMITTED".green());
            outcomes.push(cycle_outcome(period, ActionResult::Submitted));
        } else {
            println!("{}", "Something went wrong.".red());
            debug!("Confirm control missing after pressing submit");
            outcomes.push(cycle_outcome(period, ActionResult::Failed));
            break;
        }

        // Step 3: no next-page link means the last page was just handled.
        if !page.try_activate(&NEXT_LINK).await? {
            println!("No more timesheets to submit.");
            break;
        }
    }

    Ok(outcomes)
}

fn cycle_outcome(period: String, result: ActionResult) -> WorkflowOutcome {
    WorkflowOutcome {
        employee: None,
        period: Some(period),
        result,
    }
}

fn failed() -> WorkflowOutcome {
    WorkflowOutcome {
        employee: None,
        period: None,
        result: ActionResult::Failed,
    }
}
