// Terminal output: job tables and run summaries

use colored::Colorize;
use tabled::{Table, Tabled};

use batchprint_core::application::{OrientationResult, RunOutcome};
use batchprint_core::domain::{JobStatus, PrintJob, RuleSet};

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "On")]
    enabled: &'static str,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Type")]
    file_type: &'static str,
    #[tabled(rename = "Sheets")]
    sheets: String,
    #[tabled(rename = "Printer")]
    printer: String,
    #[tabled(rename = "Copies")]
    copies: u32,
    #[tabled(rename = "Duplex")]
    duplex: &'static str,
    #[tabled(rename = "Status")]
    status: &'static str,
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Printer")]
    printer: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Extension")]
    extension: String,
    #[tabled(rename = "Printer")]
    printer: String,
}

#[derive(Tabled)]
struct OrientationRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Recommendation")]
    recommendation: &'static str,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Queue as a table (one row per job, queue order)
pub fn job_table(jobs: &[PrintJob]) -> String {
    let rows = jobs.iter().enumerate().map(|(i, job)| JobRow {
        position: i + 1,
        enabled: if job.enabled { "yes" } else { "no" },
        file: job.file_name(),
        file_type: job.file_type.label(),
        sheets: job.display_sheets(),
        printer: job.display_printer().to_string(),
        copies: job.copies,
        duplex: job.duplex.label(),
        status: job.status.label(),
    });
    Table::new(rows).to_string()
}

/// Per-job outcome after a run
pub fn result_table(jobs: &[PrintJob]) -> String {
    let rows = jobs.iter().map(|job| ResultRow {
        file: job.file_name(),
        printer: job.display_printer().to_string(),
        status: job.status.to_string(),
        summary: job.summary.map(|s| s.to_string()).unwrap_or_default(),
        message: job.message.clone(),
    });
    Table::new(rows).to_string()
}

pub fn rule_table(rules: &RuleSet) -> String {
    let rows = rules.iter().map(|(extension, rule)| RuleRow {
        extension: extension.clone(),
        printer: if rule.printer.is_empty() {
            "(default)".to_string()
        } else {
            rule.printer.clone()
        },
    });
    Table::new(rows).to_string()
}

pub fn orientation_table(results: &[OrientationResult]) -> String {
    let rows = results.iter().enumerate().map(|(i, result)| OrientationRow {
        position: i + 1,
        file: result.file_name.clone(),
        recommendation: result.recommendation.label(),
        reason: result.reason.clone(),
    });
    Table::new(rows).to_string()
}

/// One-line live status for a job transition
pub fn status_line(file_name: &str, status: JobStatus, message: &str) -> String {
    let label = match status {
        JobStatus::Success => "✓".green().bold(),
        JobStatus::Failed => "✗".red().bold(),
        JobStatus::Cancelled => "○".yellow(),
        _ => "•".cyan(),
    };
    if message.is_empty() {
        format!("  {} {} {}", label, status, file_name)
    } else {
        format!("  {} {} {}: {}", label, status, file_name, message)
    }
}

pub fn outcome_line(outcome: &RunOutcome) -> String {
    let seconds = outcome.elapsed_ms as f64 / 1000.0;
    let counts = format!(
        "{} printed, {} failed, {} cancelled of {} ({:.1}s)",
        outcome.succeeded, outcome.failed, outcome.skipped_by_cancel, outcome.total, seconds
    );
    if outcome.cancelled {
        format!("{} {}", "Run cancelled:".yellow().bold(), counts)
    } else if outcome.failed > 0 {
        format!("{} {}", "Run finished with failures:".red().bold(), counts)
    } else {
        format!("{} {}", "✓ Run finished:".green().bold(), counts)
    }
}
