//! Batchprint CLI - queue documents and send them to printers in one run

mod config;
mod logging;
mod render;
mod wiring;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use batchprint_core::application::{
    CancelSender, ExecutorEvent, JobSelection, Orientation, OrientationReport, OrientationResult,
    RunOutcome,
    SortColumn,
};
use batchprint_core::domain::{DuplexMode, FileType, JobStatus, OrientationMode, PrintSettings};

use crate::config::AppConfig;
use crate::wiring::App;

/// Conventional exit status after SIGINT
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "batchprint")]
#[command(about = "Print batches of PDF and Office documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: config.toml in the platform config directory)
    #[arg(short, long, global = true, env = "BATCHPRINT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the queue and print it
    Print {
        #[command(flatten)]
        queue: QueueArgs,

        #[command(flatten)]
        options: PrintOptions,

        /// Retry failed jobs once after the run
        #[arg(long)]
        retry_failed: bool,
    },

    /// Show the resolved queue without printing
    List {
        #[command(flatten)]
        queue: QueueArgs,

        #[command(flatten)]
        options: PrintOptions,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the sheets of an Excel workbook
    Sheets {
        /// Workbook path (.xlsx or .xlsm)
        file: PathBuf,
    },

    /// Show the printer rules and the default printer
    Rules,
}

#[derive(Args)]
struct QueueArgs {
    /// Files and folders to queue
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Descend into subfolders
    #[arg(short, long)]
    recursive: bool,

    /// Sort column (enabled, name, path, type, label, sheets, printer, status)
    #[arg(long)]
    sort: Option<SortColumn>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,
}

#[derive(Args)]
struct PrintOptions {
    /// Printer for files no rule matches (instead of the system default)
    #[arg(short, long)]
    printer: Option<String>,

    /// Copies per document
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    copies: Option<u32>,

    /// off, long-edge or short-edge
    #[arg(long)]
    duplex: Option<DuplexMode>,

    /// Media name passed to the printer (e.g. A4, Letter)
    #[arg(long)]
    paper_size: Option<String>,

    /// Excel sheets to print, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    sheets: Vec<String>,

    /// Excel orientation: auto, ask or none
    #[arg(long)]
    orientation: Option<OrientationMode>,
}

impl PrintOptions {
    /// Flags win over file and environment configuration
    fn apply(&self, settings: &mut PrintSettings) {
        if let Some(printer) = &self.printer {
            settings.use_default_printer = false;
            settings.selected_printer = printer.clone();
        }
        if let Some(copies) = self.copies {
            settings.copies = copies;
        }
        if let Some(duplex) = self.duplex {
            settings.duplex = duplex;
        }
        if let Some(paper_size) = &self.paper_size {
            settings.paper_size = paper_size.clone();
        }
        if let Some(mode) = self.orientation {
            settings.excel_orientation_mode = mode;
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    let _log_guard = logging::init_logging(config.log_dir().as_deref())?;

    match cli.command {
        Commands::Print {
            queue,
            options,
            retry_failed,
        } => {
            options.apply(&mut config.settings);
            let mut app = App::build(&config);
            if load_queue(&mut app, &queue, &options) == 0 {
                println!("{}", "No printable files found".yellow());
                return Ok(ExitCode::SUCCESS);
            }
            print_queue(&mut app, retry_failed).await
        }

        Commands::List {
            queue,
            options,
            json,
        } => {
            options.apply(&mut config.settings);
            let mut app = App::build(&config);
            load_queue(&mut app, &queue, &options);

            if json {
                let text = serde_json::to_string_pretty(app.manager.jobs())
                    .context("Failed to serialize queue")?;
                println!("{}", text);
            } else if app.manager.job_count() == 0 {
                println!("{}", "No printable files found".yellow());
            } else {
                println!("{}", render::job_table(app.manager.jobs()));
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Sheets { file } => {
            let app = App::build(&config);
            let path = config::expand(&file);
            let sheets = app
                .manager
                .list_excel_sheets(&path)
                .await
                .with_context(|| format!("Cannot read sheets of {}", path.display()))?;

            for (i, name) in sheets.iter().enumerate() {
                println!("{:>3}  {}", i + 1, name);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Rules => {
            let app = App::build(&config);
            let default_printer = app.manager.default_printer();

            println!("{}", render::rule_table(app.manager.rules()));
            println!();
            if default_printer.is_empty() {
                println!("  {} {}", "Default printer:".bold(), "(none)".yellow());
            } else {
                println!("  {} {}", "Default printer:".bold(), default_printer);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Fill the queue from the command line; returns the queue length
fn load_queue(app: &mut App, queue: &QueueArgs, options: &PrintOptions) -> usize {
    let paths: Vec<PathBuf> = queue.paths.iter().map(|path| config::expand(path)).collect();
    for missing in paths.iter().filter(|path| !path.exists()) {
        warn!(path = %missing.display(), "Queued path does not exist");
    }
    app.manager.add_paths(&paths, queue.recursive);

    if let Some(column) = queue.sort {
        app.manager.sort_jobs(column, queue.desc);
    }

    if !options.sheets.is_empty() {
        let excel_ids: Vec<String> = app
            .manager
            .jobs()
            .iter()
            .filter(|job| job.file_type == FileType::Excel)
            .map(|job| job.id.clone())
            .collect();
        for id in &excel_ids {
            app.manager.set_job_sheets(id, &options.sheets);
        }
    }

    app.manager.job_count()
}

async fn print_queue(app: &mut App, retry_failed: bool) -> Result<ExitCode> {
    if app.manager.settings().excel_orientation_mode.needs_analysis()
        && !choose_orientation(app).await?
    {
        println!("{}", "Cancelled during orientation analysis; nothing was printed.".yellow());
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }

    let outcome = run_batch(app, JobSelection::AllEnabled).await?;
    let mut cancelled = outcome.cancelled;

    let failed_ids: Vec<String> = app
        .manager
        .get_failed_jobs()
        .iter()
        .map(|job| job.id.clone())
        .collect();
    if retry_failed && !cancelled && !failed_ids.is_empty() {
        println!();
        println!(
            "{}",
            format!("Retrying {} failed job(s)...", failed_ids.len()).cyan().bold()
        );
        app.manager.reset_failed_jobs();
        let retry = run_batch(app, JobSelection::Jobs(failed_ids)).await?;
        cancelled |= retry.cancelled;
    }

    println!();
    println!("{}", render::result_table(app.manager.jobs()));

    if cancelled {
        Ok(ExitCode::from(EXIT_CANCELLED))
    } else if app.manager.get_failed_jobs().is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Run one batch, mirroring executor events into the manager and the terminal
async fn run_batch(app: &mut App, selection: JobSelection) -> Result<RunOutcome> {
    let mut handle = app.executor.start(&app.manager, selection)?;
    let ctrl_c = cancel_on_ctrl_c(handle.canceller());
    let mut position = (0, 0);

    while let Some(event) = handle.next_event().await {
        app.manager.apply_status_event(&event);

        match event {
            ExecutorEvent::Progress {
                completed, total, ..
            } => position = (completed, total),
            ExecutorEvent::JobStatus {
                job_id,
                status,
                message,
            } => {
                let file_name = app
                    .manager
                    .find_job_by_id(&job_id)
                    .map(|job| job.file_name())
                    .unwrap_or(job_id);
                if status == JobStatus::Printing {
                    println!(
                        "[{}/{}] {}",
                        position.0 + 1,
                        position.1,
                        render::status_line(&file_name, status, &message).trim_start()
                    );
                } else {
                    println!("{}", render::status_line(&file_name, status, &message));
                }
            }
            ExecutorEvent::JobFailed { .. } | ExecutorEvent::Finished { .. } => {}
        }
    }

    ctrl_c.abort();
    let outcome = handle.wait().await?;
    println!();
    println!("{}", render::outcome_line(&outcome));
    Ok(outcome)
}

/// Analyze Excel jobs and record which ones get automatic orientation.
/// Analysis problems are reported and printing goes ahead unrotated.
/// Returns false when the analysis was cancelled.
async fn choose_orientation(app: &mut App) -> Result<bool> {
    let handle = match app.analyzer.start(&app.manager, JobSelection::AllEnabled) {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Orientation analysis unavailable");
            eprintln!("{} {}", "Orientation analysis skipped:".yellow(), e);
            return Ok(true);
        }
    };
    let ctrl_c = cancel_on_ctrl_c(handle.canceller());
    let report = handle.wait().await?;
    ctrl_c.abort();

    if report.results.is_empty() && !report.cancelled {
        return Ok(true);
    }
    if !report.cancelled {
        println!("{}", "Excel orientation".cyan().bold());
        println!("{}", render::orientation_table(&report.results));
    }

    let interactive = std::io::stdin().is_terminal();
    let Some(chosen) = orientation_choices(&report, |result| {
        let recommended = result.recommendation == Orientation::Landscape;
        if interactive {
            confirm(
                &format!("Rotate {} automatically?", result.file_name),
                recommended,
            )
        } else {
            Ok(recommended)
        }
    })?
    else {
        info!(analyzed = report.results.len(), "Orientation analysis cancelled");
        return Ok(false);
    };

    info!(
        analyzed = report.results.len(),
        chosen = chosen.len(),
        "Orientation choices recorded"
    );
    app.manager.apply_orientation_choices(&chosen);
    Ok(true)
}

/// Ids the user accepts, asked only about determined results.
/// `None` for a cancelled analysis: nobody is asked and nothing prints.
fn orientation_choices(
    report: &OrientationReport,
    mut accept: impl FnMut(&OrientationResult) -> Result<bool>,
) -> Result<Option<Vec<String>>> {
    if report.cancelled {
        return Ok(None);
    }
    let mut chosen = Vec::new();
    for result in report.results.iter().filter(|result| result.is_determined()) {
        if accept(result)? {
            chosen.push(result.job_id.clone());
        }
    }
    Ok(Some(chosen))
}

/// y/n question on stdin; an empty answer takes the default
fn confirm(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{} {} ", question, hint);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(parse_answer(&answer, default))
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

/// Request cancellation on the first Ctrl+C
fn cancel_on_ctrl_c(cancel: CancelSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling after the current document...".yellow());
            cancel.cancel();
        }
    })
}
