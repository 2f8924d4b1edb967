// file: src/utils/logging.rs
// description: Tracing subscriber initialization and colored status lines for the cli

use crate::error::RunFailure;
use crate::pipeline::RunSummary;
use colored::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. `RUST_LOG` wins over `verbose` when set.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .with_ansi(colored_output);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

pub fn format_success(msg: &str) -> String {
    format!("{} {}", "✓".green().bold(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    format!("{} {}", "✗".red().bold(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    format!("{} {}", "ℹ".blue().bold(), msg)
}

pub fn format_step(step: usize, total: usize, msg: &str) -> String {
    format!("{} {}", format!("[{}/{}]", step, total).cyan().bold(), msg)
}

pub fn format_summary(input: &str, summary: &RunSummary) -> String {
    format_success(&format!(
        "{}: {} records, {} committed, {} invalid, {} batches, {} retries ({:.2}s)",
        input,
        summary.total_processed,
        summary.total_committed,
        summary.total_invalid,
        summary.batches_committed,
        summary.retries,
        summary.duration.as_secs_f64()
    ))
}

pub fn format_failure(input: &str, failure: &RunFailure) -> String {
    let partial = &failure.partial;
    let line = format!(
        "{}: {} (committed {} valid, {} invalid before abort; {} not committed)",
        input,
        failure,
        partial.total_committed,
        partial.total_invalid,
        partial.uncommitted()
    );
    if failure.is_cancelled() {
        format_warning(&line)
    } else {
        format_error(&line)
    }
}
