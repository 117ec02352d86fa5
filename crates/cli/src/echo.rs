use gosi_core::{RunSummary, StopReason};
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "gosi".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Harvest municipal announcement boards\n".dimmed());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
#[allow(dead_code)]
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print the end-of-run summary, shown regardless of how the run ended
pub fn print_summary(summary: &RunSummary) {
    let reason = match summary.stopped_by {
        StopReason::Cutoff => "date cutoff reached",
        StopReason::PageLimit => "page limit reached",
        StopReason::ErrorBudget => "error budget exhausted",
    };

    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Harvest Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    eprintln!("  {} {}", "Persisted:".dimmed(), summary.items_persisted.to_string().bright_white());
    eprintln!(
        "  {} {}",
        "Skipped (duplicate):".dimmed(),
        summary.items_skipped_duplicate.to_string().bright_white()
    );
    eprintln!(
        "  {} {}",
        "Skipped (failed):".dimmed(),
        summary.items_skipped_failed.to_string().bright_white()
    );
    eprintln!(
        "  {} {}",
        "Attachment failures:".dimmed(),
        summary.attachment_failures.to_string().bright_white()
    );
    eprintln!("  {} {}", "Pages visited:".dimmed(), summary.pages_visited.to_string().bright_white());
    eprintln!("  {} {}", "Stopped:".dimmed(), reason.bright_white());
    eprintln!("  {} {}\n", "Output:".dimmed(), summary.output_dir.display().bright_white());
}
