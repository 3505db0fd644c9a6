//! Terminal output for the CLI.
//!
//! Colored status lines, an `indicatif` progress bar that follows the
//! pipeline, and the interactive confirmation prompt for large jobs.

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::{BufRead, IsTerminal, Write};

use crate::pipeline::ConfirmationGate;
use crate::utils::{ProgressListener, Stage};

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different outcomes.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status line; errors and warnings go to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Format a number with commas.
pub fn format_number(n: usize) -> String {
    n.to_string()
        .chars()
        .rev()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .rev()
        .collect()
}

/// Get a human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Shorten text to `max_chars` characters, ending in an ellipsis.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

/// Progress bar tracking chunk processing
#[derive(Clone)]
pub struct ChunkProgress {
    pb: ProgressBar,
}

impl ChunkProgress {
    pub fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        pb.set_style(
            ProgressStyle::with_template(
                "{msg} {bar:40.cyan/blue} {pos}/{len} ({percent}%) {elapsed}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
        );
        Self { pb }
    }

    /// Run `f` with the bar hidden so it can use the terminal
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.pb.suspend(f)
    }
}

impl ProgressListener for ChunkProgress {
    fn stage(&self, stage: Stage) {
        match stage {
            Stage::Done => self.pb.finish_and_clear(),
            stage => self.pb.set_message(stage.to_string()),
        }
    }

    fn chunk_started(&self, current: usize, total: usize) {
        self.pb.set_length(total as u64);
        self.pb.set_message(format!("Chunk {} of {}", current, total));
    }

    fn chunk_completed(&self, current: usize, _total: usize) {
        self.pb.set_position(current as u64);
    }

    fn warning(&self, message: &str) {
        self.pb
            .println(format!("{} {}", status_icon(Status::Warning).yellow().bold(), message));
    }
}

/// Confirmation gate asking on the terminal
#[derive(Clone)]
pub struct StdinGate {
    assume_yes: bool,
    progress: Option<ChunkProgress>,
}

impl StdinGate {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            progress: None,
        }
    }

    /// Hide this progress bar while prompting
    pub fn with_progress(mut self, progress: ChunkProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn prompt(chunk_count: usize) -> bool {
    eprint!(
        "{} This is a large document ({} chunks). Start processing? [y/N] ",
        status_icon(Status::Warning).yellow().bold(),
        chunk_count
    );
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(e) => {
            tracing::warn!("Failed to read confirmation: {}", e);
            false
        }
    }
}

#[async_trait]
impl ConfirmationGate for StdinGate {
    async fn confirm(&self, chunk_count: usize) -> bool {
        if self.assume_yes {
            return true;
        }
        if !std::io::stdin().is_terminal() {
            tracing::warn!(
                "{} chunks need confirmation but stdin is not a terminal; pass --yes to proceed",
                chunk_count
            );
            return false;
        }

        let progress = self.progress.clone();
        tokio::task::spawn_blocking(move || match progress {
            Some(progress) => progress.suspend(|| prompt(chunk_count)),
            None => prompt(chunk_count),
        })
        .await
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 3), "...");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1000000), "1,000,000");
        assert_eq!(format_number(123), "123");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(500), "500 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[tokio::test]
    async fn test_assume_yes_skips_prompt() {
        assert!(StdinGate::new(true).confirm(50).await);
    }

    #[test]
    fn test_hidden_progress_accepts_events() {
        let progress = ChunkProgress::new(true);
        progress.stage(Stage::ExtractingPhrases);
        progress.chunk_started(1, 2);
        progress.chunk_completed(1, 2);
        progress.warning("hidden");
        progress.stage(Stage::Done);
    }
}
