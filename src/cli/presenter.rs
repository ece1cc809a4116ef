//! CLI presenter for output formatting

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::recording::{format_clock, RecordingDescriptor};

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
    is_spinner_active: Arc<AtomicBool>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self {
            spinner: None,
            is_spinner_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        self.stop_spinner();
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
        self.is_spinner_active.store(true, Ordering::SeqCst);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        self.finish_spinner(format!("{} {}", "✓".green(), message));
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        self.finish_spinner(format!("{} {}", "✗".red(), message));
    }

    // A spinner is hidden when stderr is not a terminal; the final line must still show
    fn finish_spinner(&mut self, line: String) {
        match self.spinner.take() {
            Some(spinner) if !spinner.is_hidden() => spinner.finish_with_message(line),
            Some(spinner) => {
                spinner.finish_and_clear();
                eprintln!("{}", line);
            }
            None => eprintln!("{}", line),
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    pub fn is_spinner_active(&self) -> bool {
        self.is_spinner_active.load(Ordering::SeqCst)
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout (links, ids and other machine-readable results)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Format capture progress against the cap as a bar plus MM:SS clocks
    pub fn format_progress(&self, elapsed_secs: u64, max_secs: u64) -> String {
        let percent = if max_secs > 0 {
            (elapsed_secs as f64 / max_secs as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        let bar_width = 20;
        let filled = ((percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled;

        format!(
            "[{}{}] {} / {}",
            "█".repeat(filled).cyan(),
            "░".repeat(empty),
            format_clock(elapsed_secs as f64),
            format_clock(max_secs as f64)
        )
    }

    /// Update capture progress
    pub fn update_recording_progress(&self, elapsed_secs: u64, max_secs: u64) {
        let progress = self.format_progress(elapsed_secs, max_secs);
        self.update_spinner(&format!("Recording... {}  (Ctrl+C to stop)", progress));
    }

    /// One line of `whistle list`
    pub fn format_recording_row(&self, descriptor: &RecordingDescriptor) -> String {
        let created = if descriptor.created_at_local.is_empty() {
            &descriptor.created_at
        } else {
            &descriptor.created_at_local
        };
        format!(
            "{}  {}  {}  {}",
            descriptor.id,
            format_clock(descriptor.duration_seconds as f64),
            created.dimmed(),
            descriptor.title
        )
    }

    pub fn recording_row(&self, descriptor: &RecordingDescriptor) {
        println!("{}", self.format_recording_row(descriptor));
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}
