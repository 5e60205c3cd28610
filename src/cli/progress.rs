use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

use super::Output;

/// Spinners and bars draw on stderr, so decrypted output on stdout stays clean
pub struct Progress;

impl Progress {
    pub fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    pub fn bar(total: u64, message: &str) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{msg} [{bar:30.cyan/dim}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─");
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb
    }

    pub fn finish_success(pb: &ProgressBar, message: &str) {
        pb.finish_with_message(format!("{} {}", Output::CHECK.green(), message));
    }

    pub fn finish_error(pb: &ProgressBar, message: &str) {
        pb.finish_with_message(format!("{} {}", Output::CROSS.red(), message));
    }
}
