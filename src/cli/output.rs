use owo_colors::OwoColorize;

pub struct Output;

impl Output {
    pub const CHECK: &'static str = "✓";
    pub const CROSS: &'static str = "✗";

    pub fn success(message: &str) {
        eprintln!("{} {}", Self::CHECK.green().bold(), message);
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", Self::CROSS.red().bold(), message.red());
    }

    pub fn info(message: &str) {
        eprintln!("{} {}", "ℹ".blue().bold(), message.bright_blue());
    }

    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    /// Key/value line for the tool report under --help
    pub fn field(label: &str, value: &str) {
        println!("{} {}", format!("{}:", label).bright_black(), value);
    }
}
