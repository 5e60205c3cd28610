pub mod commands;
pub mod output;
pub mod progress;

pub use commands::{print_tool_report, Cli};
pub use output::Output;
pub use progress::Progress;
