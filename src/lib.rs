pub mod cli;
pub mod config;
pub mod rules;
pub mod secrets;
pub mod tools;

pub use config::Config;

use std::path::PathBuf;

pub fn home_dir() -> anyhow::Result<PathBuf> {
    home::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))
}
