pub mod age;

pub use age::{AgeCli, SecretCipher};

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} not found ({program}): {source}")]
    NotFound {
        tool: String,
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}{}", format_stderr(.stderr))]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

impl ToolError {
    /// Exit code of the failed child, if it exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Failed { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// An external program invoked as a subprocess
#[derive(Debug, Clone)]
pub struct Tool {
    name: String,
    program: String,
}

impl Tool {
    pub fn new(name: &str, program: &str) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Locate the program on PATH (or check the explicit path)
    pub fn locate(&self) -> Result<PathBuf, ToolError> {
        which::which(&self.program).map_err(|source| ToolError::NotFound {
            tool: self.name.clone(),
            program: self.program.clone(),
            source,
        })
    }

    fn command<I, S>(&self, args: I) -> Result<Command, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self.locate()?;
        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);
        log::debug!("Running {}: {:?}", self.name, cmd.as_std());
        Ok(cmd)
    }

    /// Run to completion and return captured stdout
    pub async fn output<I, S>(&self, args: I) -> Result<Vec<u8>, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .command(args)?
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| self.spawn_error(source))?;

        self.check(output.status, &output.stderr)?;
        Ok(output.stdout)
    }

    /// Run with stdout passed through to ours, stderr captured for errors
    pub async fn passthrough<I, S>(&self, args: I) -> Result<(), ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .command(args)?
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| self.spawn_error(source))?;

        self.check(output.status, &output.stderr)
    }

    /// Run attached to the terminal (all stdio inherited)
    pub async fn interactive<I, S>(&self, args: I) -> Result<(), ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let status = self
            .command(args)?
            .status()
            .await
            .map_err(|source| self.spawn_error(source))?;

        self.check(status, &[])
    }

    fn spawn_error(&self, source: std::io::Error) -> ToolError {
        ToolError::Spawn {
            tool: self.name.clone(),
            source,
        }
    }

    fn check(&self, status: ExitStatus, stderr: &[u8]) -> Result<(), ToolError> {
        if status.success() {
            return Ok(());
        }
        Err(ToolError::Failed {
            tool: self.name.clone(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        })
    }
}
