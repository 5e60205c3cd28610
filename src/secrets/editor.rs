use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::io::IsTerminal;
use std::path::Path;

use crate::tools::Tool;

/// How the cleartext gets its new content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Editor {
    /// A shell command line; the cleartext path is appended as its last argument
    Command(String),
    /// Replace the cleartext with whatever arrives on stdin
    Stdin,
    /// Leave the cleartext alone (rekeying)
    Skip,
}

impl Editor {
    /// Pick the editor for this process: stdin when it isn't a terminal,
    /// otherwise `$EDITOR`, otherwise `fallback`.
    pub fn detect(fallback: &str) -> Self {
        Self::choose(
            std::io::stdin().is_terminal(),
            std::env::var("EDITOR").ok(),
            fallback,
        )
    }

    fn choose(interactive: bool, value: Option<String>, fallback: &str) -> Self {
        if !interactive {
            return Editor::Stdin;
        }
        match value {
            Some(editor) if !editor.trim().is_empty() => Editor::Command(editor),
            _ => Editor::Command(fallback.to_string()),
        }
    }

    /// Whether the editor runs attached to the terminal
    pub fn owns_terminal(&self) -> bool {
        matches!(self, Editor::Command(_))
    }

    pub async fn edit(&self, path: &Path) -> Result<()> {
        match self {
            Editor::Command(command) => {
                log::debug!("Opening {} with {}", path.display(), command);
                // sh does the word splitting so EDITOR can carry flags
                let script = format!("{} \"$@\"", command);
                let sh = Tool::new("editor", "sh");
                let args = [
                    OsStr::new("-c"),
                    OsStr::new(&script),
                    OsStr::new("bgenix"),
                    path.as_os_str(),
                ];
                sh.interactive(args).await?;
            }
            Editor::Stdin => {
                let mut stdin = tokio::io::stdin();
                let mut file = tokio::fs::File::create(path)
                    .await
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                tokio::io::copy(&mut stdin, &mut file)
                    .await
                    .context("Failed to read secret from stdin")?;
                file.sync_all().await?;
            }
            Editor::Skip => {}
        }
        Ok(())
    }
}
