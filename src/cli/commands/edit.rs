use anyhow::Result;

use crate::cli::Output;
use crate::config::Config;
use crate::secrets::{EditOutcome, Editor, SecretSession};

pub async fn run(session: &SecretSession<'_>, file: &str, config: &Config) -> Result<()> {
    let editor = Editor::detect(&config.editor.fallback);
    log::debug!("Editor: {:?}", editor);

    match session.edit(file, &editor).await? {
        EditOutcome::Saved => Output::success(&format!("{} saved", file)),
        EditOutcome::Unchanged => Output::warning(&format!(
            "{} wasn't changed, skipping re-encryption.",
            file
        )),
        EditOutcome::NotCreated => Output::warning(&format!("{} wasn't created.", file)),
    }

    Ok(())
}
