use anyhow::Result;

use crate::cli::{Output, Progress};
use crate::secrets::{EditOutcome, SecretSession};

pub async fn run(session: &SecretSession<'_>) -> Result<()> {
    let spinner = Progress::spinner(&format!(
        "Reading {}",
        session.rules_file().display()
    ));
    let files = match session.files().await {
        Ok(files) => {
            spinner.finish_and_clear();
            files
        }
        Err(e) => {
            Progress::finish_error(&spinner, "Failed to read rules");
            return Err(e);
        }
    };

    if files.is_empty() {
        Output::warning(&format!(
            "No secrets listed in {}",
            session.rules_file().display()
        ));
        return Ok(());
    }
    log::debug!("Secrets to rekey: {:?}", files);

    let pb = Progress::bar(files.len() as u64, "Rekeying");
    let mut rekeyed = 0usize;
    let mut skipped = 0usize;

    for file in &files {
        pb.suspend(|| Output::info(&format!("Rekeying {}...", file)));

        match session.rekey(file).await {
            Ok(EditOutcome::Saved) => rekeyed += 1,
            Ok(EditOutcome::NotCreated | EditOutcome::Unchanged) => {
                skipped += 1;
                pb.suspend(|| Output::warning(&format!("{} doesn't exist, skipping", file)));
            }
            Err(e) => {
                Progress::finish_error(&pb, &format!("Failed to rekey {}", file));
                return Err(e);
            }
        }
        pb.inc(1);
    }

    Progress::finish_success(&pb, &format!("Rekeyed {} secret(s)", rekeyed));
    if skipped > 0 {
        Output::info(&format!("{} secret(s) skipped", skipped));
    }

    Ok(())
}
