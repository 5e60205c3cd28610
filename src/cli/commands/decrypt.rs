use anyhow::Result;

use crate::secrets::SecretSession;

pub async fn run(session: &SecretSession<'_>, file: &str) -> Result<()> {
    session.decrypt(file).await
}
