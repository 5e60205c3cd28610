use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary home for one secret's plaintext while it is being edited.
///
/// Holds two private directories: one for the cleartext and its `.before`
/// snapshot, one for the freshly encrypted output. Both are removed on drop.
pub struct Workspace {
    cleartext_dir: TempDir,
    sealed_dir: TempDir,
    cleartext: PathBuf,
    snapshot: PathBuf,
    sealed: PathBuf,
}

impl Workspace {
    pub fn new(file: &Path) -> Result<Self> {
        let name = file
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", file.display()))?;

        let cleartext_dir = tempfile::Builder::new()
            .prefix("bgenix-decrypted")
            .tempdir()
            .context("Failed to create temp directory")?;
        let sealed_dir = tempfile::Builder::new()
            .prefix("bgenix-reencrypted")
            .tempdir()
            .context("Failed to create temp directory for re-encryption")?;

        let cleartext = cleartext_dir.path().join(name);
        let mut snapshot_name = name.to_os_string();
        snapshot_name.push(".before");
        let snapshot = cleartext_dir.path().join(snapshot_name);
        let sealed = sealed_dir.path().join(name);

        log::debug!("Workspace for {} at {}", file.display(), cleartext.display());

        Ok(Self {
            cleartext_dir,
            sealed_dir,
            cleartext,
            snapshot,
            sealed,
        })
    }

    /// Where the plaintext lives while the editor runs
    pub fn cleartext(&self) -> &Path {
        &self.cleartext
    }

    /// Where the re-encrypted ciphertext is written before it is moved into place
    pub fn sealed(&self) -> &Path {
        &self.sealed
    }

    pub fn has_cleartext(&self) -> bool {
        self.cleartext.is_file()
    }

    /// Copy the decrypted cleartext aside so edits can be detected
    pub fn take_snapshot(&self) -> Result<()> {
        std::fs::copy(&self.cleartext, &self.snapshot).context("Failed to create backup file")?;
        Ok(())
    }

    /// True when a snapshot exists and the cleartext still matches it
    pub fn is_unchanged(&self) -> Result<bool> {
        if !self.snapshot.is_file() || !self.has_cleartext() {
            return Ok(false);
        }
        Ok(file_digest(&self.snapshot)? == file_digest(&self.cleartext)?)
    }

    /// Remove both directories now, reporting failures instead of ignoring them
    pub fn close(self) -> Result<()> {
        self.cleartext_dir
            .close()
            .context("Failed to remove cleartext directory")?;
        self.sealed_dir
            .close()
            .context("Failed to remove re-encryption directory")?;
        Ok(())
    }
}

/// Hex SHA-256 of a file's content
pub fn file_digest(path: &Path) -> Result<String> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Move `from` over `to`, creating parent directories. Falls back to
/// copy + remove when the two sit on different filesystems.
pub fn install(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create directory for {}", to.display())
        })?;
    }

    if let Err(err) = std::fs::rename(from, to) {
        log::debug!("rename failed ({}), copying instead", err);
        std::fs::copy(from, to)
            .with_context(|| format!("Failed to move re-encrypted file to {}", to.display()))?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}
