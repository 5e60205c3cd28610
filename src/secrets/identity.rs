use anyhow::Result;
use std::path::PathBuf;

/// Identities passed to age for decryption.
///
/// Explicit identities must exist. Without any, the defaults that exist on
/// disk are used (possibly none, leaving age to complain).
pub fn resolve_identities(explicit: &[PathBuf], defaults: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !explicit.is_empty() {
        for path in explicit {
            if !path.is_file() {
                anyhow::bail!("Identity file not found: {}", path.display());
            }
        }
        return Ok(explicit.to_vec());
    }

    let found: Vec<PathBuf> = defaults.iter().filter(|p| p.is_file()).cloned().collect();
    if found.is_empty() {
        log::debug!("No default identities found");
    } else {
        log::debug!("Using default identities: {:?}", found);
    }
    Ok(found)
}
