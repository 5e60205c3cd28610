pub mod nix;

pub use nix::NixRules;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Answers which recipients may read a secret, and which secrets exist
#[async_trait]
pub trait RulesEvaluator: Send + Sync {
    /// Public keys listed for `file` in the rules file
    async fn keys_for(&self, rules: &Path, file: &str) -> Result<Vec<String>>;

    /// Every secret file named in the rules file
    async fn files(&self, rules: &Path) -> Result<Vec<String>>;
}

static RECIPIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(age1[0-9a-z]+|ssh-(ed25519|rsa) [A-Za-z0-9+/]+=*)(\s.*)?$")
        .expect("valid recipient regex")
});

/// Whether a key looks like an age or SSH public key
pub fn looks_like_recipient(key: &str) -> bool {
    RECIPIENT.is_match(key)
}

/// Trim, drop blanks and duplicates. Unknown formats are kept for age to judge.
pub fn normalize_recipients(keys: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        let key = key.trim();
        if key.is_empty() || out.iter().any(|k| k == key) {
            continue;
        }
        if !looks_like_recipient(key) {
            log::warn!("Unrecognized recipient format: {}", key);
        }
        out.push(key.to_string());
    }
    out
}
