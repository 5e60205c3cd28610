use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::editor::Editor;
use super::interrupt::Interrupt;
use super::workspace::{install, Workspace};
use crate::rules::{normalize_recipients, RulesEvaluator};
use crate::tools::SecretCipher;

/// What happened to a secret after an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Re-encrypted and written back
    Saved,
    /// Content identical to what was decrypted; ciphertext left alone
    Unchanged,
    /// The editor left no cleartext behind; nothing written
    NotCreated,
}

/// Edits, decrypts and rekeys secrets against one rules file
pub struct SecretSession<'a> {
    cipher: &'a dyn SecretCipher,
    rules: &'a dyn RulesEvaluator,
    rules_file: PathBuf,
    identities: Vec<PathBuf>,
}

impl<'a> SecretSession<'a> {
    pub fn new(
        cipher: &'a dyn SecretCipher,
        rules: &'a dyn RulesEvaluator,
        rules_file: PathBuf,
        identities: Vec<PathBuf>,
    ) -> Self {
        Self {
            cipher,
            rules,
            rules_file,
            identities,
        }
    }

    pub fn rules_file(&self) -> &Path {
        &self.rules_file
    }

    /// Recipients for `file`, failing when the rule lists none
    pub async fn recipients(&self, file: &str) -> Result<Vec<String>> {
        let keys = normalize_recipients(self.rules.keys_for(&self.rules_file, file).await?);
        if keys.is_empty() {
            anyhow::bail!(
                "No recipients for {} in {}",
                file,
                self.rules_file.display()
            );
        }
        log::debug!("{} recipient(s) for {}", keys.len(), file);
        Ok(keys)
    }

    /// Every secret named in the rules file
    pub async fn files(&self) -> Result<Vec<String>> {
        self.rules.files(&self.rules_file).await
    }

    /// Decrypt (if present), edit, and re-encrypt when the content changed
    pub async fn edit(&self, file: &str, editor: &Editor) -> Result<EditOutcome> {
        self.edit_with(file, editor, false).await
    }

    /// Re-encrypt `file` to its current recipients without touching the content
    pub async fn rekey(&self, file: &str) -> Result<EditOutcome> {
        self.edit_with(file, &Editor::Skip, true).await
    }

    async fn edit_with(&self, file: &str, editor: &Editor, force: bool) -> Result<EditOutcome> {
        let target = Path::new(file);
        let existed = target.exists();
        if force && !existed {
            log::debug!("{} has no ciphertext, nothing to rekey", file);
            return Ok(EditOutcome::NotCreated);
        }

        // Ctrl+C from here on must unwind through the workspace drop
        let mut interrupt = Interrupt::listen()?;
        let recipients = interrupt.interruptible(self.recipients(file)).await?;
        let workspace = Workspace::new(target)?;

        if existed {
            log::debug!("Decrypting {} with {}", file, self.cipher.name());
            interrupt
                .interruptible(self.cipher.decrypt(
                    target,
                    Some(workspace.cleartext()),
                    &self.identities,
                ))
                .await
                .with_context(|| format!("Failed to decrypt {}", file))?;
            workspace.take_snapshot()?;
        }

        let edit = editor.edit(workspace.cleartext());
        let edited = if editor.owns_terminal() {
            interrupt.uninterruptible(edit).await
        } else {
            interrupt.interruptible(edit).await
        };
        edited.with_context(|| format!("Failed to edit {}", file))?;

        if !workspace.has_cleartext() {
            return Ok(EditOutcome::NotCreated);
        }

        if existed && !force && workspace.is_unchanged()? {
            return Ok(EditOutcome::Unchanged);
        }

        interrupt
            .interruptible(self.cipher.encrypt(
                workspace.cleartext(),
                workspace.sealed(),
                &recipients,
            ))
            .await
            .with_context(|| format!("Failed to encrypt {}", file))?;

        install(workspace.sealed(), target)?;
        workspace.close()?;

        Ok(EditOutcome::Saved)
    }

    /// Decrypt `file` to stdout
    pub async fn decrypt(&self, file: &str) -> Result<()> {
        // A rule must exist even though its keys aren't needed for decryption
        self.rules.keys_for(&self.rules_file, file).await?;

        let target = Path::new(file);
        if !target.exists() {
            anyhow::bail!("{} does not exist", file);
        }

        self.cipher
            .decrypt(target, None, &self.identities)
            .await
            .with_context(|| format!("Failed to decrypt {}", file))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeCipher, FakeRules};
    use super::*;
    use tempfile::TempDir;

    const ALICE: &str = "age1alice";
    const BOB: &str = "age1bob";

    fn session<'a>(cipher: &'a FakeCipher, rules: &'a FakeRules) -> SecretSession<'a> {
        SecretSession::new(
            cipher,
            rules,
            PathBuf::from("secrets.nix"),
            vec![PathBuf::from("id_ed25519")],
        )
    }

    fn path_str(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_missing_rule_is_an_error() {
        let cipher = FakeCipher::default();
        let rules = FakeRules::default();
        let err = session(&cipher, &rules)
            .edit("nope.age", &Editor::Skip)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "There is no rule for nope.age in secrets.nix");
    }

    #[tokio::test]
    async fn test_rule_without_recipients_is_an_error() {
        let temp = TempDir::new().unwrap();
        let file = path_str(&temp.path().join("empty.age"));
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &["", "  "]);

        let err = session(&cipher, &rules)
            .edit(&file, &Editor::Skip)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("No recipients for"));
        assert!(cipher.encryptions.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_edit_creates_new_secret_in_nested_dir() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("hosts/web/token.age");
        let file = path_str(&target);
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[ALICE, BOB]);

        let editor = Editor::Command("printf 'TOKEN=1' >".to_string());
        let outcome = session(&cipher, &rules).edit(&file, &editor).await.unwrap();

        assert_eq!(outcome, EditOutcome::Saved);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            FakeCipher::seal("TOKEN=1", &[ALICE, BOB])
        );
        // nothing to decrypt for a new file
        assert!(cipher.decryptions.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_edit_reencrypts_changed_content() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("db.age");
        let file = path_str(&target);
        std::fs::write(&target, FakeCipher::seal("old\n", &[ALICE])).unwrap();
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[ALICE, BOB]);

        let editor = Editor::Command("sed -i -e s/old/new/".to_string());
        let outcome = session(&cipher, &rules).edit(&file, &editor).await.unwrap();

        assert_eq!(outcome, EditOutcome::Saved);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            FakeCipher::seal("new\n", &[ALICE, BOB])
        );
        assert_eq!(
            *cipher.decryptions.lock().unwrap(),
            vec![vec![PathBuf::from("id_ed25519")]]
        );
    }

    #[tokio::test]
    async fn test_unchanged_edit_skips_reencryption() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("db.age");
        let file = path_str(&target);
        let original = FakeCipher::seal("same", &[ALICE]);
        std::fs::write(&target, &original).unwrap();
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[ALICE, BOB]);

        let outcome = session(&cipher, &rules)
            .edit(&file, &Editor::Skip)
            .await
            .unwrap();

        assert_eq!(outcome, EditOutcome::Unchanged);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), original);
        assert!(cipher.encryptions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rekey_forces_reencryption() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("db.age");
        let file = path_str(&target);
        std::fs::write(&target, FakeCipher::seal("same", &[ALICE])).unwrap();
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[ALICE, BOB]);

        let outcome = session(&cipher, &rules).rekey(&file).await.unwrap();

        assert_eq!(outcome, EditOutcome::Saved);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            FakeCipher::seal("same", &[ALICE, BOB])
        );
    }

    #[tokio::test]
    async fn test_rekey_missing_secret_is_not_created() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("missing.age");
        let file = path_str(&target);
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[ALICE]);

        let outcome = session(&cipher, &rules).rekey(&file).await.unwrap();

        assert_eq!(outcome, EditOutcome::NotCreated);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_rekey_skips_missing_secret_before_resolving_keys() {
        let temp = TempDir::new().unwrap();
        let file = path_str(&temp.path().join("placeholder.age"));
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[""]);

        let outcome = session(&cipher, &rules).rekey(&file).await.unwrap();

        assert_eq!(outcome, EditOutcome::NotCreated);
        assert!(cipher.encryptions.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_editor_deleting_cleartext_leaves_secret() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("db.age");
        let file = path_str(&target);
        let original = FakeCipher::seal("keep", &[ALICE]);
        std::fs::write(&target, &original).unwrap();
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[ALICE]);

        let editor = Editor::Command("rm".to_string());
        let outcome = session(&cipher, &rules).edit(&file, &editor).await.unwrap();

        assert_eq!(outcome, EditOutcome::NotCreated);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), original);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_editor_aborts_without_writing() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("db.age");
        let file = path_str(&target);
        let original = FakeCipher::seal("keep", &[ALICE]);
        std::fs::write(&target, &original).unwrap();
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[ALICE]);

        let editor = Editor::Command("printf changed > \"$1\"; exit 7; :".to_string());
        let err = session(&cipher, &rules)
            .edit(&file, &editor)
            .await
            .unwrap_err();

        let tool_err = err.downcast_ref::<crate::tools::ToolError>().unwrap();
        assert_eq!(tool_err.exit_code(), Some(7));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), original);
        assert!(cipher.encryptions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decrypt_failure_leaves_secret() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("garbage.age");
        let file = path_str(&target);
        std::fs::write(&target, "not sealed at all").unwrap();
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with(&file, &[ALICE]);

        let err = session(&cipher, &rules)
            .edit(&file, &Editor::Skip)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to decrypt"));
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "not sealed at all"
        );
    }

    #[tokio::test]
    async fn test_decrypt_requires_rule_and_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("db.age");
        let file = path_str(&target);
        let cipher = FakeCipher::default();

        let no_rule = FakeRules::default();
        let err = session(&cipher, &no_rule).decrypt(&file).await.unwrap_err();
        assert!(err.to_string().starts_with("There is no rule for"));

        let rules = FakeRules::default().with(&file, &[ALICE]);
        let err = session(&cipher, &rules).decrypt(&file).await.unwrap_err();
        assert!(err.to_string().ends_with("does not exist"));

        std::fs::write(&target, FakeCipher::seal("x", &[ALICE])).unwrap();
        session(&cipher, &rules).decrypt(&file).await.unwrap();
        assert_eq!(cipher.decryptions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_files_lists_rules() {
        let cipher = FakeCipher::default();
        let rules = FakeRules::default().with("b.age", &[BOB]).with("a.age", &[ALICE]);
        let files = session(&cipher, &rules).files().await.unwrap();
        assert_eq!(files, vec!["a.age".to_string(), "b.age".to_string()]);
    }
}
