use anyhow::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::Tool;

/// Encrypts and decrypts secret files on disk
#[async_trait]
pub trait SecretCipher: Send + Sync {
    /// Decrypt `input` into `output`, or to stdout when `output` is None
    async fn decrypt(&self, input: &Path, output: Option<&Path>, identities: &[PathBuf])
        -> Result<()>;

    /// Encrypt `input` to every recipient, writing the ciphertext to `output`
    async fn encrypt(&self, input: &Path, output: &Path, recipients: &[String]) -> Result<()>;

    /// Version string reported by the backend
    async fn version(&self) -> Result<String>;

    fn name(&self) -> &str;
}

/// The `age` command-line tool
pub struct AgeCli {
    tool: Tool,
}

impl AgeCli {
    pub fn new(program: &str) -> Self {
        Self {
            tool: Tool::new("age", program),
        }
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }
}

pub fn decrypt_args(input: &Path, output: Option<&Path>, identities: &[PathBuf]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--decrypt".into()];
    for identity in identities {
        args.push("--identity".into());
        args.push(identity.into());
    }
    if let Some(output) = output {
        args.push("--output".into());
        args.push(output.into());
    }
    args.push(input.into());
    args
}

pub fn encrypt_args(input: &Path, output: &Path, recipients: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--encrypt".into()];
    for recipient in recipients.iter().filter(|r| !r.is_empty()) {
        args.push("--recipient".into());
        args.push(recipient.into());
    }
    args.push("--output".into());
    args.push(output.into());
    args.push(input.into());
    args
}

#[async_trait]
impl SecretCipher for AgeCli {
    async fn decrypt(
        &self,
        input: &Path,
        output: Option<&Path>,
        identities: &[PathBuf],
    ) -> Result<()> {
        let args = decrypt_args(input, output, identities);
        match output {
            Some(_) => self.tool.output(&args).await.map(|_| ())?,
            None => self.tool.passthrough(&args).await?,
        }
        Ok(())
    }

    async fn encrypt(&self, input: &Path, output: &Path, recipients: &[String]) -> Result<()> {
        if recipients.iter().all(|r| r.is_empty()) {
            anyhow::bail!("No recipients specified");
        }
        self.tool
            .output(encrypt_args(input, output, recipients))
            .await?;
        Ok(())
    }

    async fn version(&self) -> Result<String> {
        let out = self.tool.output(["--version"]).await?;
        Ok(String::from_utf8(out)?.trim().to_string())
    }

    fn name(&self) -> &str {
        self.tool.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_decrypt_args_with_identities_and_output() {
        let args = decrypt_args(
            Path::new("secret.age"),
            Some(Path::new("/tmp/x/secret.age")),
            &[PathBuf::from("/home/u/.ssh/id_ed25519"), PathBuf::from("key.txt")],
        );
        assert_eq!(
            strings(args),
            vec![
                "--decrypt",
                "--identity",
                "/home/u/.ssh/id_ed25519",
                "--identity",
                "key.txt",
                "--output",
                "/tmp/x/secret.age",
                "secret.age",
            ]
        );
    }

    #[test]
    fn test_decrypt_args_to_stdout() {
        let args = decrypt_args(Path::new("secret.age"), None, &[]);
        assert_eq!(strings(args), vec!["--decrypt", "secret.age"]);
    }

    #[test]
    fn test_encrypt_args_skip_empty_recipients() {
        let recipients = vec![
            "age1qqqq".to_string(),
            String::new(),
            "ssh-ed25519 AAAAC3Nza user@host".to_string(),
        ];
        let args = encrypt_args(Path::new("clear"), Path::new("out.age"), &recipients);
        assert_eq!(
            strings(args),
            vec![
                "--encrypt",
                "--recipient",
                "age1qqqq",
                "--recipient",
                "ssh-ed25519 AAAAC3Nza user@host",
                "--output",
                "out.age",
                "clear",
            ]
        );
    }

    #[tokio::test]
    async fn test_encrypt_without_recipients_fails_before_spawning() {
        let age = AgeCli::new("definitely-not-a-real-binary-bgenix");
        let err = age
            .encrypt(Path::new("clear"), Path::new("out"), &[String::new()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No recipients specified");
    }
}
