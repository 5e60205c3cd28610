mod about;
mod decrypt;
mod edit;
mod rekey;

pub use about::print_tool_report;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::Config;
use crate::rules::NixRules;
use crate::secrets::{resolve_identities, SecretSession};
use crate::tools::AgeCli;

const NOTES: &str = "\
Notes:
  FILE         an age-encrypted file
  PRIVATE_KEY  a path to a private SSH key used to decrypt FILE
  EDITOR       environment variable of editor to use when editing FILE

If STDIN is not interactive, EDITOR is replaced by a copy of STDIN.

RULES environment variable with path to Nix file specifying recipient public keys.
Defaults to './secrets.nix'";

#[derive(Parser, Debug)]
#[command(name = "bgenix")]
#[command(about = "Edit and rekey age secret files", long_about = None)]
#[command(version, arg_required_else_help = true, after_help = NOTES)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["edit", "decrypt", "rekey"])
))]
pub struct Cli {
    /// Edit FILE using $EDITOR
    #[arg(short, long, value_name = "FILE")]
    pub edit: Option<String>,

    /// Decrypt FILE to STDOUT
    #[arg(short, long, value_name = "FILE")]
    pub decrypt: Option<String>,

    /// Re-encrypt all secrets with specified recipients
    #[arg(short, long)]
    pub rekey: bool,

    /// Identity to use when decrypting (repeatable)
    #[arg(short, long = "identity", value_name = "PRIVATE_KEY")]
    pub identities: Vec<PathBuf>,

    /// Nix file specifying recipient public keys [env: RULES]
    #[arg(long, value_name = "RULES")]
    pub rules: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Mode<'a> {
    Edit(&'a str),
    Decrypt(&'a str),
    Rekey,
}

impl Cli {
    pub fn mode(&self) -> Result<Mode<'_>> {
        match (&self.edit, &self.decrypt, self.rekey) {
            (Some(file), None, false) => Ok(Mode::Edit(file)),
            (None, Some(file), false) => Ok(Mode::Decrypt(file)),
            (None, None, true) => Ok(Mode::Rekey),
            _ => Err(anyhow::anyhow!(
                "Exactly one of --edit, --decrypt or --rekey is required"
            )),
        }
    }

    /// `--rules`, then a non-empty `RULES`, then the config file
    fn rules_file(&self, env: Option<OsString>, config: &Config) -> PathBuf {
        self.rules
            .clone()
            .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| config.rules.file.clone())
    }

    pub async fn run(&self) -> Result<()> {
        let mode = self.mode()?;
        let config = Config::load()?;

        let rules_file = self.rules_file(std::env::var_os("RULES"), &config);
        log::debug!("Rules file: {}", rules_file.display());

        let identities = resolve_identities(&self.identities, &config.default_identities()?)?;

        let age = AgeCli::new(&config.tools.age);
        let nix = NixRules::new(&config.tools.nix_instantiate);
        let session = SecretSession::new(&age, &nix, rules_file, identities);

        match mode {
            Mode::Edit(file) => edit::run(&session, file, &config).await,
            Mode::Decrypt(file) => decrypt::run(&session, file).await,
            Mode::Rekey => rekey::run(&session).await,
        }
    }
}
