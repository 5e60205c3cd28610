use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_RULES_FILE: &str = "./secrets.nix";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub rules: RulesConfig,
    pub editor: EditorConfig,
    pub identities: IdentitiesConfig,
}

/// Binary names or paths of the external programs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub age: String,
    pub nix_instantiate: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Used when $EDITOR is unset
    pub fallback: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentitiesConfig {
    /// Tried in order when no identity is given on the command line
    pub defaults: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            age: "age".to_string(),
            nix_instantiate: "nix-instantiate".to_string(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_RULES_FILE),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            fallback: "vi".to_string(),
        }
    }
}

impl Default for IdentitiesConfig {
    fn default() -> Self {
        Self {
            defaults: vec![
                "~/.ssh/id_ed25519".to_string(),
                "~/.ssh/id_rsa".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let home = crate::home_dir()?;
        Ok(home.join(".config").join("bgenix"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the user config, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Default identities with `~/` expanded, in configured order
    pub fn default_identities(&self) -> Result<Vec<PathBuf>> {
        self.identities
            .defaults
            .iter()
            .map(|p| expand_home(p))
            .collect()
    }
}

/// Expand a leading `~/` against the home directory
pub fn expand_home(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return crate::home_dir();
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(crate::home_dir()?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}
