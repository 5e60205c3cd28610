use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::RulesEvaluator;
use crate::tools::Tool;

/// Evaluates a `secrets.nix` rules file with `nix-instantiate`
pub struct NixRules {
    tool: Tool,
}

impl NixRules {
    pub fn new(program: &str) -> Self {
        Self {
            tool: Tool::new("nix-instantiate", program),
        }
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn eval(&self, expr: &str, strict: bool) -> Result<Vec<u8>> {
        let mut args = vec!["--json", "--eval"];
        if strict {
            args.push("--strict");
        }
        args.extend(["-E", expr]);
        Ok(self.tool.output(args).await?)
    }
}

/// Quote a string as a Nix string literal
pub fn nix_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn public_keys_expr(rules: &Path, file: &str) -> String {
    format!(
        "(let rules = import {}; in rules.{}.publicKeys)",
        nix_string(&rules.to_string_lossy()),
        nix_string(file)
    )
}

pub fn attr_names_expr(rules: &Path) -> String {
    format!(
        "(let rules = import {}; in builtins.attrNames rules)",
        nix_string(&rules.to_string_lossy())
    )
}

/// Nix `import` resolves relative paths against the expression, not the cwd
fn absolute(rules: &Path) -> Result<PathBuf> {
    std::path::absolute(rules)
        .with_context(|| format!("Failed to resolve rules file {}", rules.display()))
}

fn parse_string_list(json: &[u8]) -> Result<Vec<String>> {
    Ok(serde_json::from_slice(json)?)
}

#[async_trait]
impl RulesEvaluator for NixRules {
    async fn keys_for(&self, rules: &Path, file: &str) -> Result<Vec<String>> {
        let rules_abs = absolute(rules)?;
        let out = self
            .eval(&public_keys_expr(&rules_abs, file), true)
            .await
            .with_context(|| format!("There is no rule for {} in {}", file, rules.display()))?;

        parse_string_list(&out).with_context(|| {
            format!(
                "publicKeys for {} in {} is not a list of strings",
                file,
                rules.display()
            )
        })
    }

    async fn files(&self, rules: &Path) -> Result<Vec<String>> {
        let rules_abs = absolute(rules)?;
        let out = self
            .eval(&attr_names_expr(&rules_abs), false)
            .await
            .with_context(|| format!("Failed to list secrets in {}", rules.display()))?;

        parse_string_list(&out)
            .with_context(|| format!("Unexpected output listing secrets in {}", rules.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nix_string_plain() {
        assert_eq!(nix_string("secret.age"), "\"secret.age\"");
    }

    #[test]
    fn test_nix_string_escapes() {
        assert_eq!(nix_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(nix_string(r"a\b"), r#""a\\b""#);
        assert_eq!(nix_string("${builtins.exec}"), r#""\${builtins.exec}""#);
        assert_eq!(nix_string("cost $5"), "\"cost $5\"");
        assert_eq!(nix_string("a\nb"), r#""a\nb""#);
    }

    #[test]
    fn test_public_keys_expr() {
        let expr = public_keys_expr(Path::new("/repo/secrets.nix"), "db/password.age");
        assert_eq!(
            expr,
            r#"(let rules = import "/repo/secrets.nix"; in rules."db/password.age".publicKeys)"#
        );
    }

    #[test]
    fn test_attr_names_expr() {
        assert_eq!(
            attr_names_expr(Path::new("/repo/secrets.nix")),
            r#"(let rules = import "/repo/secrets.nix"; in builtins.attrNames rules)"#
        );
    }

    #[test]
    fn test_absolute_rules_path() {
        let abs = absolute(Path::new("secrets.nix")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("secrets.nix"));
    }

    #[test]
    fn test_parse_string_list() {
        assert_eq!(
            parse_string_list(br#"["a.age","b.age"]"#).unwrap(),
            vec!["a.age".to_string(), "b.age".to_string()]
        );
        assert!(parse_string_list(b"[]").unwrap().is_empty());
        assert!(parse_string_list(br#"{"a":1}"#).is_err());
        assert!(parse_string_list(b"[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_missing_evaluator_reports_missing_rule() {
        let rules = NixRules::new("definitely-not-a-real-binary-bgenix");
        let err = rules
            .keys_for(Path::new("secrets.nix"), "a.age")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "There is no rule for a.age in secrets.nix");
    }
}
