//! CSV policy file backend.
//!
//! Format, one tuple per line:
//!
//! ```text
//! # comment
//! p, admin, /api/v1/users, GET
//! g, 1, admin
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::policy::{PolicyReader, PolicyWriter};
use gatehouse_core::types::policy::{GroupingRule, PolicyDocument, PolicyRule};

use super::model::PolicyModel;

/// Loads and saves the policy as a CSV file.
#[derive(Debug, Clone)]
pub struct FilePolicyAdapter {
    /// Optional model file validated before each load.
    model_path: Option<PathBuf>,
    /// CSV rule file.
    policy_path: PathBuf,
}

impl FilePolicyAdapter {
    /// Creates an adapter for `policy_path`.
    pub fn new(policy_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: None,
            policy_path: policy_path.into(),
        }
    }

    /// Validates `model_path` before every load.
    pub fn with_model(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    /// The CSV file path.
    pub fn policy_path(&self) -> &Path {
        &self.policy_path
    }

    /// Reads and validates the model file, if one is configured.
    pub async fn load_model(&self) -> AppResult<Option<PolicyModel>> {
        let Some(path) = &self.model_path else {
            return Ok(None);
        };
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::configuration(format!("Cannot read model {}: {e}", path.display()))
        })?;
        PolicyModel::parse(&text).await.map(Some)
    }
}

/// Parses CSV policy text.
pub fn parse_policy(text: &str) -> AppResult<PolicyDocument> {
    let mut document = PolicyDocument::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let line_no = idx + 1;
        if fields.iter().any(|f| f.is_empty()) {
            return Err(AppError::configuration(format!(
                "policy line {line_no}: empty field"
            )));
        }
        match fields.as_slice() {
            ["p", subject, resource, action] => {
                document
                    .rules
                    .push(PolicyRule::new(*subject, *resource, *action));
            }
            ["g", subject, role] => {
                document.groupings.push(GroupingRule::new(*subject, *role));
            }
            [kind, ..] => {
                return Err(AppError::configuration(format!(
                    "policy line {line_no}: unsupported '{kind}' entry with {} fields",
                    fields.len()
                )));
            }
            [] => {}
        }
    }

    document.normalize();
    Ok(document)
}

/// Renders a document as CSV policy text.
pub fn render_policy(document: &PolicyDocument) -> String {
    let mut out = String::new();
    for rule in &document.rules {
        out.push_str(&format!(
            "p, {}, {}, {}\n",
            rule.subject, rule.resource, rule.action
        ));
    }
    if !document.rules.is_empty() && !document.groupings.is_empty() {
        out.push('\n');
    }
    for grouping in &document.groupings {
        out.push_str(&format!("g, {}, {}\n", grouping.subject, grouping.role));
    }
    out
}

#[async_trait]
impl PolicyReader for FilePolicyAdapter {
    async fn load_policy(&self) -> AppResult<PolicyDocument> {
        self.load_model().await?;

        let text = match tokio::fs::read_to_string(&self.policy_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = %self.policy_path.display(),
                    "Policy file not found, starting with an empty policy"
                );
                return Ok(PolicyDocument::default());
            }
            Err(e) => return Err(e.into()),
        };

        parse_policy(&text).map_err(|e| {
            AppError::configuration(format!("{}: {}", self.policy_path.display(), e.message))
        })
    }
}

#[async_trait]
impl PolicyWriter for FilePolicyAdapter {
    async fn save_policy(&self, document: &PolicyDocument) -> AppResult<()> {
        if let Some(parent) = self.policy_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp = self.policy_path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, render_policy(document)).await?;
        tokio::fs::rename(&tmp, &self.policy_path).await?;

        info!(
            path = %self.policy_path.display(),
            rules = document.rules.len(),
            groupings = document.groupings.len(),
            "Policy file written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy() {
        let text = "# seed\np, admin, /api/*, GET\n\ng, 1, admin\n";
        let doc = parse_policy(text).unwrap();
        assert_eq!(doc.rules, vec![PolicyRule::new("admin", "/api/*", "GET")]);
        assert_eq!(doc.groupings, vec![GroupingRule::new("1", "admin")]);
    }

    #[test]
    fn test_parse_reports_line() {
        let err = parse_policy("p, admin, /x, GET\nq, nope\n").unwrap_err();
        assert!(err.message.contains("line 2"), "{}", err.message);
    }

    #[test]
    fn test_parse_rejects_short_rule() {
        assert!(parse_policy("p, admin, /x\n").is_err());
        assert!(parse_policy("g, 1, , admin\n").is_err());
    }

    #[test]
    fn test_render_is_parseable() {
        let doc = PolicyDocument {
            rules: vec![PolicyRule::new("admin", "/x", "*")],
            groupings: vec![GroupingRule::new("7", "admin")],
        };
        assert_eq!(parse_policy(&render_policy(&doc)).unwrap(), doc);
    }
}
