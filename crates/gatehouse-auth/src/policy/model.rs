//! Casbin-style model definition.
//!
//! The text is loaded with casbin's own model parser; only the RBAC shape
//! the engine implements is accepted: three-field requests and policies and
//! a two-field role relation.

use casbin::{DefaultModel, Model};

use gatehouse_core::error::AppError;

/// The model every policy file is evaluated under.
pub const DEFAULT_MODEL: &str = r#"[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && keyMatch(r.obj, p.obj) && (r.act == p.act || p.act == "*")
"#;

/// Section keys casbin assigns to the five model sections.
const REQUIRED_SECTIONS: [(&str, &str); 5] = [
    ("r", "request_definition"),
    ("p", "policy_definition"),
    ("g", "role_definition"),
    ("e", "policy_effect"),
    ("m", "matchers"),
];

/// A parsed and validated model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyModel {
    /// Request tokens (`sub, obj, act`).
    pub request: Vec<String>,
    /// Policy tokens (`sub, obj, act`).
    pub policy: Vec<String>,
    /// Role relation tokens (`_, _`).
    pub role: Vec<String>,
    /// Effect expression.
    pub effect: String,
    /// Matcher expression.
    pub matcher: String,
}

impl PolicyModel {
    /// Parse and validate model text.
    pub async fn parse(text: &str) -> Result<Self, AppError> {
        let model = DefaultModel::from_str(text)
            .await
            .map_err(|e| AppError::configuration(format!("Invalid policy model: {e}")))?;
        Self::from_casbin(&model)
    }

    /// The built-in model.
    pub async fn default_model() -> Result<Self, AppError> {
        Self::parse(DEFAULT_MODEL).await
    }

    fn from_casbin(model: &DefaultModel) -> Result<Self, AppError> {
        let data = model.get_model();
        for (key, name) in REQUIRED_SECTIONS {
            let present = data.get(key).is_some_and(|section| section.contains_key(key));
            if !present {
                return Err(AppError::configuration(format!(
                    "model is missing section [{name}]"
                )));
            }
        }

        let value = |key: &str| -> String {
            data.get(key)
                .and_then(|section| section.get(key))
                .map(|assertion| assertion.value.clone())
                .unwrap_or_default()
        };
        let tokens = |key: &str| -> Vec<String> {
            let prefix = format!("{key}_");
            data.get(key)
                .and_then(|section| section.get(key))
                .map(|assertion| {
                    assertion
                        .tokens
                        .iter()
                        .map(|t| t.strip_prefix(&prefix).unwrap_or(t).to_string())
                        .collect()
                })
                .unwrap_or_default()
        };

        let model = Self {
            request: tokens("r"),
            policy: tokens("p"),
            role: value("g").split(',').map(|t| t.trim().to_string()).collect(),
            effect: value("e"),
            matcher: value("m"),
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), AppError> {
        let triple = ["sub", "obj", "act"];
        if self.request != triple {
            return Err(AppError::configuration(format!(
                "request_definition must be 'sub, obj, act', got '{}'",
                self.request.join(", ")
            )));
        }
        if self.policy != triple {
            return Err(AppError::configuration(format!(
                "policy_definition must be 'sub, obj, act', got '{}'",
                self.policy.join(", ")
            )));
        }
        if self.role != ["_", "_"] {
            return Err(AppError::configuration(format!(
                "role_definition must be '_, _', got '{}'",
                self.role.join(", ")
            )));
        }
        Ok(())
    }
}
