//! Normalized policy tuples.

use serde::{Deserialize, Serialize};

/// A permission tuple: `p, subject, resource, action`.
///
/// `subject` is either a subject id or a role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Subject id or role name.
    pub subject: String,
    /// Resource pattern; a trailing `*` matches by prefix.
    pub resource: String,
    /// Action, or `*` for any.
    pub action: String,
}

impl PolicyRule {
    /// Create a new rule.
    pub fn new(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }
}

/// A role grant: `g, subject, role`. The subject may itself be a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupingRule {
    /// Subject id or role name receiving the role.
    pub subject: String,
    /// Granted role.
    pub role: String,
}

impl GroupingRule {
    /// Create a new grouping.
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }
}

/// The complete set of rules a policy backend loads or saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Permission tuples.
    pub rules: Vec<PolicyRule>,
    /// Role grants.
    pub groupings: Vec<GroupingRule>,
}

impl PolicyDocument {
    /// Sort and de-duplicate both tables so documents compare by content.
    pub fn normalize(&mut self) {
        self.rules.sort();
        self.rules.dedup();
        self.groupings.sort();
        self.groupings.dedup();
    }
}
