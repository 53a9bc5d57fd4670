//! Immutable, point-in-time view of the policy.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use gatehouse_core::types::policy::{GroupingRule, PolicyDocument, PolicyRule};

use super::matcher::{action_matches, resource_matches};

/// Maximum role inheritance depth followed during resolution.
pub const MAX_ROLE_DEPTH: usize = 10;

/// A flattened (resource, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedPermission {
    /// Resource pattern.
    pub resource: String,
    /// Action or `*`.
    pub action: String,
}

#[derive(Debug)]
struct Resolution {
    roles: Vec<String>,
    permissions: Vec<ResolvedPermission>,
}

/// One published version of the policy.
///
/// Per-subject resolution is memoized inside the snapshot, so publishing a
/// new snapshot drops every cached answer at once.
#[derive(Debug)]
pub struct PolicySnapshot {
    document: PolicyDocument,
    rules_by_subject: HashMap<String, Vec<ResolvedPermission>>,
    roles_by_subject: HashMap<String, Vec<String>>,
    loaded: bool,
    resolved: DashMap<String, Arc<Resolution>>,
}

impl PolicySnapshot {
    /// A snapshot that has never been loaded. Enforcement against it fails.
    pub fn unloaded() -> Self {
        let mut snapshot = Self::from_document(PolicyDocument::default());
        snapshot.loaded = false;
        snapshot
    }

    /// Build a snapshot from a document.
    pub fn from_document(mut document: PolicyDocument) -> Self {
        document.normalize();

        let mut rules_by_subject: HashMap<String, Vec<ResolvedPermission>> = HashMap::new();
        for rule in &document.rules {
            rules_by_subject
                .entry(rule.subject.clone())
                .or_default()
                .push(ResolvedPermission {
                    resource: rule.resource.clone(),
                    action: rule.action.clone(),
                });
        }

        let mut roles_by_subject: HashMap<String, Vec<String>> = HashMap::new();
        for grouping in &document.groupings {
            roles_by_subject
                .entry(grouping.subject.clone())
                .or_default()
                .push(grouping.role.clone());
        }

        Self {
            document,
            rules_by_subject,
            roles_by_subject,
            loaded: true,
            resolved: DashMap::new(),
        }
    }

    /// Whether this snapshot came from a successful load.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The normalized document this snapshot was built from.
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// Number of permission tuples.
    pub fn rule_count(&self) -> usize {
        self.document.rules.len()
    }

    /// Number of role grants.
    pub fn grouping_count(&self) -> usize {
        self.document.groupings.len()
    }

    /// Whether `subject` holds a permission matching `resource` and `action`.
    pub fn enforce(&self, subject: &str, resource: &str, action: &str) -> bool {
        self.resolve(subject).permissions.iter().any(|p| {
            resource_matches(&p.resource, resource) && action_matches(&p.action, action)
        })
    }

    /// Direct roles first, then inherited ones, breadth-first.
    pub fn roles_of(&self, subject: &str) -> Vec<String> {
        self.resolve(subject).roles.clone()
    }

    /// De-duplicated permissions of `subject` and all of its roles.
    pub fn permissions_of(&self, subject: &str) -> Vec<ResolvedPermission> {
        self.resolve(subject).permissions.clone()
    }

    /// Whether the exact grouping exists.
    pub fn has_grouping(&self, subject: &str, role: &str) -> bool {
        self.roles_by_subject
            .get(subject)
            .is_some_and(|roles| roles.iter().any(|r| r == role))
    }

    /// Whether the exact rule exists.
    pub fn has_rule(&self, rule: &PolicyRule) -> bool {
        self.rules_by_subject.get(&rule.subject).is_some_and(|rules| {
            rules
                .iter()
                .any(|p| p.resource == rule.resource && p.action == rule.action)
        })
    }

    fn resolve(&self, subject: &str) -> Arc<Resolution> {
        if let Some(hit) = self.resolved.get(subject) {
            return Arc::clone(hit.value());
        }
        let resolution = Arc::new(self.compute(subject));
        // Only subjects named in the policy are memoized; the set is bounded
        // by the document.
        if !self.is_known(subject) {
            return resolution;
        }
        self.resolved
            .entry(subject.to_string())
            .or_insert_with(|| Arc::clone(&resolution));
        resolution
    }

    fn is_known(&self, subject: &str) -> bool {
        self.roles_by_subject.contains_key(subject) || self.rules_by_subject.contains_key(subject)
    }

    fn compute(&self, subject: &str) -> Resolution {
        let mut roles = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(subject);

        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((subject, 0));
        while let Some((current, depth)) = queue.pop_front() {
            if depth >= MAX_ROLE_DEPTH {
                continue;
            }
            let Some(direct) = self.roles_by_subject.get(current) else {
                continue;
            };
            for role in direct {
                if seen.insert(role.as_str()) {
                    roles.push(role.clone());
                    queue.push_back((role.as_str(), depth + 1));
                }
            }
        }

        let mut permissions = Vec::new();
        let mut unique: HashSet<&ResolvedPermission> = HashSet::new();
        let holders = std::iter::once(subject).chain(roles.iter().map(String::as_str));
        for holder in holders {
            if let Some(rules) = self.rules_by_subject.get(holder) {
                for rule in rules {
                    if unique.insert(rule) {
                        permissions.push(rule.clone());
                    }
                }
            }
        }

        Resolution { roles, permissions }
    }
}

/// Adds `grouping` to `document`; returns whether it was new.
pub(crate) fn insert_grouping(document: &mut PolicyDocument, grouping: GroupingRule) -> bool {
    if document.groupings.contains(&grouping) {
        return false;
    }
    document.groupings.push(grouping);
    true
}

/// Removes `grouping` from `document`; returns whether it was present.
pub(crate) fn remove_grouping(document: &mut PolicyDocument, grouping: &GroupingRule) -> bool {
    let before = document.groupings.len();
    document.groupings.retain(|g| g != grouping);
    document.groupings.len() != before
}

/// Adds `rule` to `document`; returns whether it was new.
pub(crate) fn insert_rule(document: &mut PolicyDocument, rule: PolicyRule) -> bool {
    if document.rules.contains(&rule) {
        return false;
    }
    document.rules.push(rule);
    true
}

/// Removes `rule` from `document`; returns whether it was present.
pub(crate) fn remove_rule(document: &mut PolicyDocument, rule: &PolicyRule) -> bool {
    let before = document.rules.len();
    document.rules.retain(|r| r != rule);
    document.rules.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot() -> PolicySnapshot {
        PolicySnapshot::from_document(PolicyDocument {
            rules: vec![
                PolicyRule::new("admin", "/api/v1/users", "GET"),
                PolicyRule::new("auditor", "/api/v1/logs/*", "GET"),
                PolicyRule::new("root", "*", "*"),
            ],
            groupings: vec![
                GroupingRule::new("1", "admin"),
                GroupingRule::new("admin", "auditor"),
                GroupingRule::new("2", "root"),
            ],
        })
    }

    #[test]
    fn test_direct_role_permission() {
        let snapshot = make_snapshot();
        assert!(snapshot.enforce("1", "/api/v1/users", "GET"));
        assert!(!snapshot.enforce("1", "/api/v1/users", "DELETE"));
    }

    #[test]
    fn test_inherited_role_permission() {
        let snapshot = make_snapshot();
        assert!(snapshot.enforce("1", "/api/v1/logs/today", "GET"));
        assert_eq!(snapshot.roles_of("1"), vec!["admin", "auditor"]);
    }

    #[test]
    fn test_unknown_subject_denied() {
        let snapshot = make_snapshot();
        assert!(!snapshot.enforce("99", "/api/v1/users", "GET"));
        assert!(snapshot.roles_of("99").is_empty());
    }

    #[test]
    fn test_superuser_wildcards() {
        let snapshot = make_snapshot();
        assert!(snapshot.enforce("2", "/anything/at/all", "PATCH"));
    }

    #[test]
    fn test_cycle_terminates() {
        let snapshot = PolicySnapshot::from_document(PolicyDocument {
            rules: vec![PolicyRule::new("b", "/x", "GET")],
            groupings: vec![
                GroupingRule::new("u", "a"),
                GroupingRule::new("a", "b"),
                GroupingRule::new("b", "a"),
            ],
        });
        assert_eq!(snapshot.roles_of("u"), vec!["a", "b"]);
        assert!(snapshot.enforce("u", "/x", "GET"));
    }

    #[test]
    fn test_depth_limit() {
        let mut groupings = vec![GroupingRule::new("u", "r0")];
        for i in 0..15 {
            groupings.push(GroupingRule::new(format!("r{i}"), format!("r{}", i + 1)));
        }
        let snapshot = PolicySnapshot::from_document(PolicyDocument {
            rules: vec![PolicyRule::new("r14", "/deep", "GET")],
            groupings,
        });
        assert_eq!(snapshot.roles_of("u").len(), MAX_ROLE_DEPTH);
        assert!(!snapshot.enforce("u", "/deep", "GET"));
    }

    #[test]
    fn test_permissions_deduplicated() {
        let snapshot = PolicySnapshot::from_document(PolicyDocument {
            rules: vec![
                PolicyRule::new("a", "/x", "GET"),
                PolicyRule::new("b", "/x", "GET"),
            ],
            groupings: vec![GroupingRule::new("u", "a"), GroupingRule::new("u", "b")],
        });
        assert_eq!(snapshot.permissions_of("u").len(), 1);
    }

    #[test]
    fn test_memo_holds_only_policy_subjects() {
        let snapshot = make_snapshot();
        for i in 0..1000 {
            assert!(!snapshot.enforce(&format!("stranger-{i}"), "/api/v1/users", "GET"));
        }
        assert!(snapshot.enforce("1", "/api/v1/users", "GET"));
        assert!(snapshot.enforce("1", "/api/v1/users", "GET"));

        assert_eq!(snapshot.resolved.len(), 1);
        assert!(snapshot.resolved.contains_key("1"));
    }

    #[test]
    fn test_unloaded_flag() {
        assert!(!PolicySnapshot::unloaded().is_loaded());
        assert!(make_snapshot().is_loaded());
    }
}
