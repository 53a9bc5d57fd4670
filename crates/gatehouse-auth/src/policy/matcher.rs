//! Resource and action matching.

/// Whether `resource` is covered by `pattern`.
///
/// A pattern ending in `*` matches every resource that starts with the text
/// before the `*` (so a bare `*` matches everything). Any other pattern must
/// equal the resource exactly. A `*` anywhere else is a literal character.
pub fn resource_matches(pattern: &str, resource: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => resource.starts_with(prefix),
        None => pattern == resource,
    }
}

/// Whether `action` is covered by `pattern` (equality or `*`).
pub fn action_matches(pattern: &str, action: &str) -> bool {
    pattern == "*" || pattern == action
}
