//! Ordered access stages: bypass, extract, authenticate, authorize.
//!
//! Each stage is a separate method so the HTTP middleware (and tests) can
//! drive them one at a time; [`AccessController::check`] runs them in order.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, warn};

use gatehouse_core::error::AppError;

use crate::policy::PolicyStore;
use crate::token::TokenCodec;

use super::principal::Principal;

/// Scheme prefix of the `Authorization` header.
const BEARER_PREFIX: &str = "Bearer ";

/// The (resource, action) pair a request is authorized against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTarget {
    /// Resource, usually the request path.
    pub resource: String,
    /// Action, usually the HTTP method.
    pub action: String,
}

impl AccessTarget {
    /// Creates a new target.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }
}

/// Transport-independent view of an inbound request.
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    /// Request path, without query.
    pub path: &'a str,
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// Authorization target, when resolvable.
    pub target: Option<AccessTarget>,
}

/// Outcome of a successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The path is public; no principal.
    Bypass,
    /// Authenticated (and authorized when a target was given).
    Granted(Principal),
}

/// Orchestrates token verification and policy enforcement.
#[derive(Debug, Clone)]
pub struct AccessController {
    codec: Arc<TokenCodec>,
    policy: Arc<PolicyStore>,
    skip_paths: HashSet<String>,
}

impl AccessController {
    /// Creates a controller. Skip paths are normalized like request paths.
    pub fn new(codec: Arc<TokenCodec>, policy: Arc<PolicyStore>, skip_paths: &[String]) -> Self {
        Self {
            codec,
            policy,
            skip_paths: skip_paths
                .iter()
                .map(|p| normalize_path(p).to_string())
                .collect(),
        }
    }

    /// Stage 1: whether `path` is on the skip-list.
    pub fn bypass(&self, path: &str) -> bool {
        self.skip_paths.contains(normalize_path(path))
    }

    /// Stage 2: the token from an `Authorization: Bearer <token>` header.
    pub fn extract(authorization: Option<&str>) -> Result<&str, AppError> {
        let header = authorization
            .ok_or_else(|| AppError::missing_token("Authorization header is missing"))?;
        match header.strip_prefix(BEARER_PREFIX) {
            Some(token) if !token.is_empty() && !token.contains(' ') => Ok(token),
            _ => Err(AppError::malformed_header(
                "Authorization header must be 'Bearer <token>'",
            )),
        }
    }

    /// Stage 3: verify the token. Every failure becomes `Unauthorized`; the
    /// precise kind only reaches the log.
    pub fn authenticate(&self, token: &str) -> Result<Principal, AppError> {
        match self.codec.verify(token) {
            Ok(claims) => Ok(Principal::from(claims)),
            Err(e) => {
                warn!(kind = %e.kind, error = %e.message, "Token rejected");
                Err(AppError::unauthorized("Authentication required"))
            }
        }
    }

    /// Stage 5: enforce the policy. A missing target skips the check.
    pub fn authorize(
        &self,
        principal: &Principal,
        target: Option<&AccessTarget>,
    ) -> Result<(), AppError> {
        let Some(target) = target else {
            debug!(subject = %principal.subject_id, "No authorization target, skipping check");
            return Ok(());
        };

        match self.policy.enforce(
            principal.subject_id.as_str(),
            &target.resource,
            &target.action,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(
                    subject = %principal.subject_id,
                    resource = %target.resource,
                    action = %target.action,
                    "Access denied"
                );
                Err(AppError::forbidden(format!(
                    "Subject {} may not {} {}",
                    principal.subject_id, target.action, target.resource
                )))
            }
            Err(e) => {
                error!(kind = %e.kind, error = %e.message, "Policy check failed");
                Err(AppError::internal("Authorization check failed"))
            }
        }
    }

    /// Runs bypass, extract, authenticate and authorize in order.
    pub fn check(&self, request: &AccessRequest<'_>) -> Result<AccessDecision, AppError> {
        if self.bypass(request.path) {
            return Ok(AccessDecision::Bypass);
        }
        let token = Self::extract(request.authorization)?;
        let principal = self.authenticate(token)?;
        self.authorize(&principal, request.target.as_ref())?;
        Ok(AccessDecision::Granted(principal))
    }
}

/// Removes trailing slashes, keeping the root path.
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::ErrorKind;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/health/"), "/health");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("//"), "/");
        assert_eq!(normalize_path("/a/b"), "/a/b");
    }

    #[test]
    fn test_extract_missing() {
        let err = AccessController::extract(None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingToken);
    }

    #[test]
    fn test_extract_empty_token() {
        let err = AccessController::extract(Some("Bearer ")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedHeader);
    }

    #[test]
    fn test_extract_wrong_scheme() {
        for header in ["Basic abc", "bearer abc", "Bearer", "Bearer  abc", "Bearer a b"] {
            let err = AccessController::extract(Some(header)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedHeader, "{header}");
        }
    }

    #[test]
    fn test_extract_ok() {
        let token = AccessController::extract(Some("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }
}
