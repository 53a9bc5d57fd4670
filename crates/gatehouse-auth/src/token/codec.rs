//! HS256 token issuance and verification.
//!
//! Time-based checks are done here rather than by `jsonwebtoken` so that
//! expiry is exclusive, there is no leeway, and tests can pin the clock
//! through [`TokenCodec::issue_at`] / [`TokenCodec::verify_at`].

use std::collections::HashSet;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use gatehouse_core::config::auth::AuthConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::types::SubjectId;

use super::claims::Claims;

/// Issues, verifies and refreshes signed identity tokens.
#[derive(Clone)]
pub struct TokenCodec {
    /// HMAC key for signing.
    encoding_key: EncodingKey,
    /// HMAC key for verification.
    decoding_key: DecodingKey,
    /// Signature-only validation; time checks are manual.
    validation: Validation,
    /// Value of the `iss` claim.
    issuer: String,
    /// Token lifetime in seconds.
    ttl_seconds: i64,
    /// Whether a non-empty secret was configured.
    keyed: bool,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("keyed", &self.keyed)
            .finish()
    }
}

impl TokenCodec {
    /// Creates a codec from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        let ttl_hours = i64::try_from(config.jwt_ttl_hours).unwrap_or(i64::MAX / 3600);

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.jwt_issuer.clone(),
            ttl_seconds: ttl_hours.saturating_mul(3600),
            keyed: !config.jwt_secret.is_empty(),
        }
    }

    /// Token lifetime in seconds.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issues a token valid from now for the configured lifetime.
    pub fn issue(
        &self,
        subject: &SubjectId,
        username: &str,
        email: &str,
    ) -> Result<String, AppError> {
        self.issue_at(subject, username, email, Utc::now().timestamp())
    }

    /// Issues a token as if the current time were `now` (epoch seconds).
    pub fn issue_at(
        &self,
        subject: &SubjectId,
        username: &str,
        email: &str,
        now: i64,
    ) -> Result<String, AppError> {
        if !self.keyed {
            return Err(AppError::configuration("Token signing secret is not configured"));
        }

        let claims = Claims {
            user_id: subject.clone(),
            username: username.to_string(),
            email: email.to_string(),
            iss: self.issuer.clone(),
            sub: username.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
            nbf: now,
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Failed to sign token", e))
    }

    /// Verifies a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verifies a token as if the current time were `now` (epoch seconds).
    ///
    /// Signature and algorithm are checked first, then `exp` (exclusive)
    /// and `nbf`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AppError> {
        if !self.keyed {
            return Err(AppError::configuration("Token signing secret is not configured"));
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?
            .claims;

        if claims.is_expired_at(now) {
            return Err(AppError::expired(format!(
                "Token expired at {} (now {now})",
                claims.exp
            )));
        }
        if claims.is_premature_at(now) {
            return Err(AppError::not_yet_valid(format!(
                "Token not valid before {} (now {now})",
                claims.nbf
            )));
        }

        Ok(claims)
    }

    /// Verifies `token` and issues a fresh one for the same identity.
    pub fn refresh(&self, token: &str) -> Result<String, AppError> {
        self.refresh_at(token, Utc::now().timestamp())
    }

    /// [`refresh`](Self::refresh) with a pinned clock.
    pub fn refresh_at(&self, token: &str, now: i64) -> Result<String, AppError> {
        let claims = self.verify_at(token, now)?;
        self.issue_at(&claims.user_id, &claims.username, &claims.email, now)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AppError {
    match err.kind() {
        JwtErrorKind::InvalidSignature
        | JwtErrorKind::InvalidAlgorithm
        | JwtErrorKind::InvalidAlgorithmName
        | JwtErrorKind::MissingAlgorithm
        | JwtErrorKind::InvalidKeyFormat => {
            AppError::invalid_signature(format!("Token signature rejected: {err}"))
        }
        JwtErrorKind::ExpiredSignature => AppError::expired("Token has expired"),
        JwtErrorKind::ImmatureSignature => AppError::not_yet_valid("Token is not yet valid"),
        _ => AppError::malformed(format!("Token could not be parsed: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000;

    fn make_codec() -> TokenCodec {
        TokenCodec::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "gatehouse-test".to_string(),
            jwt_ttl_hours: 24,
        })
    }

    #[test]
    fn test_issue_then_verify_round_trips_identity() {
        let codec = make_codec();
        let token = codec
            .issue_at(&SubjectId::from(1u64), "alice", "alice@example.com", T0)
            .unwrap();
        let claims = codec.verify_at(&token, T0 + 60).unwrap();
        assert_eq!(claims.user_id, SubjectId::from(1u64));
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, "gatehouse-test");
        assert_eq!(claims.exp, T0 + 24 * 3600);
    }

    #[test]
    fn test_two_issues_are_distinct_and_both_verify() {
        let codec = make_codec();
        let subject = SubjectId::from(1u64);
        let a = codec.issue_at(&subject, "alice", "a@x", T0).unwrap();
        let b = codec.issue_at(&subject, "alice", "a@x", T0).unwrap();
        assert_ne!(a, b);
        assert!(codec.verify_at(&a, T0).is_ok());
        assert!(codec.verify_at(&b, T0).is_ok());
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let codec = make_codec();
        let token = codec.issue_at(&SubjectId::from(1u64), "a", "a@x", T0).unwrap();
        let exp = T0 + 24 * 3600;
        assert!(codec.verify_at(&token, exp - 1).is_ok());
        assert_eq!(codec.verify_at(&token, exp).unwrap_err().kind, ErrorKind::Expired);
    }

    #[test]
    fn test_verified_after_25_hours_is_expired() {
        let codec = make_codec();
        let token = codec.issue_at(&SubjectId::from(1u64), "a", "a@x", T0).unwrap();
        let err = codec.verify_at(&token, T0 + 25 * 3600).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Expired);
    }

    #[test]
    fn test_not_yet_valid() {
        let codec = make_codec();
        let token = codec.issue_at(&SubjectId::from(1u64), "a", "a@x", T0).unwrap();
        let err = codec.verify_at(&token, T0 - 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotYetValid);
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let codec = make_codec();
        let other = TokenCodec::new(&AuthConfig {
            jwt_secret: "other-secret".to_string(),
            ..AuthConfig::default()
        });
        let token = other.issue_at(&SubjectId::from(1u64), "a", "a@x", T0).unwrap();
        let err = codec.verify_at(&token, T0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_other_algorithm_is_rejected() {
        let codec = make_codec();
        let claims = Claims {
            user_id: SubjectId::from(1u64),
            username: "a".into(),
            email: "a@x".into(),
            iss: "gatehouse-test".into(),
            sub: "a".into(),
            iat: T0,
            exp: T0 + 3600,
            nbf: T0,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        let err = codec.verify_at(&token, T0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = make_codec();
        let err = codec.verify_at("not-a-token", T0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Malformed);
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        let codec = TokenCodec::new(&AuthConfig {
            jwt_secret: String::new(),
            ..AuthConfig::default()
        });
        let err = codec
            .issue_at(&SubjectId::from(1u64), "a", "a@x", T0)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_refresh_preserves_identity() {
        let codec = make_codec();
        let token = codec.issue_at(&SubjectId::from(9u64), "bob", "b@x", T0).unwrap();
        let refreshed = codec.refresh_at(&token, T0 + 3600).unwrap();
        let claims = codec.verify_at(&refreshed, T0 + 3600).unwrap();
        assert_eq!(claims.user_id, SubjectId::from(9u64));
        assert_eq!(claims.exp, T0 + 3600 + 24 * 3600);
    }

    #[test]
    fn test_refresh_of_expired_token_fails() {
        let codec = make_codec();
        let token = codec.issue_at(&SubjectId::from(9u64), "bob", "b@x", T0).unwrap();
        let err = codec.refresh_at(&token, T0 + 48 * 3600).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Expired);
    }
}
