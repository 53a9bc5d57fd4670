//! `CurrentPrincipal` extractor: reads the identity attached by the access
//! middleware.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use gatehouse_auth::Principal;
use gatehouse_core::error::AppError;

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl std::ops::Deref for CurrentPrincipal {
    type Target = Principal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| AppError::unauthorized("No authenticated principal on request"))
    }
}
