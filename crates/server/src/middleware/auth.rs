//! Bearer-token extractors resolving the calling [`Principal`].

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use deployment::Deployment;
use services::services::auth::{Principal, verify_token};

use crate::{DeploymentImpl, error::ApiError};

/// Required authentication; a missing header is a 401.
pub struct Auth(pub Principal);

/// Optional authentication for public reads. A present but invalid token is
/// still rejected.
pub struct MaybeAuth(pub Option<Principal>);

fn bearer_principal(parts: &Parts, deployment: &DeploymentImpl) -> Result<Option<Principal>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let principal = verify_token(token, deployment.jwt_secret())?;
    tracing::debug!(user_id = %principal.user_id, role = %principal.role, "Authenticated request");
    Ok(Some(principal))
}

impl FromRequestParts<DeploymentImpl> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        bearer_principal(parts, deployment)?
            .map(Auth)
            .ok_or(ApiError::Unauthorized)
    }
}

impl FromRequestParts<DeploymentImpl> for MaybeAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(bearer_principal(parts, deployment)?))
    }
}
