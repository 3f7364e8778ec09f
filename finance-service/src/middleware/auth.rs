use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::services::{Principal, ServiceError};
use crate::AppState;

/// Resolves the bearer token into a [`Principal`] stored in the request
/// extensions. Tokens of deleted or inactive users are refused.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state.jwt.validate(token)?;

    let user = state.db.find_user_by_id(&claims.sub).await?.ok_or_else(|| {
        tracing::warn!(user_id = %claims.sub, "Token subject no longer exists");
        AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
    })?;

    if !user.is_active() {
        tracing::info!(user_id = %user.id, "Rejected token of inactive user");
        return Err(ServiceError::InactiveUser.into());
    }

    req.extensions_mut().insert(Principal {
        id: user.id,
        email: user.email,
        name: user.name,
        role_id: user.role_id,
    });

    Ok(next.run(req).await)
}

/// The principal established by [`auth_middleware`].
pub struct AuthUser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts.extensions.get::<Principal>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Principal missing from request extensions"
            ))
        })?;

        Ok(AuthUser(principal.clone()))
    }
}
