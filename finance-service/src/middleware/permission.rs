use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::services::error::NOT_AUTHORIZED;
use crate::services::{AuthorizationGate, Principal};

/// Route-level state for [`require_permission`]: one permission per route.
#[derive(Clone)]
pub struct RequiredPermission {
    gate: AuthorizationGate,
    permission: String,
}

impl RequiredPermission {
    pub fn new(gate: AuthorizationGate, permission: impl Into<String>) -> Self {
        Self {
            gate,
            permission: permission.into(),
        }
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }
}

/// Must run inside the authentication layer. Deny and Fault produce the same
/// response.
pub async fn require_permission(
    State(required): State<RequiredPermission>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = req.extensions().get::<Principal>().ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
    })?;

    let decision = required
        .gate
        .authorize(principal, &required.permission)
        .await;

    if !decision.is_allowed() {
        tracing::info!(
            user_id = %principal.id,
            permission = %required.permission,
            decision = decision.as_str(),
            "Request not authorized"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!(NOT_AUTHORIZED)));
    }

    Ok(next.run(req).await)
}
