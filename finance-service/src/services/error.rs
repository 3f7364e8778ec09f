use service_core::error::AppError;
use thiserror::Error;

pub const NOT_AUTHORIZED: &str = "You are not authorized to do that";
pub const INACTIVE_USER: &str = "You are inactive, Please contact your administrator!";
pub const ROLE_EXISTS: &str = "Role already exists";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("You are inactive, Please contact your administrator!")]
    InactiveUser,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("You are not authorized to do that")]
    NotAuthorized,
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::InvalidCredentials(msg) => AppError::AuthError(anyhow::anyhow!(msg)),
            ServiceError::InactiveUser => AppError::Unauthorized(anyhow::anyhow!(INACTIVE_USER)),
            ServiceError::InvalidToken => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::TokenExpired => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::NotAuthorized => AppError::Forbidden(anyhow::anyhow!(NOT_AUTHORIZED)),
        }
    }
}
