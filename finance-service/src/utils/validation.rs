use axum::{
    extract::{FromRequest, Request},
    Json,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

use crate::models::EntryKind;
use crate::services::summary::parse_strict_date;
use crate::services::ServiceError;

/// JSON body that has passed its `validator` rules.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e.body_text())))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

pub fn validate_entry_date(raw: &str) -> Result<NaiveDate, ServiceError> {
    parse_strict_date(raw).map_err(|e| ServiceError::Validation(e.to_string()))
}

pub fn validate_amount(amount: f64) -> Result<f64, ServiceError> {
    if amount < 0.0 || !amount.is_finite() {
        return Err(ServiceError::Validation("Amount cannot be in minus".to_string()));
    }
    Ok(amount)
}

/// Labels need at least three characters (not bytes).
pub fn validate_label(kind: EntryKind, label: &str) -> Result<String, ServiceError> {
    if label.chars().count() < 3 {
        return Err(ServiceError::Validation(format!(
            "{} must be a minimum of 3 characters long",
            kind.label_title()
        )));
    }
    Ok(label.to_string())
}
