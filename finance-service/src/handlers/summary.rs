use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{SummaryParams, SummaryResponse};
use crate::services::SummaryError;
use crate::AppState;

/// `GET /api/summary?end=YYYY-MM-DD&filter=day|week|month|year`
///
/// Bad input is a 400 with `status: false`; an empty window is a 200 with
/// `status: false`.
pub async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<(StatusCode, Json<SummaryResponse>), AppError> {
    match state
        .summary
        .summarize(params.end.as_deref(), params.filter.as_deref())
        .await
    {
        Ok(outcome) => Ok((StatusCode::OK, Json(SummaryResponse::from(outcome)))),
        Err(e) if e.is_validation() => {
            tracing::info!(error = %e, "Rejected summary request");
            Ok((StatusCode::BAD_REQUEST, Json(SummaryResponse::invalid(&e))))
        }
        Err(e @ SummaryError::Store(_)) => Err(AppError::DatabaseError(anyhow::Error::new(e))),
        Err(e) => Err(AppError::InternalError(anyhow::Error::new(e))),
    }
}
