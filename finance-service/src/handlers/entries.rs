//! Income and expense CRUD. Each handler is generic over the request body
//! type, which fixes the entry kind: `list::<IncomeBody>` serves incomes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Map, Value};
use service_core::error::AppError;

use crate::dtos::{EntryBody, EntryFields};
use crate::middleware::AuthUser;
use crate::models::{EntryKind, EntryPatch, EntryView, LedgerEntry};
use crate::services::ServiceError;
use crate::utils::validation::{validate_amount, validate_entry_date, validate_label, ValidatedJson};
use crate::AppState;

const NOTHING_TO_UPDATE: &str = "Nothing to update";

fn envelope(message: String, key: String, value: Value) -> Json<Value> {
    let mut body = Map::new();
    body.insert("status".to_string(), Value::Bool(true));
    body.insert("message".to_string(), Value::String(message));
    body.insert(key, value);
    Json(Value::Object(body))
}

fn view(kind: EntryKind, entry: LedgerEntry) -> EntryView {
    EntryView { kind, entry }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to serialize entry: {}", e)))
}

pub async fn list<B: EntryBody>(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let kind = B::KIND;
    let entries = state.db.list_entries(kind).await?;
    if entries.is_empty() {
        return Err(ServiceError::NotFound(format!("No {}s are found", kind)).into());
    }
    let views: Vec<EntryView> = entries.into_iter().map(|e| view(kind, e)).collect();
    Ok(envelope(
        format!("{}s fetched successfully", kind.title()),
        format!("{}s", kind),
        to_value(views)?,
    ))
}

pub async fn get_one<B: EntryBody>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = B::KIND;
    let entry = state
        .db
        .find_entry(kind, &id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No {} found", kind)))?;
    Ok(envelope(
        format!("{} fetched successfully", kind.title()),
        kind.as_str().to_string(),
        to_value(view(kind, entry))?,
    ))
}

/// Checks date, then amount, then label; the first failure is reported.
fn new_entry(kind: EntryKind, fields: EntryFields, user_id: String) -> Result<LedgerEntry, ServiceError> {
    let date = validate_entry_date(fields.date.as_deref().unwrap_or_default())?;
    let amount = fields
        .amount
        .ok_or_else(|| ServiceError::Validation("Amount is required".to_string()))
        .and_then(validate_amount)?;
    let label = validate_label(kind, fields.label.as_deref().unwrap_or_default())?;
    Ok(LedgerEntry::new(label, date, amount, user_id))
}

/// Same rules as creation, applied only to the fields that are present. At
/// least one field must be present.
fn patch_from(kind: EntryKind, fields: &EntryFields) -> Result<EntryPatch, ServiceError> {
    let patch = EntryPatch {
        date: fields.date.as_deref().map(validate_entry_date).transpose()?,
        amount: fields.amount.map(validate_amount).transpose()?,
        label: fields
            .label
            .as_deref()
            .map(|l| validate_label(kind, l))
            .transpose()?,
    };
    if patch.is_empty() {
        return Err(ServiceError::Validation(NOTHING_TO_UPDATE.to_string()));
    }
    Ok(patch)
}

pub async fn create<B: EntryBody>(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(body): ValidatedJson<B>,
) -> Result<impl IntoResponse, AppError> {
    let kind = B::KIND;
    let entry = new_entry(kind, body.into_fields(), principal.id)?;
    state.db.insert_entry(kind, &entry).await?;

    tracing::info!(kind = %kind, entry_id = %entry.id, "Entry added");

    Ok((
        StatusCode::CREATED,
        envelope(
            format!("{} added successfully", kind.title()),
            "result".to_string(),
            to_value(view(kind, entry))?,
        ),
    ))
}

pub async fn update<B: EntryBody>(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<B>,
) -> Result<impl IntoResponse, AppError> {
    let kind = B::KIND;
    let fields = body.into_fields();
    let id = fields
        .id
        .clone()
        .ok_or_else(|| ServiceError::Validation("Id is required".to_string()))?;
    let patch = patch_from(kind, &fields)?;

    if !state.db.update_entry(kind, &id, &patch).await? {
        return Err(ServiceError::NotFound(format!("No {} found", kind)).into());
    }

    tracing::info!(kind = %kind, entry_id = %id, "Entry updated");
    Ok(Json(json!({
        "status": true,
        "message": format!("{} updated successfully", kind.title()),
    })))
}

pub async fn remove<B: EntryBody>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = B::KIND;
    if !state.db.soft_delete_entry(kind, &id).await? {
        return Err(ServiceError::NotFound(format!("{} not found!", kind.title())).into());
    }
    tracing::info!(kind = %kind, entry_id = %id, "Entry deleted");
    Ok(Json(json!({
        "status": true,
        "message": format!("{} deleted successfully", kind.title()),
    })))
}
