use serde::{Deserialize, Serialize};

use crate::models::{EntryKind, EntryView};
use crate::services::summary::{SummaryError, SummaryOutcome, NO_DATA};

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub end: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_income: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_expense: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomes: Option<Vec<EntryView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expenses: Option<Vec<EntryView>>,
}

impl SummaryResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            total_income: None,
            total_expense: None,
            net: None,
            incomes: None,
            expenses: None,
        }
    }

    /// Body for a validation failure; the status code is chosen by the handler.
    pub fn invalid(err: &SummaryError) -> Self {
        Self::failure(err.to_string())
    }
}

impl From<SummaryOutcome> for SummaryResponse {
    fn from(outcome: SummaryOutcome) -> Self {
        match outcome {
            SummaryOutcome::NoData { .. } => Self::failure(NO_DATA),
            SummaryOutcome::Report(report) => Self {
                status: true,
                message: "Summary fetched successfully".to_string(),
                total_income: Some(report.total_income),
                total_expense: Some(report.total_expense),
                net: Some(report.net),
                incomes: Some(
                    report
                        .incomes
                        .into_iter()
                        .map(|entry| EntryView {
                            kind: EntryKind::Income,
                            entry,
                        })
                        .collect(),
                ),
                expenses: Some(
                    report
                        .expenses
                        .into_iter()
                        .map(|entry| EntryView {
                            kind: EntryKind::Expense,
                            entry,
                        })
                        .collect(),
                ),
            },
        }
    }
}
