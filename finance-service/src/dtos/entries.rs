//! Request bodies for incomes and expenses. The two differ only in the name
//! of the label field, so handlers are written once against [`EntryBody`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::Validate;

use crate::models::EntryKind;

/// Kind-independent view of an entry body. Every field is optional so the
/// same body serves both creation and partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFields {
    pub id: Option<String>,
    pub label: Option<String>,
    pub date: Option<String>,
    pub amount: Option<f64>,
}

pub trait EntryBody: DeserializeOwned + Validate + Send + 'static {
    const KIND: EntryKind;

    fn into_fields(self) -> EntryFields;
}

#[derive(Debug, Deserialize, Validate)]
pub struct IncomeBody {
    pub id: Option<String>,
    pub source: Option<String>,
    pub date: Option<String>,
    pub amount: Option<f64>,
}

impl EntryBody for IncomeBody {
    const KIND: EntryKind = EntryKind::Income;

    fn into_fields(self) -> EntryFields {
        EntryFields {
            id: self.id,
            label: self.source,
            date: self.date,
            amount: self.amount,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExpenseBody {
    pub id: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub amount: Option<f64>,
}

impl EntryBody for ExpenseBody {
    const KIND: EntryKind = EntryKind::Expense;

    fn into_fields(self) -> EntryFields {
        EntryFields {
            id: self.id,
            label: self.category,
            date: self.date,
            amount: self.amount,
        }
    }
}
