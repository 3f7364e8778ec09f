//! Income and expense records share one shape and differ only in the name of
//! their label field and the collection they live in.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn collection(&self) -> &'static str {
        match self {
            EntryKind::Income => "incomes",
            EntryKind::Expense => "expenses",
        }
    }

    /// Name of the label field in request bodies (`source` or `category`).
    pub fn label_field(&self) -> &'static str {
        match self {
            EntryKind::Income => "source",
            EntryKind::Expense => "category",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            EntryKind::Income => "Income",
            EntryKind::Expense => "Expense",
        }
    }

    /// Label field name as used in messages.
    pub fn label_title(&self) -> &'static str {
        match self {
            EntryKind::Income => "Source",
            EntryKind::Expense => "Category",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }

    /// Permission guarding `action` on this kind, e.g. `view-income`.
    pub fn permission(&self, action: &str) -> String {
        format!("{}-{}", action, self.as_str())
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub label: String,
    /// Calendar date, stored at UTC midnight.
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub user_id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<mongodb::bson::DateTime>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(label: String, date: NaiveDate, amount: f64, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            label,
            date: midnight_utc(date),
            amount,
            user_id,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn calendar_date(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

/// Partial update of a ledger entry; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub label: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.date.is_none() && self.amount.is_none()
    }
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Ledger entry as returned by the API, with the label under its kind-specific
/// field name and the date as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryView {
    pub kind: EntryKind,
    pub entry: LedgerEntry,
}

impl Serialize for EntryView {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("id", &self.entry.id)?;
        map.serialize_entry(self.kind.label_field(), &self.entry.label)?;
        map.serialize_entry(
            "date",
            &self.entry.calendar_date().format("%Y-%m-%d").to_string(),
        )?;
        map.serialize_entry("amount", &self.entry.amount)?;
        map.serialize_entry("user_id", &self.entry.user_id)?;
        map.serialize_entry("created_at", &self.entry.created_at)?;
        map.end()
    }
}
