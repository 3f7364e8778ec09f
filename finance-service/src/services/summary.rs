//! Rolling-window income/expense summaries.
//!
//! A window ends at a caller-supplied date and starts exactly one unit
//! (day, week, month or year) earlier. Every non-deleted record dated on or
//! after the start is counted; there is no upper bound, so entries dated after
//! the end date are included as well.

use async_trait::async_trait;
use chrono::{Days, Months, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::models::{EntryKind, LedgerEntry};
use crate::services::metrics::record_summary;

pub const INVALID_UNIT: &str = "Only day/week/month/year filters are allowed";
pub const INVALID_DATE: &str = "Date must be in a format of YYYY-MM-DD";
pub const NO_DATA: &str = "No records of income and expense";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Day,
    Week,
    Month,
    Year,
}

impl WindowUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowUnit::Day => "day",
            WindowUnit::Week => "week",
            WindowUnit::Month => "month",
            WindowUnit::Year => "year",
        }
    }

    /// `date` minus one unit. Month and year steps clamp to the last valid day
    /// of the target month (Mar 31 -> Feb 28, Feb 29 -> Feb 28).
    pub fn step_back(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            WindowUnit::Day => date.checked_sub_days(Days::new(1)),
            WindowUnit::Week => date.checked_sub_days(Days::new(7)),
            WindowUnit::Month => date.checked_sub_months(Months::new(1)),
            WindowUnit::Year => date.checked_sub_months(Months::new(12)),
        }
    }
}

impl FromStr for WindowUnit {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(WindowUnit::Day),
            "week" => Ok(WindowUnit::Week),
            "month" => Ok(WindowUnit::Month),
            "year" => Ok(WindowUnit::Year),
            _ => Err(SummaryError::InvalidUnit),
        }
    }
}

impl fmt::Display for WindowUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Only day/week/month/year filters are allowed")]
    InvalidUnit,

    #[error("Date must be in a format of YYYY-MM-DD")]
    InvalidDate,

    #[error("Date is out of the supported range")]
    DateOutOfRange,

    #[error("Failed to fetch ledger entries: {0}")]
    Store(anyhow::Error),

    #[error("Summary totals exceed the representable range")]
    TotalOverflow,
}

impl SummaryError {
    /// True for errors the caller can fix by changing the request.
    pub fn is_validation(&self) -> bool {
        !matches!(self, SummaryError::Store(_) | SummaryError::TotalOverflow)
    }
}

/// Parses `YYYY-MM-DD` with exactly four year digits and two month and day
/// digits. `2022-9-30` and `09-30-2022` are rejected, as are impossible dates.
pub fn parse_strict_date(raw: &str) -> Result<NaiveDate, SummaryError> {
    let bytes = raw.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(SummaryError::InvalidDate);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| SummaryError::InvalidDate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub unit: WindowUnit,
}

impl SummaryWindow {
    pub fn ending_at(end: NaiveDate, unit: WindowUnit) -> Result<Self, SummaryError> {
        let start = unit.step_back(end).ok_or(SummaryError::DateOutOfRange)?;
        Ok(Self { start, end, unit })
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Non-deleted entries of `kind` dated on or after `since`.
    async fn find_entries_since(
        &self,
        kind: EntryKind,
        since: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, anyhow::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub window: SummaryWindow,
    pub total_income: i64,
    pub total_expense: i64,
    pub net: i64,
    pub incomes: Vec<LedgerEntry>,
    pub expenses: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Report(SummaryReport),
    NoData { window: SummaryWindow },
}

// 2^63; every rounded amount below this fits in an i64
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn rounded_amount(amount: f64) -> Option<i64> {
    let rounded = amount.round();
    (rounded.is_finite() && rounded > -I64_BOUND && rounded < I64_BOUND).then(|| rounded as i64)
}

/// Rounds each amount to the nearest integer (half away from zero) before
/// adding it, so `[0.4, 0.4]` totals 0. Fails rather than saturating when an
/// amount or the running total leaves the i64 range.
pub fn rounded_total(entries: &[LedgerEntry]) -> Result<i64, SummaryError> {
    entries.iter().try_fold(0i64, |total, e| {
        rounded_amount(e.amount)
            .and_then(|amount| total.checked_add(amount))
            .ok_or(SummaryError::TotalOverflow)
    })
}

#[derive(Clone)]
pub struct SummaryAggregator {
    store: Arc<dyn RecordStore>,
}

impl SummaryAggregator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Summarizes the window ending at `end` (today, UTC, when absent).
    pub async fn summarize(
        &self,
        end: Option<&str>,
        unit: Option<&str>,
    ) -> Result<SummaryOutcome, SummaryError> {
        self.summarize_at(end, unit, Utc::now().date_naive()).await
    }

    pub async fn summarize_at(
        &self,
        end: Option<&str>,
        unit: Option<&str>,
        today: NaiveDate,
    ) -> Result<SummaryOutcome, SummaryError> {
        let result = self.run(end, unit, today).await;

        let unit_label = match &result {
            Ok(SummaryOutcome::Report(r)) => r.window.unit.as_str(),
            Ok(SummaryOutcome::NoData { window }) => window.unit.as_str(),
            Err(_) => unit
                .and_then(|u| u.parse::<WindowUnit>().ok())
                .map(|u| u.as_str())
                .unwrap_or("invalid"),
        };
        let outcome = match &result {
            Ok(SummaryOutcome::Report(_)) => "report",
            Ok(SummaryOutcome::NoData { .. }) => "no_data",
            Err(e) if e.is_validation() => "invalid",
            Err(_) => "error",
        };
        record_summary(unit_label, outcome);

        result
    }

    async fn run(
        &self,
        end: Option<&str>,
        unit: Option<&str>,
        today: NaiveDate,
    ) -> Result<SummaryOutcome, SummaryError> {
        let end = match end {
            Some(raw) => parse_strict_date(raw)?,
            None => today,
        };
        let unit: WindowUnit = unit.ok_or(SummaryError::InvalidUnit)?.parse()?;
        let window = SummaryWindow::ending_at(end, unit)?;

        tracing::debug!(
            start = %window.start,
            end = %window.end,
            unit = %window.unit,
            "Computing summary"
        );

        let (incomes, expenses) = tokio::try_join!(
            self.store.find_entries_since(EntryKind::Income, window.start),
            self.store.find_entries_since(EntryKind::Expense, window.start),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Summary fetch failed");
            SummaryError::Store(e)
        })?;

        if incomes.is_empty() && expenses.is_empty() {
            return Ok(SummaryOutcome::NoData { window });
        }

        let total_income = rounded_total(&incomes)?;
        let total_expense = rounded_total(&expenses)?;
        let net = total_income
            .checked_sub(total_expense)
            .ok_or(SummaryError::TotalOverflow)?;

        Ok(SummaryOutcome::Report(SummaryReport {
            window,
            total_income,
            total_expense,
            net,
            incomes,
            expenses,
        }))
    }
}

/// In-memory [`RecordStore`] for tests.
pub struct MockRecordStore {
    pub entries: Mutex<Vec<(EntryKind, LedgerEntry)>>,
    pub fail: AtomicBool,
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, kind: EntryKind, entry: LedgerEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((kind, entry));
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn find_entries_since(
        &self,
        kind: EntryKind,
        since: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, anyhow::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("mock record store unavailable"));
        }
        let entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock record store mutex poisoned: {}", e))?;
        Ok(entries
            .iter()
            .filter(|(k, e)| *k == kind && !e.deleted && e.calendar_date() >= since)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn entry(day: &str, amount: f64) -> LedgerEntry {
        LedgerEntry::new("Salary".to_string(), date(day), amount, "user-1".to_string())
    }

    fn aggregator(entries: Vec<(EntryKind, LedgerEntry)>) -> (SummaryAggregator, Arc<MockRecordStore>) {
        let store = Arc::new(MockRecordStore::new());
        for (kind, e) in entries {
            store.insert(kind, e);
        }
        (SummaryAggregator::new(store.clone()), store)
    }

    fn report(outcome: SummaryOutcome) -> SummaryReport {
        match outcome {
            SummaryOutcome::Report(r) => r,
            other => panic!("expected a report, got {:?}", other),
        }
    }

    #[test]
    fn test_unit_parsing_is_exact() {
        assert_eq!("day".parse::<WindowUnit>().unwrap(), WindowUnit::Day);
        assert_eq!("year".parse::<WindowUnit>().unwrap(), WindowUnit::Year);
        for bad in ["", "Day", "days", " month", "quarter"] {
            assert!(matches!(bad.parse::<WindowUnit>(), Err(SummaryError::InvalidUnit)));
        }
    }

    #[test]
    fn test_strict_date_parsing() {
        assert_eq!(parse_strict_date("2022-09-30").unwrap(), date("2022-09-30"));
        for bad in [
            "2022-13-01",
            "09-30-2022",
            "2022-9-30",
            "2022-09-3",
            "2022-02-30",
            "2022/09/30",
            "2022-09-30T00:00:00",
            "+022-09-30",
            "",
        ] {
            assert!(
                matches!(parse_strict_date(bad), Err(SummaryError::InvalidDate)),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_window_steps() {
        let end = date("2022-10-02");
        assert_eq!(WindowUnit::Day.step_back(end), Some(date("2022-10-01")));
        assert_eq!(WindowUnit::Week.step_back(end), Some(date("2022-09-25")));
        assert_eq!(WindowUnit::Month.step_back(end), Some(date("2022-09-02")));
        assert_eq!(WindowUnit::Year.step_back(end), Some(date("2021-10-02")));
    }

    #[test]
    fn test_month_and_year_steps_clamp() {
        assert_eq!(
            WindowUnit::Month.step_back(date("2022-03-31")),
            Some(date("2022-02-28"))
        );
        assert_eq!(
            WindowUnit::Month.step_back(date("2024-03-31")),
            Some(date("2024-02-29"))
        );
        assert_eq!(
            WindowUnit::Year.step_back(date("2024-02-29")),
            Some(date("2023-02-28"))
        );
    }

    #[tokio::test]
    async fn test_date_is_checked_before_unit() {
        let (agg, _) = aggregator(vec![]);
        let err = agg.summarize(Some("not-a-date"), Some("fortnight")).await.unwrap_err();
        assert!(matches!(err, SummaryError::InvalidDate));

        let err = agg.summarize(Some("2022-09-30"), Some("fortnight")).await.unwrap_err();
        assert!(matches!(err, SummaryError::InvalidUnit));

        let err = agg.summarize(Some("2022-09-30"), None).await.unwrap_err();
        assert!(matches!(err, SummaryError::InvalidUnit));
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_invalid_date_is_rejected() {
        let (agg, _) = aggregator(vec![(EntryKind::Income, entry("2022-09-30", 10.0))]);
        for bad in ["2022-13-01", "09-30-2022", "2022-9-30"] {
            let err = agg.summarize(Some(bad), Some("month")).await.unwrap_err();
            assert!(matches!(err, SummaryError::InvalidDate));
        }
    }

    #[tokio::test]
    async fn test_window_lower_bound_is_inclusive() {
        let (agg, _) = aggregator(vec![
            (EntryKind::Income, entry("2022-09-01", 1000.0)),
            (EntryKind::Income, entry("2022-09-02", 100.0)),
            (EntryKind::Expense, entry("2022-09-15", 40.0)),
        ]);

        let r = report(agg.summarize(Some("2022-10-02"), Some("month")).await.unwrap());
        assert_eq!(r.window.start, date("2022-09-02"));
        assert_eq!(r.window.end, date("2022-10-02"));
        assert_eq!(r.total_income, 100);
        assert_eq!(r.total_expense, 40);
        assert_eq!(r.incomes.len(), 1);
    }

    #[tokio::test]
    async fn test_entries_after_end_date_are_included() {
        let (agg, _) = aggregator(vec![(EntryKind::Income, entry("2023-01-15", 5.0))]);
        let r = report(agg.summarize(Some("2022-10-02"), Some("week")).await.unwrap());
        assert_eq!(r.total_income, 5);
    }

    #[tokio::test]
    async fn test_per_item_rounding() {
        let (agg, _) = aggregator(vec![
            (EntryKind::Income, entry("2022-09-20", 10.4)),
            (EntryKind::Income, entry("2022-09-21", 10.6)),
            (EntryKind::Expense, entry("2022-09-20", 0.4)),
            (EntryKind::Expense, entry("2022-09-21", 0.4)),
        ]);
        let r = report(agg.summarize(Some("2022-09-30"), Some("month")).await.unwrap());
        assert_eq!(r.total_income, 21);
        assert_eq!(r.total_expense, 0);
        assert_eq!(r.net, 21);
    }

    #[tokio::test]
    async fn test_net_can_be_negative() {
        let (agg, _) = aggregator(vec![
            (EntryKind::Income, entry("2022-09-20", 500.0)),
            (EntryKind::Expense, entry("2022-09-21", 300.0)),
            (EntryKind::Expense, entry("2022-09-22", 400.0)),
        ]);
        let r = report(agg.summarize(Some("2022-09-30"), Some("month")).await.unwrap());
        assert_eq!(r.total_income, 500);
        assert_eq!(r.total_expense, 700);
        assert_eq!(r.net, -200);
    }

    #[tokio::test]
    async fn test_empty_window_is_no_data() {
        let (agg, _) = aggregator(vec![(EntryKind::Income, entry("2021-01-01", 50.0))]);
        let outcome = agg.summarize(Some("2022-09-30"), Some("day")).await.unwrap();
        assert!(matches!(outcome, SummaryOutcome::NoData { .. }));
    }

    #[tokio::test]
    async fn test_only_expenses_is_still_a_report() {
        let (agg, _) = aggregator(vec![(EntryKind::Expense, entry("2022-09-30", 12.0))]);
        let r = report(agg.summarize(Some("2022-09-30"), Some("day")).await.unwrap());
        assert_eq!(r.total_income, 0);
        assert_eq!(r.net, -12);
    }

    #[tokio::test]
    async fn test_deleted_entries_are_excluded() {
        let mut gone = entry("2022-09-29", 99.0);
        gone.deleted = true;
        let (agg, _) = aggregator(vec![(EntryKind::Income, gone)]);
        let outcome = agg.summarize(Some("2022-09-30"), Some("week")).await.unwrap();
        assert!(matches!(outcome, SummaryOutcome::NoData { .. }));
    }

    #[tokio::test]
    async fn test_missing_end_defaults_to_today() {
        let (agg, _) = aggregator(vec![(EntryKind::Income, entry("2022-06-10", 7.0))]);
        let r = report(
            agg.summarize_at(None, Some("week"), date("2022-06-12"))
                .await
                .unwrap(),
        );
        assert_eq!(r.window.end, date("2022-06-12"));
        assert_eq!(r.window.start, date("2022-06-05"));
    }

    #[tokio::test]
    async fn test_repeated_requests_agree() {
        let (agg, _) = aggregator(vec![
            (EntryKind::Income, entry("2022-09-10", 250.2)),
            (EntryKind::Expense, entry("2022-09-11", 99.5)),
        ]);
        let first = agg.summarize(Some("2022-09-30"), Some("month")).await.unwrap();
        let second = agg.summarize(Some("2022-09-30"), Some("month")).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rounded_total_rejects_out_of_range_amounts() {
        let small = [entry("2022-09-20", 2.5), entry("2022-09-21", 1.49)];
        assert_eq!(rounded_total(&small).unwrap(), 4);
        assert!(matches!(
            rounded_total(&[entry("2022-09-20", 1e19)]),
            Err(SummaryError::TotalOverflow)
        ));
        assert!(matches!(
            rounded_total(&[entry("2022-09-20", 5e18), entry("2022-09-21", 5e18)]),
            Err(SummaryError::TotalOverflow)
        ));
    }

    #[tokio::test]
    async fn test_huge_amounts_fail_instead_of_overflowing() {
        let (agg, _) = aggregator(vec![
            (EntryKind::Income, entry("2022-09-20", 1e19)),
            (EntryKind::Income, entry("2022-09-21", 1e19)),
        ]);
        let err = agg.summarize(Some("2022-09-30"), Some("month")).await.unwrap_err();
        assert!(matches!(err, SummaryError::TotalOverflow));
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn test_large_totals_keep_exact_net() {
        let (agg, _) = aggregator(vec![
            (EntryKind::Income, entry("2022-09-20", 9e18)),
            (EntryKind::Expense, entry("2022-09-21", 0.0)),
        ]);
        let r = report(agg.summarize(Some("2022-09-30"), Some("month")).await.unwrap());
        assert_eq!(r.net, 9_000_000_000_000_000_000);

        let (agg, _) = aggregator(vec![
            (EntryKind::Income, entry("2022-09-20", 0.0)),
            (EntryKind::Expense, entry("2022-09-21", 9e18)),
            (EntryKind::Expense, entry("2022-09-22", 1e17)),
        ]);
        let r = report(agg.summarize(Some("2022-09-30"), Some("month")).await.unwrap());
        assert_eq!(r.net, -9_100_000_000_000_000_000);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_validation() {
        let (agg, store) = aggregator(vec![]);
        store.set_failing(true);
        let err = agg.summarize(Some("2022-09-30"), Some("month")).await.unwrap_err();
        assert!(matches!(err, SummaryError::Store(_)));
        assert!(!err.is_validation());
    }
}
