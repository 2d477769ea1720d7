// Historical aggregation: turns the transaction ledger into per-item yearly
// purchase and consumption buckets over a trailing window.
//
// The window is anchored on an explicit `today`. Bucket k (oldest first)
// covers one trailing year, i.e. the 12 months ending on the same month/day
// as `today` in the year it is labelled with. A date exactly `window` years
// back belongs to the oldest bucket, so the window is closed at both ends.
use crate::config::{TrailingWindow, TransactionColumns};
use crate::error::{Diagnostics, ParseWarning, ReorderResult};
use crate::normalize::require_columns;
use crate::types::{AnnualSeries, Movement, RawTable, TransactionRecord};
use crate::util::{canonical_item_id, parse_date_safe, parse_f64_safe};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryWindow {
    today: NaiveDate,
    // boundaries[k] = today - k years, k = 0..=window
    boundaries: Vec<NaiveDate>,
}

impl HistoryWindow {
    pub fn new(today: NaiveDate, window: TrailingWindow) -> Self {
        let boundaries = (0..=window.years())
            .map(|k| today.checked_sub_months(Months::new(12 * k)).unwrap_or(NaiveDate::MIN))
            .collect();
        Self { today, boundaries }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Number of yearly buckets.
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Earliest date inside the window.
    pub fn start(&self) -> NaiveDate {
        self.boundaries[self.len()]
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.today
    }

    /// Year labels of the buckets, oldest first.
    pub fn years(&self) -> Vec<i32> {
        self.boundaries[..self.len()].iter().rev().map(|d| d.year()).collect()
    }

    /// Bucket position (oldest first) of a date, or `None` when the date
    /// falls outside the window.
    pub fn bucket_index(&self, date: NaiveDate) -> Option<usize> {
        if !self.contains(date) {
            return None;
        }
        let n = self.len();
        let back = (0..n)
            .find(|&k| date > self.boundaries[k + 1])
            .unwrap_or(n - 1);
        Some(n - 1 - back)
    }

    pub fn empty_series(&self) -> AnnualSeries {
        AnnualSeries::zeroed(&self.years())
    }
}

/// Yearly buckets for every item seen in the ledger. Items without history
/// read as an all-zero series.
#[derive(Debug, Clone)]
pub struct AnnualHistory {
    window: HistoryWindow,
    series: BTreeMap<String, AnnualSeries>,
}

impl AnnualHistory {
    pub fn window(&self) -> &HistoryWindow {
        &self.window
    }

    pub fn get(&self, item_id: &str) -> Option<&AnnualSeries> {
        self.series.get(item_id)
    }

    pub fn series_or_zero(&self, item_id: &str) -> AnnualSeries {
        self.get(item_id).cloned().unwrap_or_else(|| self.window.empty_series())
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

fn classify(
    transaction_type: Option<&str>,
    quantity: f64,
    cols: &TransactionColumns,
) -> Option<Movement> {
    let listed = |list: &[String], v: &str| list.iter().any(|t| t.trim().eq_ignore_ascii_case(v));
    if let Some(t) = transaction_type.map(str::trim).filter(|t| !t.is_empty()) {
        if listed(&cols.purchase_types, t) {
            return Some(Movement::Purchase);
        }
        if listed(&cols.consumption_types, t) {
            return Some(Movement::Consumption);
        }
    }
    if quantity > 0.0 {
        Some(Movement::Purchase)
    } else if quantity < 0.0 {
        Some(Movement::Consumption)
    } else {
        None
    }
}

/// Parse the ledger, keeping rows inside the window.
///
/// Rows with an unparseable date or quantity are dropped and counted; rows
/// with a blank item id are dropped and counted; rows outside the window are
/// dropped and counted separately. Zero-quantity rows carry no movement and
/// are skipped.
pub fn parse_transactions(
    table: &RawTable,
    cols: &TransactionColumns,
    window: &HistoryWindow,
    diag: &mut Diagnostics,
) -> ReorderResult<Vec<TransactionRecord>> {
    let idx = require_columns(table, &[&cols.item_id, &cols.date, &cols.quantity])?;
    let (item_col, date_col, qty_col) = (idx[0], idx[1], idx[2]);
    let type_col = table.column(&cols.transaction_type);

    diag.transaction_rows = table.len();
    let mut out = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let Some(item_id) = table.cell(row, item_col).and_then(canonical_item_id) else {
            diag.record(ParseWarning::BlankTransactionItemId);
            continue;
        };
        let Some(date) = parse_date_safe(table.cell(row, date_col), &cols.date_formats) else {
            diag.record(ParseWarning::UnparseableDate);
            continue;
        };
        let Some(quantity) = parse_f64_safe(table.cell(row, qty_col)) else {
            diag.record(ParseWarning::NonNumericQuantity);
            continue;
        };
        if !window.contains(date) {
            diag.transactions_out_of_window += 1;
            continue;
        }
        let kind = type_col.and_then(|c| table.cell(row, c));
        let Some(movement) = classify(kind, quantity, cols) else { continue };
        out.push(TransactionRecord { item_id, date, quantity, movement });
    }

    diag.transactions_in_window = out.len();
    let excluded = diag.excluded_transaction_rows();
    if excluded > 0 {
        warn!(
            excluded,
            blank_item_ids = diag.count(ParseWarning::BlankTransactionItemId),
            unparseable_dates = diag.count(ParseWarning::UnparseableDate),
            non_numeric_quantities = diag.count(ParseWarning::NonNumericQuantity),
            "transaction rows excluded from aggregation"
        );
    }
    Ok(out)
}

/// Sum movement magnitudes into yearly buckets per item.
pub fn aggregate(records: &[TransactionRecord], window: &HistoryWindow) -> AnnualHistory {
    let mut series: BTreeMap<String, AnnualSeries> = BTreeMap::new();
    for r in records {
        let Some(i) = window.bucket_index(r.date) else { continue };
        let s = series
            .entry(r.item_id.clone())
            .or_insert_with(|| window.empty_series());
        let bucket = &mut s.buckets[i];
        match r.movement {
            Movement::Purchase => bucket.purchase += r.quantity.abs(),
            Movement::Consumption => bucket.consumption += r.quantity.abs(),
        }
    }
    info!(
        items = series.len(),
        window_start = %window.start(),
        today = %window.today(),
        "aggregated transaction history"
    );
    AnnualHistory { window: window.clone(), series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ledger(rows: &[(&str, &str, &str, &str)]) -> RawTable {
        RawTable::new(
            "transactions",
            vec![
                "Item number".into(),
                "Physical date".into(),
                "Quantity".into(),
                "Transaction Type".into(),
            ],
            rows.iter()
                .map(|(a, b, c, t)| vec![a.to_string(), b.to_string(), c.to_string(), t.to_string()])
                .collect(),
        )
    }

    fn run(rows: &[(&str, &str, &str, &str)], today: NaiveDate) -> (AnnualHistory, Diagnostics) {
        let w = HistoryWindow::new(today, TrailingWindow::FiveYears);
        let mut diag = Diagnostics::default();
        let recs =
            parse_transactions(&ledger(rows), &TransactionColumns::default(), &w, &mut diag).unwrap();
        (aggregate(&recs, &w), diag)
    }

    #[test]
    fn window_has_one_bucket_per_trailing_year() {
        let w = HistoryWindow::new(d(2026, 10, 16), TrailingWindow::FiveYears);
        assert_eq!(w.years(), vec![2022, 2023, 2024, 2025, 2026]);
        assert_eq!(w.start(), d(2021, 10, 16));
        assert_eq!(w.bucket_index(d(2026, 10, 16)), Some(4));
        assert_eq!(w.bucket_index(d(2025, 10, 17)), Some(4));
        assert_eq!(w.bucket_index(d(2025, 10, 16)), Some(3));
        assert_eq!(w.bucket_index(d(2021, 10, 16)), Some(0));
        assert_eq!(w.bucket_index(d(2021, 10, 15)), None);
        assert_eq!(w.bucket_index(d(2026, 10, 17)), None);
    }

    #[test]
    fn three_year_window() {
        let w = HistoryWindow::new(d(2024, 2, 29), TrailingWindow::ThreeYears);
        assert_eq!(w.len(), 3);
        assert_eq!(w.start(), d(2021, 2, 28));
        assert_eq!(w.years(), vec![2022, 2023, 2024]);
    }

    #[test]
    fn sign_decides_without_a_type_column_match() {
        let (h, _) = run(
            &[
                ("100", "2026-01-10", "-24", ""),
                ("100", "2026-02-10", "30", ""),
                ("100", "2023-05-01", "-6", "Inventory journal"),
            ],
            d(2026, 10, 16),
        );
        let s = h.get("100").unwrap();
        assert_eq!(s.buckets[4].consumption, 24.0);
        assert_eq!(s.buckets[4].purchase, 30.0);
        assert_eq!(s.buckets[1].consumption, 6.0);
        assert_eq!(s.max_consumption(), 24.0);
        assert_eq!(s.avg_consumption(), 6.0);
    }

    #[test]
    fn transaction_type_takes_precedence_over_sign() {
        let (h, _) = run(
            &[
                ("100", "2026-01-10", "12", "Sales order"),
                ("100", "2026-01-11", "-3", "purchase order"),
            ],
            d(2026, 10, 16),
        );
        let s = h.get("100").unwrap();
        assert_eq!(s.buckets[4].consumption, 12.0);
        assert_eq!(s.buckets[4].purchase, 3.0);
    }

    #[test]
    fn bad_rows_are_counted_not_fatal() {
        let (h, diag) = run(
            &[
                ("100", "not a date", "-1", ""),
                ("100", "2026-01-10", "many", ""),
                ("100", "2010-01-01", "-5", ""),
                ("", "2026-01-10", "-5", ""),
                ("100.0", "2026-01-10", "-2", ""),
            ],
            d(2026, 10, 16),
        );
        assert_eq!(diag.count(ParseWarning::UnparseableDate), 1);
        assert_eq!(diag.count(ParseWarning::NonNumericQuantity), 1);
        assert_eq!(diag.count(ParseWarning::BlankTransactionItemId), 1);
        assert_eq!(diag.count(ParseWarning::BlankItemId), 0);
        assert_eq!(diag.excluded_transaction_rows(), 3);
        assert_eq!(diag.transactions_out_of_window, 1);
        assert_eq!(diag.transactions_in_window, 1);
        assert_eq!(h.get("100").unwrap().buckets[4].consumption, 2.0);
    }

    #[test]
    fn missing_ledger_columns_fail_as_one_schema_error() {
        let t = RawTable::new("transactions", vec!["Item number".into()], vec![]);
        let w = HistoryWindow::new(d(2026, 1, 1), TrailingWindow::ThreeYears);
        let err = parse_transactions(&t, &TransactionColumns::default(), &w, &mut Diagnostics::default())
            .unwrap_err();
        match err {
            crate::error::ReorderError::Schema { missing, .. } => {
                assert_eq!(missing, vec!["Physical date", "Quantity"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_items_read_as_zero_series() {
        let (h, _) = run(&[], d(2026, 10, 16));
        let s = h.series_or_zero("999");
        assert_eq!(s.window(), 5);
        assert_eq!(s.max_consumption(), 0.0);
    }

    proptest! {
        #[test]
        fn every_series_spans_the_full_window(
            offsets in prop::collection::vec((0u8..4, 0i64..2500, -50i32..50), 0..60),
            three in any::<bool>(),
        ) {
            let today = d(2026, 10, 16);
            let window = if three { TrailingWindow::ThreeYears } else { TrailingWindow::FiveYears };
            let w = HistoryWindow::new(today, window);
            let records: Vec<TransactionRecord> = offsets
                .iter()
                .filter(|(_, _, q)| *q != 0)
                .map(|(item, back, q)| TransactionRecord {
                    item_id: item.to_string(),
                    date: today - chrono::Duration::days(*back),
                    quantity: *q as f64,
                    movement: if *q > 0 { Movement::Purchase } else { Movement::Consumption },
                })
                .collect();
            let h = aggregate(&records, &w);
            for item in h.items() {
                prop_assert_eq!(h.get(item).unwrap().window(), window.years() as usize);
            }
            let in_window: f64 = records
                .iter()
                .filter(|r| w.contains(r.date))
                .map(|r| r.quantity.abs())
                .sum();
            let bucketed: f64 = h
                .items()
                .flat_map(|i| h.get(i).unwrap().buckets.clone())
                .map(|b| b.purchase + b.consumption)
                .sum();
            prop_assert_eq!(in_window, bucketed);
        }
    }
}
