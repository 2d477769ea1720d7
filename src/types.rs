use crate::config::ReorderPolicy;
use crate::error::Diagnostics;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use tabled::Tabled;

/// A spreadsheet-shaped table: one header row and string cells.
///
/// Rows may be shorter than the header (trailing empty cells are often
/// dropped by exporters); missing cells read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { name: name.into(), headers, rows }
    }

    /// Index of the first header matching any alias, ignoring case and
    /// surrounding whitespace.
    pub fn column(&self, aliases: &[String]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            let alias = alias.trim();
            self.headers.iter().position(|h| h.trim().eq_ignore_ascii_case(alias))
        })
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One stock item after duplicate rows have been merged.
#[derive(Debug, Clone, PartialEq)]
pub struct OnHandRecord {
    pub item_id: String,
    pub product_name: String,
    pub unit: Option<String>,
    pub available_physical: f64,
    pub on_order_qty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Purchase,
    Consumption,
}

/// A parsed ledger row. `quantity` keeps the sign found in the file;
/// `movement` is what the row counts as after the type column is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub item_id: String,
    pub date: NaiveDate,
    pub quantity: f64,
    pub movement: Movement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearBucket {
    /// Calendar year in which this trailing year ends.
    pub year: i32,
    pub purchase: f64,
    pub consumption: f64,
}

/// Per-item purchase and consumption totals, one bucket per trailing year,
/// oldest first. Always exactly `window` buckets long.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualSeries {
    pub buckets: Vec<YearBucket>,
}

impl AnnualSeries {
    /// An all-zero series labelled with the given years.
    pub fn zeroed(years: &[i32]) -> Self {
        let buckets = years
            .iter()
            .map(|&year| YearBucket { year, purchase: 0.0, consumption: 0.0 })
            .collect();
        Self { buckets }
    }

    pub fn window(&self) -> usize {
        self.buckets.len()
    }

    pub fn avg_purchase(&self) -> f64 {
        if self.buckets.is_empty() {
            return 0.0;
        }
        self.buckets.iter().map(|b| b.purchase).sum::<f64>() / self.window() as f64
    }

    pub fn avg_consumption(&self) -> f64 {
        if self.buckets.is_empty() {
            return 0.0;
        }
        self.buckets.iter().map(|b| b.consumption).sum::<f64>() / self.window() as f64
    }

    pub fn max_consumption(&self) -> f64 {
        self.buckets.iter().map(|b| b.consumption).fold(0.0, f64::max)
    }
}

fn serialize_qty<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((v * 10_000.0).round() / 10_000.0)
}

fn serialize_review_flag<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(if *v { "Yes" } else { "No" })
}

fn display_qty(v: &f64) -> String {
    crate::util::format_number(*v, 2)
}

fn display_review_flag(v: &bool) -> String {
    if *v { "Yes".to_string() } else { String::new() }
}

fn display_unit(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

/// One output row: the merged on-hand fields plus everything derived from
/// the history.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct OrderSuggestion {
    #[serde(rename = "Item number")]
    #[tabled(rename = "Item number")]
    pub item_id: String,
    #[serde(rename = "Product name")]
    #[tabled(rename = "Product name")]
    pub product_name: String,
    #[serde(rename = "Unit")]
    #[tabled(rename = "Unit", display_with = "display_unit")]
    pub unit: Option<String>,
    #[serde(rename = "Available physical", serialize_with = "serialize_qty")]
    #[tabled(rename = "Available physical", display_with = "display_qty")]
    pub available_physical: f64,
    #[serde(rename = "On order qty", serialize_with = "serialize_qty")]
    #[tabled(skip)]
    pub on_order_qty: f64,
    #[serde(rename = "Annual Avg Purchase", serialize_with = "serialize_qty")]
    #[tabled(rename = "Annual Avg Purchase", display_with = "display_qty")]
    pub annual_avg_purchase: f64,
    #[serde(rename = "Annual Avg Consumption", serialize_with = "serialize_qty")]
    #[tabled(rename = "Annual Avg Consumption", display_with = "display_qty")]
    pub annual_avg_consumption: f64,
    #[serde(rename = "Annual Max Consumption", serialize_with = "serialize_qty")]
    #[tabled(rename = "Annual Max Consumption", display_with = "display_qty")]
    pub annual_max_consumption: f64,
    #[serde(rename = "Safety Stock", serialize_with = "serialize_qty")]
    #[tabled(rename = "Safety Stock", display_with = "display_qty")]
    pub safety_stock: f64,
    #[serde(rename = "Raw Order Qty")]
    #[tabled(skip)]
    pub raw_order_qty: u64,
    #[serde(rename = "Final Order Qty")]
    #[tabled(rename = "Final Order Qty")]
    pub final_order_qty: u64,
    #[serde(rename = "Flag for Review", serialize_with = "serialize_review_flag")]
    #[tabled(rename = "Flag for Review", display_with = "display_review_flag")]
    pub needs_review: bool,
}

/// Long-format view of one item's yearly buckets.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct AnnualHistoryRow {
    #[serde(rename = "Item number")]
    #[tabled(rename = "Item number")]
    pub item_id: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Purchase", serialize_with = "serialize_qty")]
    #[tabled(rename = "Purchase", display_with = "display_qty")]
    pub purchase: f64,
    #[serde(rename = "Consumption", serialize_with = "serialize_qty")]
    #[tabled(rename = "Consumption", display_with = "display_qty")]
    pub consumption: f64,
}

#[derive(Debug, Serialize)]
pub struct ReorderSummary {
    pub today: NaiveDate,
    pub policy: ReorderPolicy,
    pub total_items: usize,
    pub items_needing_order: usize,
    pub items_needing_review: usize,
    pub total_final_order_qty: u64,
    pub most_used_items: Vec<String>,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable::new(
            "on-hand",
            vec![" Item Number ".into(), "Product name".into()],
            vec![vec!["100".into(), "Bolt".into()], vec!["200".into()]],
        )
    }

    #[test]
    fn column_lookup_ignores_case_and_padding() {
        let t = table();
        assert_eq!(t.column(&["item number".to_string()]), Some(0));
        assert_eq!(t.column(&["SKU".to_string(), "Product name".to_string()]), Some(1));
        assert_eq!(t.column(&["Unit".to_string()]), None);
    }

    #[test]
    fn short_rows_read_as_missing_cells() {
        let t = table();
        assert_eq!(t.cell(1, 0), Some("200"));
        assert_eq!(t.cell(1, 1), None);
        assert_eq!(t.cell(5, 0), None);
    }

    #[test]
    fn series_statistics_use_the_full_window() {
        let mut s = AnnualSeries::zeroed(&[2022, 2023, 2024, 2025, 2026]);
        s.buckets[4].consumption = 24.0;
        s.buckets[1].purchase = 10.0;
        assert_eq!(s.window(), 5);
        assert_eq!(s.avg_consumption(), 4.8);
        assert_eq!(s.max_consumption(), 24.0);
        assert_eq!(s.avg_purchase(), 2.0);
    }
}
