// Run configuration: the reorder policy knobs and the column mapping that
// ties spreadsheet headers to the fields the pipeline needs.
//
// Everything here has a `Default` carrying the values the stock sheets were
// built with, and deserializes from JSON with per-field defaults so a config
// file only needs to list what it changes.
use crate::error::{ReorderError, ReorderResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Length of the trailing history window. Only 3 and 5 years are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TrailingWindow {
    ThreeYears,
    FiveYears,
}

impl TrailingWindow {
    pub fn years(self) -> u32 {
        match self {
            TrailingWindow::ThreeYears => 3,
            TrailingWindow::FiveYears => 5,
        }
    }
}

impl TryFrom<u32> for TrailingWindow {
    type Error = String;

    fn try_from(years: u32) -> Result<Self, Self::Error> {
        match years {
            3 => Ok(TrailingWindow::ThreeYears),
            5 => Ok(TrailingWindow::FiveYears),
            other => Err(format!("trailing window must be 3 or 5 years, got {other}")),
        }
    }
}

impl From<TrailingWindow> for u32 {
    fn from(w: TrailingWindow) -> u32 {
        w.years()
    }
}

impl fmt::Display for TrailingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} years", self.years())
    }
}

/// Numeric policy for the order calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderPolicy {
    pub trailing_window_years: TrailingWindow,
    /// Months of peak-year consumption held as safety stock.
    pub safety_stock_cover_months: u32,
    /// Smallest nonzero order the supplier accepts.
    pub minimum_order_qty: u64,
    pub top_n_most_used: usize,
    /// Keep only rows with a positive final order quantity in the
    /// suggestions table.
    pub orders_only: bool,
    /// Count quantity already on order towards the safety stock.
    pub subtract_on_order: bool,
    /// Fail instead of returning an empty result when a table has no rows.
    pub reject_empty_input: bool,
}

impl Default for ReorderPolicy {
    fn default() -> Self {
        Self {
            trailing_window_years: TrailingWindow::FiveYears,
            safety_stock_cover_months: 3,
            minimum_order_qty: 5,
            top_n_most_used: 10,
            orders_only: false,
            subtract_on_order: false,
            reject_empty_input: false,
        }
    }
}

impl ReorderPolicy {
    pub fn validate(&self) -> ReorderResult<()> {
        if self.safety_stock_cover_months == 0 {
            return Err(ReorderError::invalid_policy(
                "safety_stock_cover_months must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Accepted header names for each on-hand field. Matching is
/// case-insensitive on trimmed headers; the first alias is the name used in
/// error messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnHandColumns {
    pub item_id: Vec<String>,
    pub product_name: Vec<String>,
    pub available_physical: Vec<String>,
    pub on_order_qty: Vec<String>,
    pub unit: Vec<String>,
}

impl Default for OnHandColumns {
    fn default() -> Self {
        Self {
            item_id: aliases(&["Item number"]),
            product_name: aliases(&["Product name"]),
            available_physical: aliases(&["Available physical"]),
            on_order_qty: aliases(&["On ordered Qty", "On order quantity"]),
            unit: aliases(&["Unit"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionColumns {
    pub item_id: Vec<String>,
    pub date: Vec<String>,
    pub quantity: Vec<String>,
    pub transaction_type: Vec<String>,
    /// Transaction type values counted as purchases, regardless of sign.
    pub purchase_types: Vec<String>,
    /// Transaction type values counted as consumption, regardless of sign.
    pub consumption_types: Vec<String>,
    /// chrono format strings tried in order when parsing dates.
    pub date_formats: Vec<String>,
}

impl Default for TransactionColumns {
    fn default() -> Self {
        Self {
            item_id: aliases(&["Item number"]),
            date: aliases(&["Physical date", "Date"]),
            quantity: aliases(&["Quantity"]),
            transaction_type: aliases(&["Transaction Type", "Reference"]),
            purchase_types: aliases(&["Purchase order", "Purchase", "Receipt"]),
            consumption_types: aliases(&["Sales order", "Production line", "Consumption", "Issue"]),
            date_formats: aliases(&["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub on_hand: OnHandColumns,
    pub transactions: TransactionColumns,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    pub policy: ReorderPolicy,
    pub columns: ColumnMapping,
}

impl ReorderConfig {
    pub fn from_json_str(s: &str) -> ReorderResult<Self> {
        let cfg: ReorderConfig = serde_json::from_str(s)?;
        cfg.policy.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> ReorderResult<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }
}
