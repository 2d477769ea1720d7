// Error model for the reorder pipeline.
//
// Fatal problems (a table without the columns we need, unreadable files,
// a bad configuration) are `ReorderError`s. Row-level problems never fail a
// run: they are counted as `ParseWarning`s in `Diagnostics`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type used across the crate.
pub type ReorderResult<T> = Result<T, ReorderError>;

#[derive(Debug, Error)]
pub enum ReorderError {
    /// One or more required columns are absent. Every missing column of the
    /// table is listed, not just the first one found.
    #[error("{table} table is missing required columns: {}", .missing.join(", "))]
    Schema { table: String, missing: Vec<String> },

    /// The table had no data rows and the policy rejects empty input.
    #[error("{table} table has no data rows")]
    EmptyInput { table: String },

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("could not persist output: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl ReorderError {
    pub fn schema(table: impl Into<String>, missing: Vec<String>) -> Self {
        Self::Schema { table: table.into(), missing }
    }

    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Self::InvalidPolicy(msg.into())
    }
}

/// Non-fatal, row-level problem. The offending row is left out of the
/// computation and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseWarning {
    BlankItemId,
    NonNumericOnHandQty,
    BlankTransactionItemId,
    UnparseableDate,
    NonNumericQuantity,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParseWarning::BlankItemId => "blank on-hand item id",
            ParseWarning::NonNumericOnHandQty => "non-numeric on-hand quantity",
            ParseWarning::BlankTransactionItemId => "blank transaction item id",
            ParseWarning::UnparseableDate => "unparseable transaction date",
            ParseWarning::NonNumericQuantity => "non-numeric transaction quantity",
        };
        f.write_str(s)
    }
}

/// Counters describing what happened to the input rows during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub on_hand_rows: usize,
    pub merged_duplicate_rows: usize,
    pub transaction_rows: usize,
    pub transactions_in_window: usize,
    pub transactions_out_of_window: usize,
    pub transactions_for_unknown_items: usize,
    pub warnings: BTreeMap<ParseWarning, usize>,
}

impl Diagnostics {
    pub fn record(&mut self, warning: ParseWarning) {
        *self.warnings.entry(warning).or_insert(0) += 1;
    }

    pub fn count(&self, warning: ParseWarning) -> usize {
        self.warnings.get(&warning).copied().unwrap_or(0)
    }

    /// Rows excluded from the transaction aggregation because they could
    /// not be parsed.
    pub fn excluded_transaction_rows(&self) -> usize {
        self.count(ParseWarning::BlankTransactionItemId)
            + self.count(ParseWarning::UnparseableDate)
            + self.count(ParseWarning::NonNumericQuantity)
    }

    pub fn total_warnings(&self) -> usize {
        self.warnings.values().sum()
    }
}
