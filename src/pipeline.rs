// The reorder pipeline: Normalizer -> Historical Aggregator -> Order
// Calculator.
//
// Everything here is a pure function of its inputs. `today` is a
// parameter, never read from the clock, so a run is reproducible.

use crate::config::ReorderConfig;
use crate::error::{Diagnostics, ReorderError, ReorderResult};
use crate::history::{aggregate, parse_transactions, AnnualHistory, HistoryWindow};
use crate::normalize::normalize_on_hand;
use crate::orders::{annual_history_rows, calculate_orders, generate_summary, most_used, orders_needed};
use crate::types::{AnnualHistoryRow, OnHandRecord, OrderSuggestion, RawTable, ReorderSummary};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{info, info_span};

/// Everything one run produces.
#[derive(Debug)]
pub struct ReorderReport {
    pub today: NaiveDate,
    /// One row per on-hand item, or only the rows with something to order
    /// when the policy asks for the orders view.
    pub suggestions: Vec<OrderSuggestion>,
    pub most_used: Vec<OrderSuggestion>,
    pub on_hand: Vec<OnHandRecord>,
    pub history: AnnualHistory,
    pub diagnostics: Diagnostics,
    summary: ReorderSummary,
}

impl ReorderReport {
    pub fn summary(&self) -> &ReorderSummary {
        &self.summary
    }

    pub fn annual_history(&self) -> Vec<AnnualHistoryRow> {
        annual_history_rows(&self.on_hand, &self.history)
    }
}

/// Emptiness is judged on the rows that survived validation, not on the
/// raw row count.
fn check_empty(table: &RawTable, usable_rows: usize, reject: bool) -> ReorderResult<()> {
    if usable_rows == 0 {
        if reject {
            return Err(ReorderError::EmptyInput { table: table.name.clone() });
        }
        info!(table = %table.name, raw_rows = table.len(), "table has no usable rows");
    }
    Ok(())
}

/// Compute order suggestions from an on-hand snapshot and a transaction
/// ledger.
///
/// Schema problems fail the whole run before anything is computed. Row-level
/// problems are counted in `ReorderReport::diagnostics`.
pub fn compute_order_suggestions(
    on_hand: &RawTable,
    transactions: &RawTable,
    config: &ReorderConfig,
    today: NaiveDate,
) -> ReorderResult<ReorderReport> {
    let _span = info_span!("reorder", %today).entered();
    let policy = &config.policy;
    policy.validate()?;

    let mut diagnostics = Diagnostics::default();
    let window = HistoryWindow::new(today, policy.trailing_window_years);

    let records = normalize_on_hand(on_hand, &config.columns.on_hand, &mut diagnostics)?;
    let ledger = parse_transactions(transactions, &config.columns.transactions, &window, &mut diagnostics)?;
    check_empty(on_hand, records.len(), policy.reject_empty_input)?;
    check_empty(transactions, ledger.len(), policy.reject_empty_input)?;

    let known: BTreeSet<&str> = records.iter().map(|r| r.item_id.as_str()).collect();
    diagnostics.transactions_for_unknown_items =
        ledger.iter().filter(|t| !known.contains(t.item_id.as_str())).count();

    let history = aggregate(&ledger, &window);
    let all = calculate_orders(&records, &history, policy);
    let top = most_used(&all, policy.top_n_most_used);
    let summary = generate_summary(today, policy, &all, &top, &diagnostics);

    let suggestions = if policy.orders_only { orders_needed(&all) } else { all };

    info!(
        items = summary.total_items,
        needing_order = summary.items_needing_order,
        needing_review = summary.items_needing_review,
        warnings = diagnostics.total_warnings(),
        "computed order suggestions"
    );

    Ok(ReorderReport {
        today,
        suggestions,
        most_used: top,
        on_hand: records,
        history,
        diagnostics,
        summary,
    })
}
