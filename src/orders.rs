use crate::config::ReorderPolicy;
use crate::error::Diagnostics;
use crate::history::AnnualHistory;
use crate::types::{AnnualHistoryRow, AnnualSeries, OnHandRecord, OrderSuggestion, ReorderSummary};
use crate::util::round_order_qty;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Safety stock covering `cover_months` of the peak year's consumption.
pub fn safety_stock(annual_max_consumption: f64, cover_months: u32) -> f64 {
    (annual_max_consumption / 12.0) * cover_months as f64
}

/// Apply the minimum-order floor: zero stays zero, anything else is at
/// least `minimum_order_qty`.
pub fn apply_floor(raw_order_qty: u64, minimum_order_qty: u64) -> u64 {
    if raw_order_qty == 0 {
        0
    } else {
        raw_order_qty.max(minimum_order_qty)
    }
}

pub fn compute_suggestion(
    rec: &OnHandRecord,
    series: &AnnualSeries,
    policy: &ReorderPolicy,
) -> OrderSuggestion {
    let annual_avg_purchase = series.avg_purchase();
    let annual_avg_consumption = series.avg_consumption();
    let annual_max_consumption = series.max_consumption();
    let safety = safety_stock(annual_max_consumption, policy.safety_stock_cover_months);

    // No consumption at all: the safety-stock formula says nothing about
    // this item, so flag it instead of recommending anything.
    let needs_review = annual_avg_consumption == 0.0 && annual_max_consumption == 0.0;

    let mut covered = rec.available_physical;
    if policy.subtract_on_order {
        covered += rec.on_order_qty;
    }
    let raw_order_qty = if needs_review { 0 } else { round_order_qty(safety - covered) };
    let final_order_qty = apply_floor(raw_order_qty, policy.minimum_order_qty);

    OrderSuggestion {
        item_id: rec.item_id.clone(),
        product_name: rec.product_name.clone(),
        unit: rec.unit.clone(),
        available_physical: rec.available_physical,
        on_order_qty: rec.on_order_qty,
        annual_avg_purchase,
        annual_avg_consumption,
        annual_max_consumption,
        safety_stock: safety,
        raw_order_qty,
        final_order_qty,
        needs_review,
    }
}

/// Left join of the on-hand records with the history: every on-hand item
/// produces exactly one suggestion, in on-hand order.
pub fn calculate_orders(
    on_hand: &[OnHandRecord],
    history: &AnnualHistory,
    policy: &ReorderPolicy,
) -> Vec<OrderSuggestion> {
    let zero = history.window().empty_series();
    on_hand
        .iter()
        .map(|rec| {
            let series = history.get(&rec.item_id).unwrap_or(&zero);
            compute_suggestion(rec, series, policy)
        })
        .collect()
}

/// Top `n` items by average annual consumption, highest first; ties go to
/// the smaller item id.
pub fn most_used(suggestions: &[OrderSuggestion], n: usize) -> Vec<OrderSuggestion> {
    let mut ranked: Vec<&OrderSuggestion> = suggestions.iter().collect();
    ranked.sort_by(|a, b| {
        b.annual_avg_consumption
            .partial_cmp(&a.annual_avg_consumption)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    ranked.into_iter().take(n).cloned().collect()
}

/// The "orders needed" view: rows with something to order.
pub fn orders_needed(suggestions: &[OrderSuggestion]) -> Vec<OrderSuggestion> {
    suggestions.iter().filter(|s| s.final_order_qty > 0).cloned().collect()
}

pub fn annual_history_rows(on_hand: &[OnHandRecord], history: &AnnualHistory) -> Vec<AnnualHistoryRow> {
    let mut rows = Vec::new();
    for rec in on_hand {
        let series = history.series_or_zero(&rec.item_id);
        for b in &series.buckets {
            rows.push(AnnualHistoryRow {
                item_id: rec.item_id.clone(),
                year: b.year,
                purchase: b.purchase,
                consumption: b.consumption,
            });
        }
    }
    rows
}

pub fn generate_summary(
    today: NaiveDate,
    policy: &ReorderPolicy,
    suggestions: &[OrderSuggestion],
    most_used: &[OrderSuggestion],
    diagnostics: &Diagnostics,
) -> ReorderSummary {
    ReorderSummary {
        today,
        policy: policy.clone(),
        total_items: suggestions.len(),
        items_needing_order: suggestions.iter().filter(|s| s.final_order_qty > 0).count(),
        items_needing_review: suggestions.iter().filter(|s| s.needs_review).count(),
        total_final_order_qty: suggestions.iter().map(|s| s.final_order_qty).sum(),
        most_used_items: most_used.iter().map(|s| s.item_id.clone()).collect(),
        diagnostics: diagnostics.clone(),
    }
}
