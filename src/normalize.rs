// Normalizer: validates the on-hand snapshot and merges duplicate item rows.
use crate::config::OnHandColumns;
use crate::error::{Diagnostics, ParseWarning, ReorderError, ReorderResult};
use crate::types::{OnHandRecord, RawTable};
use crate::util::{canonical_item_id, parse_f64_safe};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Resolve every required column at once. On failure the error names each
/// missing column by its first configured alias.
pub(crate) fn require_columns(
    table: &RawTable,
    required: &[&[String]],
) -> ReorderResult<Vec<usize>> {
    let mut found = Vec::with_capacity(required.len());
    let mut missing = Vec::new();
    for aliases in required {
        match table.column(aliases) {
            Some(idx) => found.push(idx),
            None => missing.push(aliases.first().cloned().unwrap_or_default()),
        }
    }
    if missing.is_empty() {
        Ok(found)
    } else {
        Err(ReorderError::schema(table.name.clone(), missing))
    }
}

/// Read a quantity cell. Empty cells are zero; anything else that does not
/// parse is zero plus a warning.
fn quantity_cell(cell: Option<&str>, diag: &mut Diagnostics) -> f64 {
    match cell.map(str::trim) {
        None | Some("") => 0.0,
        Some(s) => parse_f64_safe(Some(s)).unwrap_or_else(|| {
            diag.record(ParseWarning::NonNumericOnHandQty);
            0.0
        }),
    }
}

fn text_cell(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Produce one record per distinct item id, ordered by id.
///
/// Duplicate rows are merged: quantities are summed, the first non-empty
/// product name and unit win.
pub fn normalize_on_hand(
    table: &RawTable,
    cols: &OnHandColumns,
    diag: &mut Diagnostics,
) -> ReorderResult<Vec<OnHandRecord>> {
    let idx = require_columns(
        table,
        &[&cols.item_id, &cols.product_name, &cols.available_physical],
    )?;
    let (item_col, name_col, avail_col) = (idx[0], idx[1], idx[2]);
    let on_order_col = table.column(&cols.on_order_qty);
    let unit_col = table.column(&cols.unit);

    diag.on_hand_rows = table.len();
    let mut merged: BTreeMap<String, OnHandRecord> = BTreeMap::new();

    for row in 0..table.len() {
        let Some(item_id) = table.cell(row, item_col).and_then(canonical_item_id) else {
            diag.record(ParseWarning::BlankItemId);
            continue;
        };
        let product_name = text_cell(table.cell(row, name_col));
        let unit = unit_col.and_then(|c| text_cell(table.cell(row, c)));
        let available = quantity_cell(table.cell(row, avail_col), diag);
        let on_order = match on_order_col {
            Some(c) => quantity_cell(table.cell(row, c), diag),
            None => 0.0,
        };

        match merged.get_mut(&item_id) {
            Some(rec) => {
                debug!(item = %item_id, "merging duplicate on-hand row");
                diag.merged_duplicate_rows += 1;
                rec.available_physical += available;
                rec.on_order_qty += on_order;
                if rec.product_name.is_empty() {
                    rec.product_name = product_name.unwrap_or_default();
                }
                if rec.unit.is_none() {
                    rec.unit = unit;
                }
            }
            None => {
                merged.insert(
                    item_id.clone(),
                    OnHandRecord {
                        item_id,
                        product_name: product_name.unwrap_or_default(),
                        unit,
                        available_physical: available,
                        on_order_qty: on_order,
                    },
                );
            }
        }
    }

    let records: Vec<OnHandRecord> = merged.into_values().collect();
    info!(
        rows = table.len(),
        items = records.len(),
        merged = diag.merged_duplicate_rows,
        "normalized on-hand snapshot"
    );
    Ok(records)
}
