// Reorder suggestions for stock items from an on-hand snapshot and a
// transaction ledger.
//
// The entry point is `pipeline::compute_order_suggestions`; it takes two
// already-read tables and returns the suggestion tables plus diagnostics.
// Reading CSV files and writing outputs live in `loader` and `output`.

pub mod config;
pub mod error;
pub mod history;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod orders;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod util;

pub use config::{ColumnMapping, ReorderConfig, ReorderPolicy, TrailingWindow};
pub use error::{Diagnostics, ParseWarning, ReorderError, ReorderResult};
pub use pipeline::{compute_order_suggestions, ReorderReport};
pub use types::{OrderSuggestion, RawTable};
