// Fulfillment reconciliation: stock index, line merging, edit-mode
// reversal and validation, composed by the reconciler
pub mod edit_adjustment;
pub mod line_merger;
pub mod reconciler;
pub mod stock_index;
pub mod validator;

pub use reconciler::FulfillmentReconciler;
pub use stock_index::StockSnapshotIndex;
pub use validator::{StockViolation, ViolationReport};
