// Domain types shared by the reconciler, the draft reducer and the API client
pub mod fulfillment;
pub mod item;
pub mod order;
pub mod stock;

pub use fulfillment::{
    grand_total, CommittedLine, DocumentLine, ExistingDocument, FulfillmentDocument,
    FulfillmentKind, FulfillmentLine, StockLevel, SubmissionLine, SubmissionRequest,
    SubmittedDocument, MAX_UNIT_PRICE,
};
pub use item::{ItemId, ParseItemIdError};
pub use order::{OrderLine, OrderStatus, ParentOrder};
pub use stock::StockRecord;

use serde::{Deserialize, Deserializer};

/// Reads an optional integer, treating `null` the same as an absent field.
pub(crate) fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}
