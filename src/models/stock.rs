use serde::{Deserialize, Serialize};

use super::{null_as_zero, ItemId};

/// On-hand quantity of one item at the moment the snapshot was fetched.
///
/// The stock endpoint returns more than this (names, cost price, stock
/// value); only the two fields the reconciler needs are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub item_id: ItemId,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub quantity_on_hand: i64,
}

impl StockRecord {
    pub fn new(item_id: i64, quantity_on_hand: i64) -> Self {
        Self {
            item_id: ItemId::new(item_id),
            quantity_on_hand,
        }
    }
}
