use std::collections::HashMap;

use crate::models::{ItemId, StockRecord};

/// Constant-time lookup of on-hand quantity by item.
///
/// Absence is not an error: an item that has never been received simply has
/// no stock record, and reads as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StockSnapshotIndex {
    quantities: HashMap<ItemId, i64>,
}

impl StockSnapshotIndex {
    /// Builds the index; a later record for the same item replaces an earlier one.
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a StockRecord>,
    {
        let mut quantities = HashMap::new();
        for record in records {
            quantities.insert(record.item_id, record.quantity_on_hand);
        }
        Self { quantities }
    }

    pub fn quantity_on_hand(&self, item_id: ItemId) -> i64 {
        self.quantities
            .get(&item_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.quantities.contains_key(&item_id)
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, i64)> + '_ {
        self.quantities.iter().map(|(id, qty)| (*id, *qty))
    }
}

impl FromIterator<StockRecord> for StockSnapshotIndex {
    fn from_iter<T: IntoIterator<Item = StockRecord>>(iter: T) -> Self {
        let records: Vec<StockRecord> = iter.into_iter().collect();
        Self::build(&records)
    }
}
