use tracing::debug;

use crate::models::{DocumentLine, FulfillmentLine, OrderLine};
use crate::services::stock_index::StockSnapshotIndex;

/// Pairs each order line with the stock available for its item.
///
/// The proposed quantity starts out equal to the ordered quantity and output
/// order matches input order. An empty result is returned as-is; callers must
/// treat it as "selected order has no items", never as a valid empty document.
pub fn merge_lines(order_lines: &[OrderLine], index: &StockSnapshotIndex) -> Vec<FulfillmentLine> {
    let lines: Vec<FulfillmentLine> = order_lines
        .iter()
        .map(|line| FulfillmentLine {
            item_id: line.item_id,
            item_name: line.item_name.clone(),
            item_sku: line.item_sku.clone(),
            ordered_quantity: line.ordered_quantity,
            proposed_quantity: line.ordered_quantity,
            unit_price: line.unit_price,
            available_stock: index.quantity_on_hand(line.item_id),
        })
        .collect();

    debug!(
        lines = lines.len(),
        tracked_items = index.len(),
        "merged order lines with stock snapshot"
    );
    lines
}

/// Rebuilds working lines from a committed document, keeping what it
/// actually issued or received as the proposed quantity.
///
/// Available stock is the raw current snapshot; the edit-mode adjustment has
/// to run on the result before it is validated.
pub fn lines_from_document(
    document_lines: &[DocumentLine],
    index: &StockSnapshotIndex,
) -> Vec<FulfillmentLine> {
    document_lines
        .iter()
        .map(|line| FulfillmentLine {
            item_id: line.item_id,
            item_name: line.item_name.clone(),
            item_sku: line.item_sku.clone(),
            ordered_quantity: line.ordered_quantity,
            proposed_quantity: line.fulfilled_quantity,
            unit_price: line.unit_price,
            available_stock: index.quantity_on_hand(line.item_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, StockRecord};
    use rust_decimal_macros::dec;

    fn order_line(item: i64, quantity: i64) -> OrderLine {
        OrderLine {
            item_id: ItemId::new(item),
            item_name: format!("Item {}", item),
            item_sku: None,
            ordered_quantity: quantity,
            unit_price: dec!(2.50),
        }
    }

    #[test]
    fn keeps_input_order_and_defaults_proposed_quantity() {
        let index = StockSnapshotIndex::build(&[StockRecord::new(2, 9)]);
        let lines = merge_lines(&[order_line(3, 1), order_line(2, 4), order_line(1, 6)], &index);

        let ids: Vec<i64> = lines.iter().map(|l| l.item_id.get()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert!(lines.iter().all(|l| l.proposed_quantity == l.ordered_quantity));
        assert_eq!(lines[1].available_stock, 9);
        assert_eq!(lines[0].available_stock, 0);
    }

    #[test]
    fn empty_order_yields_no_lines() {
        let index = StockSnapshotIndex::build(&[StockRecord::new(1, 1)]);
        assert!(merge_lines(&[], &index).is_empty());
    }

    #[test]
    fn document_lines_keep_committed_quantity() {
        let index = StockSnapshotIndex::build(&[StockRecord::new(5, 2)]);
        let lines = lines_from_document(
            &[DocumentLine {
                item_id: ItemId::new(5),
                item_name: "Gear".to_string(),
                item_sku: Some("G-5".to_string()),
                ordered_quantity: 10,
                fulfilled_quantity: 6,
                unit_price: dec!(1.00),
            }],
            &index,
        );

        assert_eq!(lines[0].ordered_quantity, 10);
        assert_eq!(lines[0].proposed_quantity, 6);
        assert_eq!(lines[0].available_stock, 2);
    }
}
