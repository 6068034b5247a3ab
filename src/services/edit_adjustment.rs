use tracing::warn;

use crate::models::{CommittedLine, FulfillmentKind, FulfillmentLine};

/// Shows available stock as if the document being edited had never been committed.
///
/// Issuing decremented stock on the original submission, so the committed
/// quantity is added back; receiving incremented it, so it is taken away.
/// The adjustment is relative to each line's current `available_stock`,
/// which means an item that has vanished from the snapshot (already read as
/// zero by the merger) still gets its committed quantity applied.
///
/// `committed` is positional: entry `i` belongs to `lines[i]`, so an item
/// that appears on several lines gets each line's own quantity back rather
/// than the item's total. An entry whose item does not match its line is
/// ignored.
pub fn apply_edit_adjustment(
    kind: FulfillmentKind,
    lines: &[FulfillmentLine],
    committed: &[CommittedLine],
) -> Vec<FulfillmentLine> {
    if committed.len() > lines.len() {
        warn!(
            lines = lines.len(),
            committed = committed.len(),
            "more committed lines than working lines"
        );
    }

    lines
        .iter()
        .enumerate()
        .map(|(position, line)| {
            let delta = match committed.get(position) {
                Some(entry) if entry.item_id == line.item_id => -kind.stock_effect(entry.quantity),
                Some(entry) => {
                    warn!(
                        position,
                        line_item = %line.item_id,
                        committed_item = %entry.item_id,
                        "committed line does not match working line"
                    );
                    0
                }
                None => 0,
            };
            FulfillmentLine {
                available_stock: line.available_stock + delta,
                ..line.clone()
            }
        })
        .collect()
}
