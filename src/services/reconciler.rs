use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::models::{ExistingDocument, FulfillmentKind, FulfillmentLine, ParentOrder};
use crate::services::{
    edit_adjustment::apply_edit_adjustment,
    line_merger::{lines_from_document, merge_lines},
    stock_index::StockSnapshotIndex,
    validator::{check_receipt_lines, validate_stock, StockViolation, ViolationReport},
};

/// Stock-aware reconciliation of an order against the current stock snapshot.
///
/// One reconciler per document kind; the same steps serve issuing against a
/// sales order and receiving against a purchase order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FulfillmentReconciler {
    kind: FulfillmentKind,
}

impl FulfillmentReconciler {
    pub fn new(kind: FulfillmentKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> FulfillmentKind {
        self.kind
    }

    /// Checks that `order` may be fulfilled and produces its working lines.
    #[instrument(skip(self, order, index), fields(kind = %self.kind, order_id = order.id))]
    pub fn lines_for_order(
        &self,
        order: &ParentOrder,
        index: &StockSnapshotIndex,
    ) -> Result<Vec<FulfillmentLine>, ServiceError> {
        if !self.kind.accepts_order_status(&order.status) {
            warn!(status = %order.status, "order is not eligible for fulfillment");
            return Err(ServiceError::SelectionLoad(format!(
                "{} {} cannot be used for a {} (status {})",
                self.kind.order_label(),
                order.display_number(),
                self.kind,
                order.status
            )));
        }

        let lines = merge_lines(&order.lines, index);
        if lines.is_empty() {
            return Err(ServiceError::SelectionLoad(format!(
                "Selected {} has no items",
                self.kind.order_label()
            )));
        }

        info!(lines = lines.len(), "order reconciled against stock");
        Ok(lines)
    }

    /// Working lines for re-editing a committed document, with available
    /// stock shown as if that document had never been committed.
    #[instrument(skip(self, document, index), fields(kind = %self.kind, document_id = document.id))]
    pub fn lines_for_edit(
        &self,
        document: &ExistingDocument,
        index: &StockSnapshotIndex,
    ) -> Result<Vec<FulfillmentLine>, ServiceError> {
        if document.lines.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "{} {} has no lines to edit",
                self.kind,
                document.number.clone().unwrap_or_else(|| document.id.to_string())
            )));
        }

        let lines = lines_from_document(&document.lines, index);
        Ok(apply_edit_adjustment(
            self.kind,
            &lines,
            &document.committed_lines(),
        ))
    }

    /// Stock violations to flag on screen.
    ///
    /// Receiving adds stock, so receipt lines are never held back by what is
    /// on hand; only issue lines are checked.
    pub fn violations(&self, lines: &[FulfillmentLine]) -> Vec<StockViolation> {
        match self.kind {
            FulfillmentKind::Issue => validate_stock(lines),
            FulfillmentKind::Receipt => Vec::new(),
        }
    }

    /// Decides whether `lines` may be submitted, reporting every problem at once.
    pub fn submission_gate(&self, lines: &[FulfillmentLine]) -> Result<(), ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Please add at least one item".to_string(),
            ));
        }

        if lines.iter().any(|line| line.proposed_quantity < 0) {
            return Err(ServiceError::ValidationError(
                "Quantities cannot be negative".to_string(),
            ));
        }

        match self.kind {
            FulfillmentKind::Issue => {
                let violations = validate_stock(lines);
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(ServiceError::StockViolation(ViolationReport::new(
                        violations,
                    )))
                }
            }
            FulfillmentKind::Receipt => check_receipt_lines(lines),
        }
    }
}
