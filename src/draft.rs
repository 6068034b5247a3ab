//! Fulfillment draft state machine.
//!
//! A [`FulfillmentDraft`] is an immutable value. Every change goes through
//! [`FulfillmentDraft::apply`], which takes a [`DraftEvent`] and returns the
//! next draft:
//!
//! ```text
//! Empty -> OrderSelected -> LinesLoaded <-> Validated -> Submitting -> Submitted
//!                                                             \-> Failed -> (edit, resubmit)
//! ```
//!
//! Order detail arrives asynchronously. Each selection gets a
//! [`SelectionToken`]; a detail result is only applied while its token is
//! still the current selection, so a late response for an order the
//! operator has already moved away from is dropped.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::ServiceError;
use crate::models::{
    grand_total, FulfillmentDocument, FulfillmentKind, FulfillmentLine, ParentOrder,
    SubmittedDocument, MAX_UNIT_PRICE,
};
use crate::services::{FulfillmentReconciler, StockSnapshotIndex, StockViolation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
pub enum DraftStatus {
    Empty,
    OrderSelected,
    LinesLoaded,
    Validated,
    Submitting,
    Submitted,
    Failed,
}

/// Whether the draft authors a new document or corrects a committed one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DraftMode {
    Create,
    Edit { document_id: i64 },
}

/// Correlates an order-detail fetch with the selection that triggered it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SelectionToken {
    pub order_id: i64,
    generation: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParentOrderRef {
    pub id: i64,
    pub number: Option<String>,
    pub counterparty: Option<String>,
}

#[derive(Clone, Debug, strum::AsRefStr)]
pub enum DraftEvent {
    OrderChosen {
        order_id: i64,
    },
    OrderCleared,
    OrderDetailLoaded {
        token: SelectionToken,
        order: ParentOrder,
        stock: StockSnapshotIndex,
    },
    OrderDetailFailed {
        token: SelectionToken,
        message: String,
    },
    LineEdited {
        index: usize,
        proposed_quantity: i64,
    },
    UnitPriceEdited {
        index: usize,
        unit_price: Decimal,
    },
    DocumentDateSet(NaiveDate),
    RemarksSet(String),
    SubmitRequested,
    SubmitSucceeded(SubmittedDocument),
    SubmitFailed(String),
}

#[derive(Clone, Debug, Serialize)]
pub struct FulfillmentDraft {
    kind: FulfillmentKind,
    mode: DraftMode,
    status: DraftStatus,
    parent_order: Option<ParentOrderRef>,
    selection: Option<SelectionToken>,
    #[serde(skip)]
    next_generation: u64,
    document_date: NaiveDate,
    remarks: String,
    lines: Vec<FulfillmentLine>,
    violations: Vec<StockViolation>,
    error: Option<String>,
    submitted: Option<SubmittedDocument>,
}

impl FulfillmentDraft {
    /// A blank draft for a new document, dated today.
    pub fn new(kind: FulfillmentKind) -> Self {
        Self {
            kind,
            mode: DraftMode::Create,
            status: DraftStatus::Empty,
            parent_order: None,
            selection: None,
            next_generation: 0,
            document_date: Utc::now().date_naive(),
            remarks: String::new(),
            lines: Vec::new(),
            violations: Vec::new(),
            error: None,
            submitted: None,
        }
    }

    /// A draft re-opening a committed document. `lines` must already carry
    /// the edit-mode stock adjustment.
    pub fn for_edit(
        kind: FulfillmentKind,
        document_id: i64,
        parent_order: ParentOrderRef,
        document_date: NaiveDate,
        remarks: String,
        lines: Vec<FulfillmentLine>,
    ) -> Self {
        let mut draft = Self {
            mode: DraftMode::Edit { document_id },
            parent_order: Some(parent_order),
            document_date,
            remarks,
            lines,
            ..Self::new(kind)
        };
        draft.revalidate();
        draft
    }

    pub fn kind(&self) -> FulfillmentKind {
        self.kind
    }

    pub fn mode(&self) -> DraftMode {
        self.mode
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    pub fn parent_order(&self) -> Option<&ParentOrderRef> {
        self.parent_order.as_ref()
    }

    pub fn selection(&self) -> Option<SelectionToken> {
        self.selection
    }

    pub fn document_date(&self) -> NaiveDate {
        self.document_date
    }

    pub fn remarks(&self) -> &str {
        &self.remarks
    }

    pub fn lines(&self) -> &[FulfillmentLine] {
        &self.lines
    }

    pub fn violations(&self) -> &[StockViolation] {
        &self.violations
    }

    /// The message to show the operator, if the last event produced one.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn submitted(&self) -> Option<&SubmittedDocument> {
        self.submitted.as_ref()
    }

    pub fn grand_total(&self) -> Decimal {
        grand_total(&self.lines)
    }

    /// The document as it would be submitted, if an order is attached.
    pub fn document(&self) -> Option<FulfillmentDocument> {
        self.parent_order.as_ref().map(|order| FulfillmentDocument {
            parent_order_id: order.id,
            document_date: self.document_date,
            remarks: self.remarks.clone(),
            lines: self.lines.clone(),
        })
    }

    /// Returns the draft that results from `event`.
    ///
    /// Problems the operator can fix (stale detail, failed load, blocked
    /// submission) come back as `Ok` with [`error`](Self::error) set. `Err`
    /// is reserved for events that make no sense in the current state.
    pub fn apply(&self, event: DraftEvent) -> Result<FulfillmentDraft, ServiceError> {
        let event_name = event.as_ref().to_string();
        let mut next = self.clone();

        match event {
            DraftEvent::OrderChosen { order_id } => {
                next.ensure_creating(&event_name)?;
                next.ensure_not_in_flight(&event_name)?;
                let token = SelectionToken {
                    order_id,
                    generation: next.next_generation,
                };
                next.next_generation += 1;
                next.selection = Some(token);
                next.parent_order = Some(ParentOrderRef {
                    id: order_id,
                    number: None,
                    counterparty: None,
                });
                next.lines.clear();
                next.violations.clear();
                next.error = None;
                next.status = DraftStatus::OrderSelected;
                debug!(order_id, generation = token.generation, "order chosen");
            }
            DraftEvent::OrderCleared => {
                next.ensure_creating(&event_name)?;
                next.ensure_not_in_flight(&event_name)?;
                next.reset_selection(None);
            }
            DraftEvent::OrderDetailLoaded {
                token,
                order,
                stock,
            } => {
                if next.selection != Some(token) {
                    debug!(order_id = token.order_id, "discarding stale order detail");
                    return Ok(next);
                }

                let reconciler = FulfillmentReconciler::new(self.kind);
                match reconciler.lines_for_order(&order, &stock) {
                    Ok(lines) => {
                        next.parent_order = Some(ParentOrderRef {
                            id: order.id,
                            number: order.number.clone(),
                            counterparty: order.counterparty.clone(),
                        });
                        next.lines = lines;
                        next.error = None;
                        next.revalidate();
                    }
                    Err(err) => next.reset_selection(Some(err.to_string())),
                }
            }
            DraftEvent::OrderDetailFailed { token, message } => {
                if next.selection != Some(token) {
                    debug!(order_id = token.order_id, "discarding stale order failure");
                    return Ok(next);
                }
                warn!(order_id = token.order_id, %message, "order detail failed to load");
                next.reset_selection(Some(message));
            }
            DraftEvent::LineEdited {
                index,
                proposed_quantity,
            } => {
                next.ensure_editable(&event_name)?;
                if proposed_quantity < 0 {
                    return Err(ServiceError::ValidationError(
                        "Quantity cannot be negative".to_string(),
                    ));
                }
                next.line_mut(index)?.proposed_quantity = proposed_quantity;
                next.revalidate();
            }
            DraftEvent::UnitPriceEdited { index, unit_price } => {
                next.ensure_editable(&event_name)?;
                if self.kind != FulfillmentKind::Receipt {
                    return Err(ServiceError::InvalidOperation(
                        "Unit prices are taken from the sales order when issuing".to_string(),
                    ));
                }
                if unit_price.is_sign_negative() {
                    return Err(ServiceError::ValidationError(
                        "Unit price cannot be negative".to_string(),
                    ));
                }
                if unit_price > MAX_UNIT_PRICE {
                    return Err(ServiceError::ValidationError(format!(
                        "Unit price cannot exceed {}",
                        MAX_UNIT_PRICE
                    )));
                }
                next.line_mut(index)?.unit_price = unit_price;
                next.revalidate();
            }
            DraftEvent::DocumentDateSet(date) => {
                next.ensure_not_in_flight(&event_name)?;
                next.document_date = date;
            }
            DraftEvent::RemarksSet(remarks) => {
                next.ensure_not_in_flight(&event_name)?;
                next.remarks = remarks;
            }
            DraftEvent::SubmitRequested => match self.status {
                DraftStatus::Empty | DraftStatus::OrderSelected => {
                    next.error = Some(format!("Please select a {}", self.kind.order_label()));
                }
                DraftStatus::LinesLoaded | DraftStatus::Validated | DraftStatus::Failed => {
                    let reconciler = FulfillmentReconciler::new(self.kind);
                    next.violations = reconciler.violations(&next.lines);
                    match reconciler.submission_gate(&next.lines) {
                        Ok(()) => {
                            next.error = None;
                            next.status = DraftStatus::Submitting;
                        }
                        Err(err) => {
                            info!(code = err.code(), "submission blocked");
                            next.error = Some(err.to_string());
                            next.status = DraftStatus::LinesLoaded;
                        }
                    }
                }
                DraftStatus::Submitting | DraftStatus::Submitted => {
                    return Err(next.invalid(&event_name));
                }
            },
            DraftEvent::SubmitSucceeded(document) => {
                if self.status != DraftStatus::Submitting {
                    return Err(next.invalid(&event_name));
                }
                next.lines.clear();
                next.violations.clear();
                next.selection = None;
                next.error = None;
                next.submitted = Some(document);
                next.status = DraftStatus::Submitted;
            }
            DraftEvent::SubmitFailed(message) => {
                if self.status != DraftStatus::Submitting {
                    return Err(next.invalid(&event_name));
                }
                next.error = Some(message);
                next.status = DraftStatus::Failed;
            }
        }

        Ok(next)
    }

    fn revalidate(&mut self) {
        let reconciler = FulfillmentReconciler::new(self.kind);
        self.violations = reconciler.violations(&self.lines);
        self.status = if self.violations.is_empty() {
            DraftStatus::Validated
        } else {
            DraftStatus::LinesLoaded
        };
    }

    fn reset_selection(&mut self, error: Option<String>) {
        self.selection = None;
        self.parent_order = None;
        self.lines.clear();
        self.violations.clear();
        self.error = error;
        self.status = DraftStatus::Empty;
    }

    fn line_mut(&mut self, index: usize) -> Result<&mut FulfillmentLine, ServiceError> {
        let count = self.lines.len();
        self.lines.get_mut(index).ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Line {} does not exist (draft has {} lines)",
                index, count
            ))
        })
    }

    fn ensure_creating(&self, event: &str) -> Result<(), ServiceError> {
        match self.mode {
            DraftMode::Create => Ok(()),
            DraftMode::Edit { .. } => Err(ServiceError::InvalidOperation(format!(
                "{} is not allowed while editing a committed {}",
                event, self.kind
            ))),
        }
    }

    fn ensure_not_in_flight(&self, event: &str) -> Result<(), ServiceError> {
        match self.status {
            DraftStatus::Submitting | DraftStatus::Submitted => Err(self.invalid(event)),
            _ => Ok(()),
        }
    }

    fn ensure_editable(&self, event: &str) -> Result<(), ServiceError> {
        match self.status {
            DraftStatus::LinesLoaded | DraftStatus::Validated | DraftStatus::Failed => Ok(()),
            _ => Err(self.invalid(event)),
        }
    }

    fn invalid(&self, event: &str) -> ServiceError {
        ServiceError::InvalidOperation(format!(
            "Cannot apply {} while the draft is {}",
            event, self.status
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, OrderLine, OrderStatus, StockRecord};
    use rust_decimal_macros::dec;

    fn order(id: i64, lines: Vec<(i64, &str, i64)>) -> ParentOrder {
        ParentOrder {
            id,
            number: Some(format!("SO-{:04}", id)),
            counterparty: Some("Acme".to_string()),
            status: OrderStatus::Confirmed,
            lines: lines
                .into_iter()
                .map(|(item, name, quantity)| OrderLine {
                    item_id: ItemId::new(item),
                    item_name: name.to_string(),
                    item_sku: None,
                    ordered_quantity: quantity,
                    unit_price: dec!(10.00),
                })
                .collect(),
        }
    }

    fn stock(records: &[(i64, i64)]) -> StockSnapshotIndex {
        let records: Vec<StockRecord> = records
            .iter()
            .map(|(item, qty)| StockRecord::new(*item, *qty))
            .collect();
        StockSnapshotIndex::build(&records)
    }

    fn loaded(
        draft: &FulfillmentDraft,
        detail: ParentOrder,
        index: StockSnapshotIndex,
    ) -> FulfillmentDraft {
        let token = draft.selection().expect("selection");
        draft
            .apply(DraftEvent::OrderDetailLoaded {
                token,
                order: detail,
                stock: index,
            })
            .unwrap()
    }

    #[test]
    fn new_draft_is_empty() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Issue);
        assert_eq!(draft.status(), DraftStatus::Empty);
        assert!(draft.lines().is_empty());
        assert!(draft.document().is_none());
    }

    #[test]
    fn loading_lines_validates_them() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        assert_eq!(draft.status(), DraftStatus::OrderSelected);

        let draft = loaded(&draft, order(1, vec![(1, "Bolt", 3)]), stock(&[(1, 5)]));
        assert_eq!(draft.status(), DraftStatus::Validated);
        assert_eq!(draft.parent_order().unwrap().number.as_deref(), Some("SO-0001"));
    }

    #[test]
    fn stale_detail_is_discarded() {
        let first = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let stale_token = first.selection().unwrap();
        let second = first.apply(DraftEvent::OrderChosen { order_id: 2 }).unwrap();

        let after_stale = second
            .apply(DraftEvent::OrderDetailLoaded {
                token: stale_token,
                order: order(1, vec![(1, "Bolt", 3)]),
                stock: stock(&[(1, 5)]),
            })
            .unwrap();
        assert_eq!(after_stale.status(), DraftStatus::OrderSelected);
        assert!(after_stale.lines().is_empty());
        assert_eq!(after_stale.parent_order().unwrap().id, 2);
    }

    #[test]
    fn reselecting_the_same_order_invalidates_the_earlier_fetch() {
        let first = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let old_token = first.selection().unwrap();
        let again = first.apply(DraftEvent::OrderChosen { order_id: 1 }).unwrap();
        assert_ne!(again.selection(), Some(old_token));
    }

    #[test]
    fn failed_load_resets_selection_with_message() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let token = draft.selection().unwrap();
        let draft = draft
            .apply(DraftEvent::OrderDetailFailed {
                token,
                message: "Failed to load SO details".to_string(),
            })
            .unwrap();

        assert_eq!(draft.status(), DraftStatus::Empty);
        assert!(draft.selection().is_none());
        assert_eq!(draft.error(), Some("Failed to load SO details"));
    }

    #[test]
    fn order_without_lines_resets_selection() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let draft = loaded(&draft, order(1, vec![]), stock(&[]));
        assert_eq!(draft.status(), DraftStatus::Empty);
        assert_eq!(draft.error(), Some("Selected Sales Order has no items"));
    }

    #[test]
    fn submit_is_blocked_until_quantity_fits() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let draft = loaded(&draft, order(1, vec![(1, "Bolt", 10)]), stock(&[(1, 8)]));
        assert_eq!(draft.status(), DraftStatus::LinesLoaded);

        let blocked = draft.apply(DraftEvent::SubmitRequested).unwrap();
        assert_eq!(blocked.status(), DraftStatus::LinesLoaded);
        assert_eq!(
            blocked.error(),
            Some("Stock validation failed:\nBolt: requested 10, available 8")
        );

        let fixed = blocked
            .apply(DraftEvent::LineEdited {
                index: 0,
                proposed_quantity: 8,
            })
            .unwrap();
        assert_eq!(fixed.status(), DraftStatus::Validated);
        let submitting = fixed.apply(DraftEvent::SubmitRequested).unwrap();
        assert_eq!(submitting.status(), DraftStatus::Submitting);
    }

    #[test]
    fn submit_without_order_asks_for_one() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Receipt)
            .apply(DraftEvent::SubmitRequested)
            .unwrap();
        assert_eq!(draft.error(), Some("Please select a Purchase Order"));
        assert_eq!(draft.status(), DraftStatus::Empty);
    }

    #[test]
    fn failed_submission_returns_to_editable_state() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let draft = loaded(&draft, order(1, vec![(1, "Bolt", 2)]), stock(&[(1, 8)]))
            .apply(DraftEvent::SubmitRequested)
            .unwrap()
            .apply(DraftEvent::SubmitFailed("Insufficient stock".to_string()))
            .unwrap();
        assert_eq!(draft.status(), DraftStatus::Failed);
        assert_eq!(draft.error(), Some("Insufficient stock"));
        assert_eq!(draft.lines().len(), 1);

        let edited = draft
            .apply(DraftEvent::LineEdited {
                index: 0,
                proposed_quantity: 1,
            })
            .unwrap();
        assert_eq!(edited.status(), DraftStatus::Validated);
    }

    #[test]
    fn successful_submission_discards_lines() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let draft = loaded(&draft, order(1, vec![(1, "Bolt", 2)]), stock(&[(1, 8)]))
            .apply(DraftEvent::SubmitRequested)
            .unwrap()
            .apply(DraftEvent::SubmitSucceeded(SubmittedDocument {
                id: Some(31),
                number: Some("GIN-0031".to_string()),
                status: None,
            }))
            .unwrap();
        assert_eq!(draft.status(), DraftStatus::Submitted);
        assert!(draft.lines().is_empty());
        assert_eq!(draft.submitted().unwrap().id, Some(31));
    }

    #[test]
    fn editing_out_of_range_line_is_an_error() {
        let draft = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let draft = loaded(&draft, order(1, vec![(1, "Bolt", 2)]), stock(&[(1, 8)]));
        let err = draft
            .apply(DraftEvent::LineEdited {
                index: 3,
                proposed_quantity: 1,
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn unit_price_is_editable_only_on_receipts() {
        let issue = FulfillmentDraft::new(FulfillmentKind::Issue)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let issue = loaded(&issue, order(1, vec![(1, "Bolt", 2)]), stock(&[(1, 8)]));
        assert!(issue
            .apply(DraftEvent::UnitPriceEdited {
                index: 0,
                unit_price: dec!(3.00),
            })
            .is_err());

        let mut purchase = order(1, vec![(1, "Bolt", 2)]);
        purchase.status = OrderStatus::Approved;
        let receipt = FulfillmentDraft::new(FulfillmentKind::Receipt)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let receipt = loaded(&receipt, purchase, stock(&[]))
            .apply(DraftEvent::UnitPriceEdited {
                index: 0,
                unit_price: dec!(3.00),
            })
            .unwrap();
        assert_eq!(receipt.grand_total(), dec!(6.00));
    }

    #[test]
    fn unit_price_above_ceiling_is_rejected() {
        let mut purchase = order(1, vec![(1, "Bolt", 2)]);
        purchase.status = OrderStatus::Approved;
        let receipt = FulfillmentDraft::new(FulfillmentKind::Receipt)
            .apply(DraftEvent::OrderChosen { order_id: 1 })
            .unwrap();
        let receipt = loaded(&receipt, purchase, stock(&[]));

        let err = receipt
            .apply(DraftEvent::UnitPriceEdited {
                index: 0,
                unit_price: Decimal::MAX,
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert_eq!(receipt.lines()[0].unit_price, dec!(10.00));
    }

    #[test]
    fn edit_mode_rejects_choosing_another_order() {
        let draft = FulfillmentDraft::for_edit(
            FulfillmentKind::Issue,
            4,
            ParentOrderRef {
                id: 1,
                number: Some("SO-0001".to_string()),
                counterparty: None,
            },
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            String::new(),
            vec![],
        );
        assert!(draft.apply(DraftEvent::OrderChosen { order_id: 2 }).is_err());
        assert_eq!(draft.mode(), DraftMode::Edit { document_id: 4 });
    }
}
