//! Drives a [`FulfillmentDraft`] against the order-management API.
//!
//! The session owns the current draft and feeds it events as the operator
//! works. Order detail is loaded through a [`SelectionLoader`] that carries
//! the selection token, so the fetch can be spawned and its result handed
//! back later through [`FulfillmentSession::resolve`]; if the operator has
//! chosen another order in the meantime the result is dropped.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::client::OrderManagementApi;
use crate::draft::{
    DraftEvent, DraftMode, DraftStatus, FulfillmentDraft, ParentOrderRef, SelectionToken,
};
use crate::errors::ServiceError;
use crate::models::{FulfillmentKind, ItemId, ParentOrder, StockRecord, SubmittedDocument};
use crate::services::{FulfillmentReconciler, StockSnapshotIndex};

const OPERATOR_MISSING: &str = "User not found. Please login again.";

/// Owned handle for one order-detail fetch.
pub struct SelectionLoader<A: ?Sized> {
    api: Arc<A>,
    kind: FulfillmentKind,
    token: SelectionToken,
}

/// Result of a [`SelectionLoader`], still tagged with its token.
#[derive(Debug)]
pub struct SelectionOutcome {
    token: SelectionToken,
    result: Result<(ParentOrder, Vec<StockRecord>), ServiceError>,
}

impl SelectionOutcome {
    pub fn token(&self) -> SelectionToken {
        self.token
    }
}

impl<A> SelectionLoader<A>
where
    A: OrderManagementApi + ?Sized,
{
    pub fn token(&self) -> SelectionToken {
        self.token
    }

    /// Fetches the parent order and a fresh stock snapshot concurrently.
    #[instrument(skip(self), fields(kind = %self.kind, order_id = self.token.order_id))]
    pub async fn load(self) -> SelectionOutcome {
        let result = tokio::try_join!(
            self.api.fetch_parent_order(self.kind, self.token.order_id),
            self.api.fetch_stock_snapshot(),
        );
        SelectionOutcome {
            token: self.token,
            result,
        }
    }
}

pub struct FulfillmentSession<A: ?Sized> {
    api: Arc<A>,
    draft: FulfillmentDraft,
    operator_id: Option<i64>,
}

impl<A> FulfillmentSession<A>
where
    A: OrderManagementApi + ?Sized,
{
    /// A session for a new GIN or GRN.
    pub fn new(api: Arc<A>, kind: FulfillmentKind, operator_id: Option<i64>) -> Self {
        Self {
            api,
            draft: FulfillmentDraft::new(kind),
            operator_id,
        }
    }

    /// Re-opens a committed document for editing.
    ///
    /// The stock snapshot is fetched fresh and the quantities the document
    /// already committed are reversed into each line's availability.
    #[instrument(skip(api))]
    pub async fn open_document(
        api: Arc<A>,
        kind: FulfillmentKind,
        document_id: i64,
        operator_id: Option<i64>,
    ) -> Result<Self, ServiceError> {
        let (document, stock) = tokio::try_join!(
            api.fetch_document(kind, document_id),
            api.fetch_stock_snapshot(),
        )?;

        let index = StockSnapshotIndex::build(&stock);
        let lines = FulfillmentReconciler::new(kind).lines_for_edit(&document, &index)?;
        info!(
            document_id,
            lines = lines.len(),
            "opened {} for editing",
            kind
        );

        let parent_order = ParentOrderRef {
            id: document.parent_order_id,
            number: document.parent_order_number.clone(),
            counterparty: None,
        };
        let draft = FulfillmentDraft::for_edit(
            kind,
            document.id,
            parent_order,
            document
                .document_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            document.remarks.clone().unwrap_or_default(),
            lines,
        );

        Ok(Self {
            api,
            draft,
            operator_id,
        })
    }

    pub fn draft(&self) -> &FulfillmentDraft {
        &self.draft
    }

    pub fn kind(&self) -> FulfillmentKind {
        self.draft.kind()
    }

    pub fn operator_id(&self) -> Option<i64> {
        self.operator_id
    }

    /// Applies a raw event to the draft.
    pub fn dispatch(&mut self, event: DraftEvent) -> Result<&FulfillmentDraft, ServiceError> {
        self.draft = self.draft.apply(event)?;
        Ok(&self.draft)
    }

    /// Selects an order and returns the loader for its detail.
    ///
    /// Any earlier selection is superseded immediately, so its loader's
    /// outcome will be ignored by [`resolve`](Self::resolve).
    pub fn choose_order(&mut self, order_id: i64) -> Result<SelectionLoader<A>, ServiceError> {
        self.dispatch(DraftEvent::OrderChosen { order_id })?;
        let token = self.draft.selection().ok_or_else(|| {
            ServiceError::InternalError("order chosen without a selection token".to_string())
        })?;

        Ok(SelectionLoader {
            api: Arc::clone(&self.api),
            kind: self.draft.kind(),
            token,
        })
    }

    /// Folds a loader's outcome into the draft.
    ///
    /// Returns `Ok(false)` when the outcome belonged to a superseded
    /// selection and was discarded, and `Err(SelectionLoad)` when the fetch
    /// failed, the order is ineligible, or it has no lines. In the error
    /// case the selection has been reset.
    pub fn resolve(&mut self, outcome: SelectionOutcome) -> Result<bool, ServiceError> {
        let token = outcome.token;
        let current = self.draft.selection() == Some(token);

        let event = match outcome.result {
            Ok((order, stock)) => DraftEvent::OrderDetailLoaded {
                token,
                order,
                stock: StockSnapshotIndex::build(&stock),
            },
            Err(err) => DraftEvent::OrderDetailFailed {
                token,
                message: load_failure_message(err),
            },
        };
        self.dispatch(event)?;

        if !current {
            return Ok(false);
        }
        match (self.draft.status(), self.draft.error()) {
            (DraftStatus::Empty, Some(message)) => {
                Err(ServiceError::SelectionLoad(message.to_string()))
            }
            _ => Ok(true),
        }
    }

    /// Chooses an order and waits for its detail.
    #[instrument(skip(self), fields(kind = %self.draft.kind()))]
    pub async fn select_order(&mut self, order_id: i64) -> Result<(), ServiceError> {
        let outcome = self.choose_order(order_id)?.load().await;
        self.resolve(outcome).map(|_| ())
    }

    pub fn clear_selection(&mut self) -> Result<(), ServiceError> {
        self.dispatch(DraftEvent::OrderCleared).map(|_| ())
    }

    pub fn set_proposed_quantity(
        &mut self,
        index: usize,
        quantity: i64,
    ) -> Result<(), ServiceError> {
        self.dispatch(DraftEvent::LineEdited {
            index,
            proposed_quantity: quantity,
        })
        .map(|_| ())
    }

    /// Sets the proposed quantity of every line for `item_id`.
    pub fn set_quantity_for_item(
        &mut self,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<(), ServiceError> {
        let indexes: Vec<usize> = self
            .draft
            .lines()
            .iter()
            .enumerate()
            .filter(|(_, line)| line.item_id == item_id)
            .map(|(index, _)| index)
            .collect();

        if indexes.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Item {} is not on this {}",
                item_id,
                self.draft.kind()
            )));
        }
        for index in indexes {
            self.set_proposed_quantity(index, quantity)?;
        }
        Ok(())
    }

    pub fn set_unit_price(
        &mut self,
        index: usize,
        unit_price: Decimal,
    ) -> Result<(), ServiceError> {
        self.dispatch(DraftEvent::UnitPriceEdited { index, unit_price })
            .map(|_| ())
    }

    pub fn set_document_date(&mut self, date: NaiveDate) -> Result<(), ServiceError> {
        self.dispatch(DraftEvent::DocumentDateSet(date)).map(|_| ())
    }

    pub fn set_remarks(&mut self, remarks: impl Into<String>) -> Result<(), ServiceError> {
        self.dispatch(DraftEvent::RemarksSet(remarks.into())).map(|_| ())
    }

    /// Runs the submission checks without touching the draft or the API.
    pub fn check(&self) -> Result<(), ServiceError> {
        let awaiting_order = matches!(
            self.draft.status(),
            DraftStatus::Empty | DraftStatus::OrderSelected
        );
        if awaiting_order || self.draft.parent_order().is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Please select a {}",
                self.draft.kind().order_label()
            )));
        }
        FulfillmentReconciler::new(self.draft.kind()).submission_gate(self.draft.lines())
    }

    /// Validates and submits the draft as one atomic request.
    ///
    /// On a blocked submission the draft stays editable and the typed error
    /// (for example [`ServiceError::StockViolation`]) is returned. A refusal
    /// from the API moves the draft to `Failed` with the server's message.
    #[instrument(skip(self), fields(kind = %self.draft.kind(), mode = ?self.draft.mode()))]
    pub async fn submit(&mut self) -> Result<SubmittedDocument, ServiceError> {
        let operator_id = match self.operator_id {
            Some(id) => id,
            None => {
                warn!("submission refused: no operator");
                return Err(ServiceError::Unauthorized(OPERATOR_MISSING.to_string()));
            }
        };

        let previous = self.draft.status();
        self.dispatch(DraftEvent::SubmitRequested)?;
        if self.draft.status() != DraftStatus::Submitting {
            let message = self.draft.error().unwrap_or_default().to_string();
            return Err(match previous {
                DraftStatus::Empty | DraftStatus::OrderSelected => {
                    ServiceError::ValidationError(message)
                }
                _ => match self.check() {
                    Err(err) => err,
                    Ok(()) => ServiceError::ValidationError(message),
                },
            });
        }

        let document = self.draft.document().ok_or_else(|| {
            ServiceError::InternalError("submitting a draft without a parent order".to_string())
        })?;
        let kind = self.draft.kind();
        let request = document.to_submission(Some(operator_id));

        let result = match self.draft.mode() {
            DraftMode::Create => {
                self.api
                    .create_document(kind, document.parent_order_id, request)
                    .await
            }
            DraftMode::Edit { document_id } => {
                self.api.update_document(kind, document_id, request).await
            }
        };

        match result {
            Ok(submitted) => {
                info!(
                    id = ?submitted.id,
                    number = ?submitted.number,
                    total = %document.grand_total(),
                    "{} submitted",
                    kind
                );
                self.dispatch(DraftEvent::SubmitSucceeded(submitted.clone()))?;
                Ok(submitted)
            }
            Err(err) => {
                let message = match err {
                    ServiceError::Submission(message) => message,
                    other => other.to_string(),
                };
                warn!(%message, "{} submission failed", kind);
                self.dispatch(DraftEvent::SubmitFailed(message.clone()))?;
                Err(ServiceError::Submission(message))
            }
        }
    }
}

fn load_failure_message(err: ServiceError) -> String {
    match err {
        ServiceError::NotFound(message)
        | ServiceError::ExternalApiError(message)
        | ServiceError::SelectionLoad(message) => message,
        other => other.to_string(),
    }
}
