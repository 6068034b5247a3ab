//! Order-management API seam.
//!
//! The reconciler only ever needs read access to orders, stock and existing
//! documents, plus the two write calls that persist a GIN or GRN. Everything
//! behind [`OrderManagementApi`] is the back office's responsibility,
//! including the actual stock mutation.

pub mod dto;
pub mod http;

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::models::{
    ExistingDocument, FulfillmentKind, ParentOrder, StockRecord, SubmissionRequest,
    SubmittedDocument,
};

pub use http::HttpOrderManagementClient;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderManagementApi: Send + Sync {
    /// Current on-hand quantity for every stocked item.
    async fn fetch_stock_snapshot(&self) -> Result<Vec<StockRecord>, ServiceError>;

    /// The sales order (issue) or purchase order (receipt) a document is raised against.
    async fn fetch_parent_order(
        &self,
        kind: FulfillmentKind,
        order_id: i64,
    ) -> Result<ParentOrder, ServiceError>;

    /// A previously committed GIN or GRN, for editing.
    async fn fetch_document(
        &self,
        kind: FulfillmentKind,
        document_id: i64,
    ) -> Result<ExistingDocument, ServiceError>;

    async fn create_document(
        &self,
        kind: FulfillmentKind,
        parent_order_id: i64,
        request: SubmissionRequest,
    ) -> Result<SubmittedDocument, ServiceError>;

    async fn update_document(
        &self,
        kind: FulfillmentKind,
        document_id: i64,
        request: SubmissionRequest,
    ) -> Result<SubmittedDocument, ServiceError>;
}
