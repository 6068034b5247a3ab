//! Wire shapes of the order-management API.
//!
//! These mirror the JSON the back office actually sends and are converted
//! into the crate's models at the boundary. Identifiers, missing quantities
//! and the two ways an order line can reference its item are all settled
//! here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{
    null_as_zero, DocumentLine, ExistingDocument, ItemId, OrderLine, OrderStatus, ParentOrder,
    SubmissionRequest, SubmittedDocument,
};

/// `{ success, message, data }` wrapper around every response.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemRefDto {
    pub id: Option<ItemId>,
    pub name: Option<String>,
    pub sku: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDto {
    pub item_id: Option<ItemId>,
    pub item: Option<ItemRefDto>,
    pub item_name: Option<String>,
    pub item_sku: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub quantity: i64,
    pub unit_price: Option<Decimal>,
}

impl OrderLineDto {
    fn into_line(self) -> Result<OrderLine, ServiceError> {
        let item = self.item.unwrap_or_default();
        let item_id = self.item_id.or(item.id).ok_or_else(|| {
            ServiceError::ExternalApiError("Order line is missing its item".to_string())
        })?;

        Ok(OrderLine {
            item_id,
            item_name: self
                .item_name
                .or(item.name)
                .unwrap_or_else(|| format!("Item {}", item_id)),
            item_sku: self.item_sku.or(item.sku),
            ordered_quantity: self.quantity,
            unit_price: self.unit_price.unwrap_or(Decimal::ZERO),
        })
    }
}

fn into_lines(lines: Option<Vec<OrderLineDto>>) -> Result<Vec<OrderLine>, ServiceError> {
    lines
        .unwrap_or_default()
        .into_iter()
        .map(OrderLineDto::into_line)
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrderDto {
    pub id: i64,
    pub so_number: Option<String>,
    pub customer_name: Option<String>,
    pub status: Option<String>,
    pub order_lines: Option<Vec<OrderLineDto>>,
}

impl TryFrom<SalesOrderDto> for ParentOrder {
    type Error = ServiceError;

    fn try_from(dto: SalesOrderDto) -> Result<Self, Self::Error> {
        Ok(ParentOrder {
            id: dto.id,
            number: dto.so_number,
            counterparty: dto.customer_name,
            status: OrderStatus::from(dto.status.unwrap_or_default()),
            lines: into_lines(dto.order_lines)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDto {
    pub id: i64,
    pub po_number: Option<String>,
    pub supplier_name: Option<String>,
    pub status: Option<String>,
    pub order_lines: Option<Vec<OrderLineDto>>,
}

impl TryFrom<PurchaseOrderDto> for ParentOrder {
    type Error = ServiceError;

    fn try_from(dto: PurchaseOrderDto) -> Result<Self, Self::Error> {
        Ok(ParentOrder {
            id: dto.id,
            number: dto.po_number,
            counterparty: dto.supplier_name,
            status: OrderStatus::from(dto.status.unwrap_or_default()),
            lines: into_lines(dto.order_lines)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GinLineDto {
    pub item_id: ItemId,
    pub item_name: Option<String>,
    pub item_sku: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub quantity_ordered: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub quantity_issued: i64,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GinDto {
    pub id: i64,
    pub gin_number: Option<String>,
    pub sales_order_id: i64,
    pub so_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub status: Option<String>,
    pub gin_lines: Option<Vec<GinLineDto>>,
}

impl From<GinDto> for ExistingDocument {
    fn from(dto: GinDto) -> Self {
        ExistingDocument {
            id: dto.id,
            number: dto.gin_number,
            parent_order_id: dto.sales_order_id,
            parent_order_number: dto.so_number,
            document_date: dto.issue_date,
            remarks: dto.remarks,
            status: dto.status,
            lines: dto
                .gin_lines
                .unwrap_or_default()
                .into_iter()
                .map(|line| DocumentLine {
                    item_id: line.item_id,
                    item_name: line
                        .item_name
                        .unwrap_or_else(|| format!("Item {}", line.item_id)),
                    item_sku: line.item_sku,
                    ordered_quantity: line.quantity_ordered,
                    fulfilled_quantity: line.quantity_issued,
                    unit_price: line.unit_price.unwrap_or(Decimal::ZERO),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrnLineDto {
    pub item_id: ItemId,
    pub item_name: Option<String>,
    pub item_sku: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub quantity_ordered: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub quantity_received: i64,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrnDto {
    pub id: i64,
    pub grn_number: Option<String>,
    pub purchase_order_id: i64,
    pub po_number: Option<String>,
    pub receive_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub status: Option<String>,
    pub grn_lines: Option<Vec<GrnLineDto>>,
}

impl From<GrnDto> for ExistingDocument {
    fn from(dto: GrnDto) -> Self {
        ExistingDocument {
            id: dto.id,
            number: dto.grn_number,
            parent_order_id: dto.purchase_order_id,
            parent_order_number: dto.po_number,
            document_date: dto.receive_date,
            remarks: dto.remarks,
            status: dto.status,
            lines: dto
                .grn_lines
                .unwrap_or_default()
                .into_iter()
                .map(|line| DocumentLine {
                    item_id: line.item_id,
                    item_name: line
                        .item_name
                        .unwrap_or_else(|| format!("Item {}", line.item_id)),
                    item_sku: line.item_sku,
                    ordered_quantity: line.quantity_ordered,
                    fulfilled_quantity: line.quantity_received,
                    unit_price: line.unit_price.unwrap_or(Decimal::ZERO),
                })
                .collect(),
        }
    }
}

/// Just enough of a created or updated GIN/GRN to report back.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummaryDto {
    pub id: Option<i64>,
    #[serde(alias = "ginNumber", alias = "grnNumber")]
    pub number: Option<String>,
    pub status: Option<String>,
}

impl From<DocumentSummaryDto> for SubmittedDocument {
    fn from(dto: DocumentSummaryDto) -> Self {
        SubmittedDocument {
            id: dto.id,
            number: dto.number,
            status: dto.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GinLineRequest {
    pub item_id: ItemId,
    pub quantity_ordered: i64,
    pub quantity_issued: i64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GinRequest {
    pub issue_date: NaiveDate,
    pub remarks: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_by_id: Option<i64>,
    pub gin_lines: Vec<GinLineRequest>,
}

impl From<SubmissionRequest> for GinRequest {
    fn from(request: SubmissionRequest) -> Self {
        GinRequest {
            issue_date: request.document_date,
            remarks: request.remarks,
            issued_by_id: request.submitted_by,
            gin_lines: request
                .lines
                .into_iter()
                .map(|line| GinLineRequest {
                    item_id: line.item_id,
                    quantity_ordered: line.ordered_quantity,
                    quantity_issued: line.fulfilled_quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrnLineRequest {
    pub item_id: ItemId,
    pub quantity_ordered: i64,
    pub quantity_received: i64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrnRequest {
    pub receive_date: NaiveDate,
    pub remarks: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_by_id: Option<i64>,
    pub grn_lines: Vec<GrnLineRequest>,
}

impl From<SubmissionRequest> for GrnRequest {
    fn from(request: SubmissionRequest) -> Self {
        GrnRequest {
            receive_date: request.document_date,
            remarks: request.remarks,
            received_by_id: request.submitted_by,
            grn_lines: request
                .lines
                .into_iter()
                .map(|line| GrnLineRequest {
                    item_id: line.item_id,
                    quantity_ordered: line.ordered_quantity,
                    quantity_received: line.fulfilled_quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        }
    }
}
