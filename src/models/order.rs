use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ItemId;

/// Lifecycle status of a parent order (sales or purchase).
///
/// Statuses the back office does not define here are kept verbatim in
/// `Other` so they can still be shown to the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::EnumString)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OrderStatus {
    Draft,
    Pending,
    Approved,
    Confirmed,
    Invoiced,
    Dispatched,
    Received,
    Cancelled,
    #[strum(default)]
    Other(String),
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Invoiced => "INVOICED",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Other(raw) => raw.as_str(),
        };
        f.write_str(label)
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        raw.trim()
            .parse()
            .unwrap_or_else(|_| OrderStatus::Other(raw))
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.to_string()
    }
}

/// One line of a parent order, normalized at the API boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub item_sku: Option<String>,
    pub ordered_quantity: i64,
    pub unit_price: Decimal,
}

/// A sales order (for issuing) or purchase order (for receiving) with its lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentOrder {
    pub id: i64,
    pub number: Option<String>,
    /// Customer for sales orders, supplier for purchase orders.
    pub counterparty: Option<String>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
}

impl ParentOrder {
    /// Order number if the API supplied one, otherwise the numeric id.
    pub fn display_number(&self) -> String {
        self.number
            .clone()
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}
