use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ItemId, OrderStatus};

/// Highest unit price an operator may enter on a receipt line.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Which side of the warehouse a fulfillment document moves stock on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum FulfillmentKind {
    /// Goods Issue Note against a sales order; decreases on-hand stock.
    #[strum(serialize = "GIN")]
    Issue,
    /// Goods Receive Note against a purchase order; increases on-hand stock.
    #[strum(serialize = "GRN")]
    Receipt,
}

impl FulfillmentKind {
    pub fn order_label(self) -> &'static str {
        match self {
            FulfillmentKind::Issue => "Sales Order",
            FulfillmentKind::Receipt => "Purchase Order",
        }
    }

    /// Whether a parent order in `status` may be fulfilled by this kind of document.
    ///
    /// Goods are issued only against confirmed or invoiced sales orders and
    /// received only against approved purchase orders.
    pub fn accepts_order_status(self, status: &OrderStatus) -> bool {
        match self {
            FulfillmentKind::Issue => {
                matches!(status, OrderStatus::Confirmed | OrderStatus::Invoiced)
            }
            FulfillmentKind::Receipt => matches!(status, OrderStatus::Approved),
        }
    }

    /// Signed stock movement caused by committing `quantity` on a document of this kind.
    pub fn stock_effect(self, quantity: i64) -> i64 {
        match self {
            FulfillmentKind::Issue => -quantity,
            FulfillmentKind::Receipt => quantity,
        }
    }
}

/// How the available stock on a line compares with what was ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockLevel {
    OutOfStock,
    Short,
    Sufficient,
}

/// Working row pairing an ordered quantity with the quantity about to be
/// issued or received and the stock available to satisfy it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub item_sku: Option<String>,
    pub ordered_quantity: i64,
    pub proposed_quantity: i64,
    pub unit_price: Decimal,
    pub available_stock: i64,
}

impl FulfillmentLine {
    /// Saturates at `Decimal::MAX` instead of overflowing.
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.proposed_quantity).saturating_mul(self.unit_price)
    }

    pub fn exceeds_stock(&self) -> bool {
        self.proposed_quantity > self.available_stock
    }

    pub fn stock_level(&self) -> StockLevel {
        if self.available_stock <= 0 {
            StockLevel::OutOfStock
        } else if self.available_stock < self.ordered_quantity {
            StockLevel::Short
        } else {
            StockLevel::Sufficient
        }
    }
}

/// Quantity a previously submitted document already moved for one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

pub fn grand_total(lines: &[FulfillmentLine]) -> Decimal {
    lines
        .iter()
        .map(FulfillmentLine::line_total)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// The GRN or GIN being authored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentDocument {
    pub parent_order_id: i64,
    pub document_date: NaiveDate,
    pub remarks: String,
    pub lines: Vec<FulfillmentLine>,
}

impl FulfillmentDocument {
    pub fn grand_total(&self) -> Decimal {
        grand_total(&self.lines)
    }

    pub fn to_submission(&self, submitted_by: Option<i64>) -> SubmissionRequest {
        SubmissionRequest {
            document_date: self.document_date,
            remarks: self.remarks.clone(),
            submitted_by,
            lines: self
                .lines
                .iter()
                .map(|line| SubmissionLine {
                    item_id: line.item_id,
                    ordered_quantity: line.ordered_quantity,
                    fulfilled_quantity: line.proposed_quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        }
    }
}

/// Body sent to the order-management API to create or update a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub document_date: NaiveDate,
    pub remarks: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<i64>,
    pub lines: Vec<SubmissionLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionLine {
    pub item_id: ItemId,
    pub ordered_quantity: i64,
    pub fulfilled_quantity: i64,
    pub unit_price: Decimal,
}

/// A previously submitted document, as loaded for editing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingDocument {
    pub id: i64,
    pub number: Option<String>,
    pub parent_order_id: i64,
    pub parent_order_number: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub status: Option<String>,
    pub lines: Vec<DocumentLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub item_sku: Option<String>,
    pub ordered_quantity: i64,
    pub fulfilled_quantity: i64,
    pub unit_price: Decimal,
}

impl ExistingDocument {
    pub fn committed_lines(&self) -> Vec<CommittedLine> {
        self.lines
            .iter()
            .map(|line| CommittedLine {
                item_id: line.item_id,
                quantity: line.fulfilled_quantity,
            })
            .collect()
    }
}

/// What the API hands back after accepting a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedDocument {
    pub id: Option<i64>,
    pub number: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(ordered: i64, proposed: i64, available: i64, price: Decimal) -> FulfillmentLine {
        FulfillmentLine {
            item_id: ItemId::new(1),
            item_name: "Widget".to_string(),
            item_sku: Some("W-1".to_string()),
            ordered_quantity: ordered,
            proposed_quantity: proposed,
            unit_price: price,
            available_stock: available,
        }
    }

    #[test]
    fn line_total_uses_proposed_quantity() {
        assert_eq!(line(10, 8, 8, dec!(50.00)).line_total(), dec!(400.00));
    }

    #[test]
    fn grand_total_sums_lines() {
        let lines = vec![line(10, 10, 8, dec!(50.00)), line(4, 4, 10, dec!(20.00))];
        assert_eq!(grand_total(&lines), dec!(580.00));
        assert_eq!(grand_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn oversized_totals_saturate() {
        let lines = vec![
            line(i64::MAX, i64::MAX, 0, Decimal::MAX),
            line(1, 1, 0, Decimal::MAX),
        ];
        assert_eq!(lines[0].line_total(), Decimal::MAX);
        assert_eq!(grand_total(&lines), Decimal::MAX);
    }

    #[test]
    fn stock_level_classification() {
        assert_eq!(line(5, 5, 0, dec!(1)).stock_level(), StockLevel::OutOfStock);
        assert_eq!(line(5, 5, -2, dec!(1)).stock_level(), StockLevel::OutOfStock);
        assert_eq!(line(5, 5, 3, dec!(1)).stock_level(), StockLevel::Short);
        assert_eq!(line(5, 5, 5, dec!(1)).stock_level(), StockLevel::Sufficient);
    }

    #[test]
    fn eligibility_by_kind() {
        assert!(FulfillmentKind::Issue.accepts_order_status(&OrderStatus::Confirmed));
        assert!(FulfillmentKind::Issue.accepts_order_status(&OrderStatus::Invoiced));
        assert!(!FulfillmentKind::Issue.accepts_order_status(&OrderStatus::Draft));
        assert!(FulfillmentKind::Receipt.accepts_order_status(&OrderStatus::Approved));
        assert!(!FulfillmentKind::Receipt.accepts_order_status(&OrderStatus::Confirmed));
    }

    #[test]
    fn submission_carries_proposed_quantities() {
        let document = FulfillmentDocument {
            parent_order_id: 9,
            document_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            remarks: "partial".to_string(),
            lines: vec![line(10, 7, 8, dec!(50.00))],
        };

        let request = document.to_submission(Some(3));
        assert_eq!(request.submitted_by, Some(3));
        assert_eq!(request.lines[0].ordered_quantity, 10);
        assert_eq!(request.lines[0].fulfilled_quantity, 7);
        assert_eq!(document.grand_total(), dec!(350.00));
    }
}
