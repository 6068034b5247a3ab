use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ServiceError;
use crate::models::{FulfillmentLine, ItemId};

/// A line asking for more than the stock available to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockViolation {
    pub item_id: ItemId,
    pub item_name: String,
    pub requested: i64,
    pub available: i64,
}

impl fmt::Display for StockViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: requested {}, available {}",
            self.item_name, self.requested, self.available
        )
    }
}

/// Every violation found in one pass, rendered one per line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationReport(Vec<StockViolation>);

impl ViolationReport {
    pub fn new(violations: Vec<StockViolation>) -> Self {
        Self(violations)
    }

    pub fn violations(&self) -> &[StockViolation] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("\n"))
    }
}

/// Returns one violation per line whose proposed quantity exceeds its
/// available stock, in line order. Never fails; an empty list means every
/// line is within bounds.
///
/// This is a courtesy check for the operator. The order-management API
/// re-validates on submission and has the final word.
pub fn validate_stock(lines: &[FulfillmentLine]) -> Vec<StockViolation> {
    lines
        .iter()
        .filter(|line| line.exceeds_stock())
        .map(|line| StockViolation {
            item_id: line.item_id,
            item_name: line.item_name.clone(),
            requested: line.proposed_quantity,
            available: line.available_stock,
        })
        .collect()
}

/// Receipt lines need a positive quantity and a positive unit price.
pub fn check_receipt_lines(lines: &[FulfillmentLine]) -> Result<(), ServiceError> {
    let invalid = lines
        .iter()
        .any(|line| line.proposed_quantity <= 0 || line.unit_price <= Decimal::ZERO);

    if invalid {
        return Err(ServiceError::ValidationError(
            "Please ensure all items have valid quantity and unit price".to_string(),
        ));
    }
    Ok(())
}
