use assert_matches::assert_matches;
use inventoryflow_fulfillment::draft::{DraftEvent, DraftStatus, FulfillmentDraft};
use inventoryflow_fulfillment::models::{
    DocumentLine, ExistingDocument, FulfillmentKind, FulfillmentLine, ItemId, OrderLine,
    OrderStatus, ParentOrder, StockRecord,
};
use inventoryflow_fulfillment::services::validator::validate_stock;
use inventoryflow_fulfillment::{FulfillmentReconciler, ServiceError, StockSnapshotIndex};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn order_line(item: i64, name: &str, quantity: i64, price: Decimal) -> OrderLine {
    OrderLine {
        item_id: ItemId::new(item),
        item_name: name.to_string(),
        item_sku: Some(format!("SKU-{}", item)),
        ordered_quantity: quantity,
        unit_price: price,
    }
}

fn working_line(item: i64, proposed: i64, available: i64) -> FulfillmentLine {
    FulfillmentLine {
        item_id: ItemId::new(item),
        item_name: format!("Item {}", item),
        item_sku: None,
        ordered_quantity: proposed,
        proposed_quantity: proposed,
        unit_price: dec!(1.00),
        available_stock: available,
    }
}

#[fixture]
fn sales_order() -> ParentOrder {
    ParentOrder {
        id: 12,
        number: Some("SO-0012".to_string()),
        counterparty: Some("Acme".to_string()),
        status: OrderStatus::Confirmed,
        lines: vec![
            order_line(1, "itemA", 10, dec!(50.00)),
            order_line(2, "itemB", 4, dec!(20.00)),
        ],
    }
}

#[fixture]
fn stock() -> StockSnapshotIndex {
    StockSnapshotIndex::build(&[StockRecord::new(1, 8), StockRecord::new(2, 10)])
}

#[test]
fn only_the_over_requested_line_is_reported() {
    let lines = vec![working_line(1, 5, 3), working_line(2, 2, 10)];

    let violations = validate_stock(&lines);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].item_id, ItemId::new(1));
    assert!(violations[0].to_string().contains("requested 5, available 3"));
}

#[rstest]
#[case(FulfillmentKind::Issue, OrderStatus::Confirmed)]
#[case(FulfillmentKind::Receipt, OrderStatus::Approved)]
fn order_without_lines_blocks_selection(
    #[case] kind: FulfillmentKind,
    #[case] status: OrderStatus,
    stock: StockSnapshotIndex,
) {
    let order = ParentOrder {
        id: 3,
        number: None,
        counterparty: None,
        status,
        lines: Vec::new(),
    };

    let err = FulfillmentReconciler::new(kind)
        .lines_for_order(&order, &stock)
        .unwrap_err();

    assert_matches!(err, ServiceError::SelectionLoad(message) if message.contains("has no items"));
}

#[rstest]
#[case(OrderStatus::Draft)]
#[case(OrderStatus::Dispatched)]
#[case(OrderStatus::Cancelled)]
fn ineligible_sales_orders_are_refused(
    #[case] status: OrderStatus,
    sales_order: ParentOrder,
    stock: StockSnapshotIndex,
) {
    let order = ParentOrder {
        status,
        ..sales_order
    };

    let result = FulfillmentReconciler::new(FulfillmentKind::Issue).lines_for_order(&order, &stock);

    assert_matches!(result, Err(ServiceError::SelectionLoad(_)));
}

#[rstest]
fn shortage_blocks_submission_until_corrected(sales_order: ParentOrder, stock: StockSnapshotIndex) {
    let reconciler = FulfillmentReconciler::new(FulfillmentKind::Issue);
    let mut lines = reconciler.lines_for_order(&sales_order, &stock).unwrap();

    let violations = reconciler.violations(&lines);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].item_name, "itemA");
    assert_eq!(violations[0].to_string(), "itemA: requested 10, available 8");

    assert_matches!(
        reconciler.submission_gate(&lines),
        Err(ServiceError::StockViolation(report)) if report.len() == 1
    );

    lines[0].proposed_quantity = 9;
    assert!(reconciler.submission_gate(&lines).is_err());

    lines[0].proposed_quantity = 8;
    assert!(reconciler.submission_gate(&lines).is_ok());
    assert_eq!(
        lines.iter().map(FulfillmentLine::line_total).sum::<Decimal>(),
        dec!(480.00)
    );
}

#[rstest]
fn reopened_gin_shows_committed_quantity_as_available() {
    let document = ExistingDocument {
        id: 5,
        number: Some("GIN-0005".to_string()),
        parent_order_id: 12,
        parent_order_number: Some("SO-0012".to_string()),
        document_date: None,
        remarks: None,
        status: Some("DRAFT".to_string()),
        lines: vec![DocumentLine {
            item_id: ItemId::new(1),
            item_name: "itemA".to_string(),
            item_sku: None,
            ordered_quantity: 10,
            fulfilled_quantity: 6,
            unit_price: dec!(50.00),
        }],
    };
    let stock = StockSnapshotIndex::build(&[StockRecord::new(1, 2)]);

    let lines = FulfillmentReconciler::new(FulfillmentKind::Issue)
        .lines_for_edit(&document, &stock)
        .unwrap();

    assert_eq!(lines[0].available_stock, 8);
    assert_eq!(lines[0].proposed_quantity, 6);
}

#[rstest]
fn draft_walks_from_selection_to_validated(sales_order: ParentOrder, stock: StockSnapshotIndex) {
    let draft = FulfillmentDraft::new(FulfillmentKind::Issue)
        .apply(DraftEvent::OrderChosen { order_id: 12 })
        .unwrap();
    assert_eq!(draft.status(), DraftStatus::OrderSelected);
    let token = draft.selection().unwrap();

    let draft = draft
        .apply(DraftEvent::OrderDetailLoaded {
            token,
            order: sales_order,
            stock,
        })
        .unwrap();
    assert_eq!(draft.status(), DraftStatus::LinesLoaded);
    assert_eq!(draft.grand_total(), dec!(580.00));

    let draft = draft
        .apply(DraftEvent::LineEdited {
            index: 0,
            proposed_quantity: 8,
        })
        .unwrap();
    assert_eq!(draft.status(), DraftStatus::Validated);
    assert!(draft.violations().is_empty());
    assert_eq!(draft.grand_total(), dec!(480.00));

    let draft = draft.apply(DraftEvent::SubmitRequested).unwrap();
    assert_eq!(draft.status(), DraftStatus::Submitting);
}

#[rstest]
#[case(0, dec!(12.50), false)]
#[case(3, dec!(0), false)]
#[case(3, dec!(12.50), true)]
fn receipt_lines_need_quantity_and_price(
    #[case] quantity: i64,
    #[case] price: Decimal,
    #[case] accepted: bool,
) {
    let mut line = working_line(4, quantity, 0);
    line.unit_price = price;

    let result = FulfillmentReconciler::new(FulfillmentKind::Receipt).submission_gate(&[line]);

    assert_eq!(result.is_ok(), accepted);
}
