use std::{str::FromStr, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use inventoryflow_fulfillment::{
    config::{self, AppConfig},
    models::{
        FulfillmentKind, FulfillmentLine, ItemId, StockLevel, SubmittedDocument, MAX_UNIT_PRICE,
    },
    FulfillmentDraft, FulfillmentSession, HttpOrderManagementClient,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize(cli.user_id)?;

    match cli.command {
        Commands::Issue(command) => {
            handle_document_command(&context, FulfillmentKind::Issue, command, cli.json).await?
        }
        Commands::Receive(command) => {
            handle_document_command(&context, FulfillmentKind::Receipt, command, cli.json).await?
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "fulfillment",
    about = "Issue goods against sales orders and receive goods against purchase orders",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        help = "Operator recorded on the document (overrides APP__USER_ID)"
    )]
    user_id: Option<i64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Goods issue notes (GIN) against sales orders
    #[command(subcommand)]
    Issue(DocumentCommands),
    /// Goods receive notes (GRN) against purchase orders
    #[command(subcommand)]
    Receive(DocumentCommands),
}

#[derive(Subcommand)]
enum DocumentCommands {
    Create(CreateArgs),
    Edit(EditArgs),
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long, help = "Parent order identifier")]
    order: i64,
    #[command(flatten)]
    changes: DraftChanges,
}

#[derive(Args)]
struct EditArgs {
    #[arg(long, help = "Identifier of the committed GIN or GRN to revise")]
    document: i64,
    #[command(flatten)]
    changes: DraftChanges,
}

#[derive(Args)]
struct DraftChanges {
    #[arg(
        long = "qty",
        value_parser = parse_quantity,
        action = ArgAction::Append,
        help = "Proposed quantity for an item, as ITEM=QTY (defaults to the ordered quantity)"
    )]
    quantities: Vec<(ItemId, i64)>,
    #[arg(
        long = "price",
        value_parser = parse_price,
        action = ArgAction::Append,
        help = "Unit price for an item on a receipt, as ITEM=PRICE"
    )]
    prices: Vec<(ItemId, Decimal)>,
    #[arg(long, value_parser = parse_date, help = "Document date (YYYY-MM-DD, defaults to today)")]
    date: Option<NaiveDate>,
    #[arg(long, help = "Free-form remarks for the document")]
    remarks: Option<String>,
    #[arg(long, action = ArgAction::SetTrue, help = "Reconcile and validate without submitting")]
    dry_run: bool,
}

struct CliContext {
    api: Arc<HttpOrderManagementClient>,
    operator_id: Option<i64>,
}

impl CliContext {
    fn initialize(user_override: Option<i64>) -> Result<Self> {
        let config: AppConfig =
            config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let api = HttpOrderManagementClient::from_config(&config)
            .context("failed to build order-management client")?;
        debug!(base_url = %api.base_url(), "order-management client ready");

        Ok(Self {
            api: Arc::new(api),
            operator_id: user_override.or(config.user_id),
        })
    }
}

#[derive(Serialize)]
struct DraftReport<'a> {
    draft: &'a FulfillmentDraft,
    grand_total: Decimal,
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    submitted: Option<&'a SubmittedDocument>,
}

async fn handle_document_command(
    context: &CliContext,
    kind: FulfillmentKind,
    command: DocumentCommands,
    json: bool,
) -> Result<()> {
    let (mut session, changes) = match command {
        DocumentCommands::Create(args) => {
            let mut session =
                FulfillmentSession::new(Arc::clone(&context.api), kind, context.operator_id);
            session.select_order(args.order).await.with_context(|| {
                format!("failed to load {} {}", kind.order_label(), args.order)
            })?;
            (session, args.changes)
        }
        DocumentCommands::Edit(args) => {
            let session = FulfillmentSession::open_document(
                Arc::clone(&context.api),
                kind,
                args.document,
                context.operator_id,
            )
            .await
            .with_context(|| format!("failed to open {} {}", kind, args.document))?;
            (session, args.changes)
        }
    };

    apply_changes(&mut session, kind, &changes)?;

    if changes.dry_run {
        let ready = session.check();
        render(session.draft(), ready.is_ok(), None, json)?;
        return ready.context("draft would be rejected");
    }

    let outcome = session.submit().await;
    let submitted = outcome.as_ref().ok();
    render(session.draft(), submitted.is_some(), submitted, json)?;
    outcome
        .map(|_| ())
        .with_context(|| format!("failed to submit {}", kind))
}

fn apply_changes(
    session: &mut FulfillmentSession<HttpOrderManagementClient>,
    kind: FulfillmentKind,
    changes: &DraftChanges,
) -> Result<()> {
    for (item_id, quantity) in &changes.quantities {
        session
            .set_quantity_for_item(*item_id, *quantity)
            .with_context(|| format!("cannot set quantity for item {}", item_id))?;
    }

    if !changes.prices.is_empty() && kind != FulfillmentKind::Receipt {
        bail!("unit prices can only be changed on receipts");
    }
    for (item_id, price) in &changes.prices {
        let indexes: Vec<usize> = session
            .draft()
            .lines()
            .iter()
            .enumerate()
            .filter(|(_, line)| line.item_id == *item_id)
            .map(|(index, _)| index)
            .collect();
        if indexes.is_empty() {
            bail!("item {} is not on this {}", item_id, kind);
        }
        for index in indexes {
            session
                .set_unit_price(index, *price)
                .with_context(|| format!("cannot set price for item {}", item_id))?;
        }
    }

    if let Some(date) = changes.date {
        session.set_document_date(date)?;
    }
    if let Some(remarks) = &changes.remarks {
        session.set_remarks(remarks.clone())?;
    }
    Ok(())
}

fn render(
    draft: &FulfillmentDraft,
    ready: bool,
    submitted: Option<&SubmittedDocument>,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(&DraftReport {
            draft,
            grand_total: draft.grand_total(),
            ready,
            submitted,
        });
    }

    if let Some(document) = submitted {
        println!(
            "{} {} submitted (status {})",
            draft.kind(),
            document
                .number
                .clone()
                .or_else(|| document.id.map(|id| format!("#{}", id)))
                .unwrap_or_else(|| "-".to_string()),
            document.status.as_deref().unwrap_or("unknown")
        );
        return Ok(());
    }

    if let Some(order) = draft.parent_order() {
        println!(
            "{} for {} {} • {} • status {}",
            draft.kind(),
            draft.kind().order_label(),
            order
                .number
                .clone()
                .unwrap_or_else(|| format!("#{}", order.id)),
            draft.document_date(),
            draft.status()
        );
    }
    for line in draft.lines() {
        render_line(line);
    }
    println!("Grand total: {}", draft.grand_total());
    for violation in draft.violations() {
        println!("  ! {}", violation);
    }
    if let Some(error) = draft.error() {
        println!("{}", error);
    }
    Ok(())
}

fn render_line(line: &FulfillmentLine) {
    let level = match line.stock_level() {
        StockLevel::OutOfStock => "out of stock",
        StockLevel::Short => "short",
        StockLevel::Sufficient => "ok",
    };
    println!(
        "  • [{}] {} ordered {} • proposed {} • available {} ({}) @ {} = {}",
        line.item_id,
        line.item_name,
        line.ordered_quantity,
        line.proposed_quantity,
        line.available_stock,
        level,
        line.unit_price,
        line.line_total()
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn split_pair(raw: &str) -> Result<(ItemId, &str), String> {
    let (item, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid value '{raw}', expected ITEM=VALUE"))?;
    let item_id = ItemId::from_str(item).map_err(|e| e.to_string())?;
    Ok((item_id, value.trim()))
}

fn parse_quantity(raw: &str) -> Result<(ItemId, i64), String> {
    let (item_id, value) = split_pair(raw)?;
    let quantity: i64 = value
        .parse()
        .map_err(|_| format!("invalid quantity '{value}'"))?;
    if quantity < 0 {
        return Err("quantity cannot be negative".to_string());
    }
    Ok((item_id, quantity))
}

fn parse_price(raw: &str) -> Result<(ItemId, Decimal), String> {
    let (item_id, value) = split_pair(raw)?;
    let price = Decimal::from_str(value).map_err(|_| format!("invalid decimal '{value}'"))?;
    if price.is_sign_negative() || price > MAX_UNIT_PRICE {
        return Err(format!("price must be between 0 and {MAX_UNIT_PRICE}"));
    }
    Ok((item_id, price))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}
