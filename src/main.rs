use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use rental::config::{
    config_dir, ensure_initialized, load_config, load_state, resolve_output_dir, save_state,
    CONFIG_TEMPLATE,
};
use rental::error::{RentalError, Result};
use rental::export::{format_money, InvoiceExportPipeline, PdfWriter, TypstRenderer};
use rental::order::{
    grand_total, parse_item_input, summarize, total, Order, OrderDetails, ReportOptions,
    ReportRange,
};

#[derive(Parser)]
#[command(name = "rental")]
#[command(version, about = "Rental order bookkeeping with invoice export", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.rental)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Record a new rental order
    New {
        /// Customer name
        #[arg(long)]
        name: String,

        /// Customer phone number
        #[arg(long)]
        phone: String,

        /// Customer address
        #[arg(long)]
        address: Option<String>,

        /// First rental day (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last rental day (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Order date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Free-form notes printed on the invoice
        #[arg(long)]
        notes: Option<String>,

        /// Line items in format "car_type:quantity:daily_rate:days" (can be repeated)
        #[arg(short, long, value_name = "CAR:QTY:RATE:DAYS")]
        item: Vec<String>,
    },

    /// List recorded orders, newest first
    List {
        /// Number of orders to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show an order and its line items
    Show {
        /// Order index from 'list' or id prefix
        order: String,
    },

    /// Add a line item to an order
    AddItem {
        /// Order index from 'list' or id prefix
        order: String,

        /// Line item in format "car_type:quantity:daily_rate:days"
        #[arg(value_name = "CAR:QTY:RATE:DAYS")]
        item: String,
    },

    /// Replace a line item on an order
    EditItem {
        /// Order index from 'list' or id prefix
        order: String,

        /// 1-based item number from 'show'
        index: usize,

        /// Replacement in format "car_type:quantity:daily_rate:days"
        #[arg(value_name = "CAR:QTY:RATE:DAYS")]
        item: String,
    },

    /// Remove a line item from an order
    RemoveItem {
        /// Order index from 'list' or id prefix
        order: String,

        /// 1-based item number from 'show'
        index: usize,
    },

    /// Delete an order
    Delete {
        /// Order index from 'list' or id prefix
        order: String,
    },

    /// Export an order's invoice as PDF
    Export {
        /// Order index from 'list' or id prefix
        order: String,

        /// Directory to write into (default: export.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open exported PDF with system default viewer
        #[arg(long)]
        open: bool,
    },

    /// Monthly revenue summary
    Report {
        /// Only orders on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only orders on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Include months without orders
        #[arg(long)]
        dense: bool,
    },

    /// Show config location and recent orders
    Status,
}

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by RENTAL_LOG (default: warn)
fn init_logging() {
    let filter = EnvFilter::try_from_env("RENTAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::New {
            name,
            phone,
            address,
            start,
            end,
            date,
            notes,
            item,
        } => {
            let details = order_details(name, phone, address, &start, &end, date, notes)?;
            cmd_new(&cfg_dir, details, &item)
        }
        Commands::List { limit } => cmd_list(&cfg_dir, limit),
        Commands::Show { order } => cmd_show(&cfg_dir, &order),
        Commands::AddItem { order, item } => cmd_add_item(&cfg_dir, &order, &item),
        Commands::EditItem { order, index, item } => cmd_edit_item(&cfg_dir, &order, index, &item),
        Commands::RemoveItem { order, index } => cmd_remove_item(&cfg_dir, &order, index),
        Commands::Delete { order } => cmd_delete(&cfg_dir, &order),
        Commands::Export {
            order,
            output,
            open,
        } => cmd_export(&cfg_dir, &order, output, open),
        Commands::Report { from, to, dense } => cmd_report(&cfg_dir, from, to, dense),
        Commands::Status => cmd_status(&cfg_dir),
    }
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| RentalError::InvalidDate(input.to_string()))
}

fn non_blank(field: &str, value: String) -> Result<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(RentalError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn order_details(
    name: String,
    phone: String,
    address: Option<String>,
    start: &str,
    end: &str,
    date: Option<String>,
    notes: Option<String>,
) -> Result<OrderDetails> {
    let rental_start_date = parse_date(start)?;
    let rental_end_date = parse_date(end)?;
    if rental_end_date < rental_start_date {
        return Err(RentalError::InvalidRentalPeriod {
            start: rental_start_date,
            end: rental_end_date,
        });
    }

    let order_date = match date {
        Some(date) => parse_date(&date)?,
        None => Local::now().date_naive(),
    };

    Ok(OrderDetails {
        customer_name: non_blank("customer name", name)?,
        customer_phone: non_blank("customer phone", phone)?,
        customer_address: address.filter(|a| !a.trim().is_empty()),
        order_date,
        rental_start_date,
        rental_end_date,
        notes: notes.filter(|n| !n.trim().is_empty()),
    })
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(RentalError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("output"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized rental config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your company details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Record an order:");
    println!("     rental new --name <customer> --phone <phone> --start <date> --end <date> --item <car>:<qty>:<rate>:<days>");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "CUSTOMER")]
    customer: String,
    #[tabled(rename = "ITEMS")]
    items: usize,
    #[tabled(rename = "TOTAL")]
    total: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "CAR TYPE")]
    car_type: String,
    #[tabled(rename = "QTY")]
    quantity: u32,
    #[tabled(rename = "DAYS")]
    days: u32,
    #[tabled(rename = "DAILY RATE")]
    daily_rate: String,
    #[tabled(rename = "SUBTOTAL")]
    subtotal: String,
}

#[derive(Tabled)]
struct MonthRow {
    #[tabled(rename = "MONTH")]
    month: String,
    #[tabled(rename = "ORDERS")]
    orders: usize,
    #[tabled(rename = "REVENUE")]
    revenue: String,
}

/// Record a new order
fn cmd_new(cfg_dir: &Path, details: OrderDetails, items_input: &[String]) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;

    let items = items_input
        .iter()
        .map(|input| parse_item_input(input))
        .collect::<Result<Vec<_>>>()?;
    let order = Order::new(details, items)?;
    let short_id = order.short_id();
    let summary = format!(
        "  Customer: {}\n  Items:    {}\n  Total:    {}",
        order.customer_name,
        order.items.len(),
        format_money(order.total_amount, &config.invoice.currency_symbol)
    );

    state.orders.push(order);
    save_state(cfg_dir, &state)?;

    println!("Created order {short_id}");
    println!("{summary}");
    Ok(())
}

/// List orders, newest first
fn cmd_list(cfg_dir: &Path, limit: Option<usize>) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;

    if state.orders.is_empty() {
        println!("No orders recorded yet.");
        return Ok(());
    }

    let shown = limit.unwrap_or(state.orders.len());
    let rows: Vec<OrderRow> = state
        .newest_first()
        .take(shown)
        .enumerate()
        .map(|(idx, order)| OrderRow {
            index: idx + 1,
            id: order.short_id(),
            date: order.order_date.to_string(),
            customer: order.customer_name.clone(),
            items: order.items.len(),
            total: format_money(order.total_amount, &config.invoice.currency_symbol),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Total: {} orders", state.orders.len());
    println!("Use index number or id with show/add-item/edit-item/export (e.g., 'rental show 1')");

    Ok(())
}

/// Show one order with its line items
fn cmd_show(cfg_dir: &Path, reference: &str) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let order = &state.orders[state.position(reference)?];
    let symbol = &config.invoice.currency_symbol;

    println!("Order {}  ({})", order.short_id(), order.id);
    println!("{}", "-".repeat(50));
    println!("Customer:    {}", order.customer_name);
    println!("Phone:       {}", order.customer_phone);
    if let Some(address) = &order.customer_address {
        println!("Address:     {address}");
    }
    println!("Order date:  {}", order.order_date);
    println!(
        "Rental:      {} to {}",
        order.rental_start_date, order.rental_end_date
    );
    if let Some(notes) = &order.notes {
        println!("Notes:       {notes}");
    }
    println!();

    if order.items.is_empty() {
        println!("No items on this order.");
    } else {
        let rows: Vec<ItemRow> = order
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| ItemRow {
                index: idx + 1,
                car_type: item.car_type.clone(),
                quantity: item.quantity,
                days: item.days,
                daily_rate: format_money(item.daily_rate, symbol),
                subtotal: format_money(item.subtotal, symbol),
            })
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    println!("Total:       {}", format_money(order.total_amount, symbol));

    if !order.has_consistent_total() {
        match total(&order.items) {
            Ok(computed) => warn!(
                order = %order.short_id(),
                stored = %order.total_amount,
                computed = %computed,
                "stored total does not match line items"
            ),
            Err(e) => warn!(order = %order.short_id(), error = %e, "line items are invalid"),
        }
    }

    Ok(())
}

/// Resolve a 1-based item number shown by 'show'
fn item_position(order: &Order, index: usize) -> Result<usize> {
    if index == 0 || index > order.items.len() {
        return Err(RentalError::ItemNotFound {
            order: order.short_id(),
            index,
            count: order.items.len(),
        });
    }
    Ok(index - 1)
}

fn print_updated(order: &Order, currency_symbol: &str) {
    println!(
        "  Total:  {}",
        format_money(order.total_amount, currency_symbol)
    );
}

/// Append a line item to an order
fn cmd_add_item(cfg_dir: &Path, reference: &str, input: &str) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let position = state.position(reference)?;
    let item = parse_item_input(input)?;

    let car_type = item.car_type.clone();
    state.orders[position].add_item(item)?;
    save_state(cfg_dir, &state)?;

    let order = &state.orders[position];
    println!("Added {} to order {}", car_type, order.short_id());
    print_updated(order, &config.invoice.currency_symbol);
    Ok(())
}

/// Replace a line item on an order
fn cmd_edit_item(cfg_dir: &Path, reference: &str, index: usize, input: &str) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let position = state.position(reference)?;
    let item = parse_item_input(input)?;

    let order = &mut state.orders[position];
    let item_idx = item_position(order, index)?;
    order.replace_item(item_idx, item)?;
    save_state(cfg_dir, &state)?;

    let order = &state.orders[position];
    println!("Updated item {} on order {}", index, order.short_id());
    print_updated(order, &config.invoice.currency_symbol);
    Ok(())
}

/// Remove a line item from an order
fn cmd_remove_item(cfg_dir: &Path, reference: &str, index: usize) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let position = state.position(reference)?;

    let order = &mut state.orders[position];
    let item_idx = item_position(order, index)?;
    let removed = order.remove_item(item_idx)?;
    save_state(cfg_dir, &state)?;

    let order = &state.orders[position];
    println!("Removed {} from order {}", removed.car_type, order.short_id());
    print_updated(order, &config.invoice.currency_symbol);
    Ok(())
}

/// Delete an order
fn cmd_delete(cfg_dir: &Path, reference: &str) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let mut state = load_state(cfg_dir)?;
    let position = state.position(reference)?;
    let removed = state.orders.remove(position);

    save_state(cfg_dir, &state)?;
    println!("Deleted order {} ({})", removed.short_id(), removed.customer_name);
    Ok(())
}

/// Export an order's invoice
fn cmd_export(cfg_dir: &Path, reference: &str, output: Option<PathBuf>, open: bool) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let order = &state.orders[state.position(reference)?];

    if order.items.is_empty() {
        return Err(RentalError::NoItems(order.short_id()));
    }

    let output_dir = match output {
        Some(dir) => dir,
        None => resolve_output_dir(&config.export.output_dir, cfg_dir),
    };
    std::fs::create_dir_all(&output_dir)?;

    let pipeline = InvoiceExportPipeline::new(
        TypstRenderer::new(config.export.page_width, config.export.unit),
        PdfWriter::new(format!("Invoice {}", order.short_id())),
    );
    let pdf_path = pipeline.export(order, &config, &output_dir)?;

    println!("Exported invoice for order {}", order.short_id());
    println!("  Customer: {}", order.customer_name);
    println!("  Saved:    {}", pdf_path.display());

    if open {
        open_path(&pdf_path)?;
    }
    Ok(())
}

fn open_path(pdf_path: &Path) -> Result<()> {
    // Open with system default viewer
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(pdf_path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(pdf_path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(pdf_path)
            .spawn()?;
    }
    Ok(())
}

/// Monthly revenue summary
fn cmd_report(
    cfg_dir: &Path,
    from: Option<String>,
    to: Option<String>,
    dense: bool,
) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let from = from.as_deref().map(parse_date).transpose()?;
    let to = to.as_deref().map(parse_date).transpose()?;
    let options = ReportOptions {
        range: ReportRange::new(from, to)?,
        dense,
    };

    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let rows = summarize(&state.orders, &options)?;

    if rows.is_empty() {
        println!("No orders in the selected period.");
        return Ok(());
    }

    let symbol = &config.invoice.currency_symbol;
    let (order_count, revenue) = grand_total(&rows)?;
    let table_rows: Vec<MonthRow> = rows
        .iter()
        .map(|row| MonthRow {
            month: format!("{}-{:02}", row.year, row.month),
            orders: row.order_count,
            revenue: format_money(row.total_revenue, symbol),
        })
        .collect();

    let table = Table::new(table_rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!(
        "Total: {} orders, {}",
        order_count,
        format_money(revenue, symbol)
    );

    Ok(())
}

/// Show config location and recent orders
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    ensure_initialized(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let symbol = &config.invoice.currency_symbol;

    println!("Rental Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Company:          {}", config.company.name);
    println!("Orders:           {}", state.orders.len());
    println!(
        "Output directory: {}",
        resolve_output_dir(&config.export.output_dir, cfg_dir).display()
    );

    if !state.orders.is_empty() {
        println!();
        println!("Recent orders:");
        for order in state.newest_first().take(5) {
            println!(
                "  {} - {} - {}",
                order.short_id(),
                order.customer_name,
                format_money(order.total_amount, symbol)
            );
        }
    }

    Ok(())
}
