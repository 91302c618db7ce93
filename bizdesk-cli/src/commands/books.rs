//! Books command handlers
//!
//! Accounting data lives on the API; these commands list and create records
//! there using the stored session.

use anyhow::Result;
use bizdesk_client::BooksClient;
use bizdesk_core::domain::books::{Bill, BillStatus, ItemDraft, NewAccount, TransactionKind};
use clap::Subcommand;
use colored::*;

use crate::api;
use crate::config::Config;

/// Books subcommands
#[derive(Subcommand)]
pub enum BooksCommands {
    /// List the chart of accounts
    Accounts,
    /// Create an account
    AddAccount {
        name: String,
        #[arg(long)]
        code: Option<String>,
        /// Account type (e.g., asset, liability, bank)
        #[arg(long = "type")]
        account_type: Option<String>,
    },
    /// List inventory items
    Items,
    /// Create an inventory item
    AddItem {
        name: String,
        #[arg(long)]
        sku: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        /// Price currency; USD items also need --sf-number and --weight
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        sf_number: Option<String>,
        #[arg(long)]
        weight: Option<f64>,
    },
    /// List vendors
    Vendors,
    /// List bills
    Bills,
    /// Show a single bill
    Bill { id: i64 },
    /// List bank transactions
    Transactions {
        /// Only transactions of this bank account
        #[arg(long)]
        account: Option<i64>,
    },
}

/// Handle books commands
///
/// The session is written back to the store afterwards, whether the command
/// succeeded or not, so refreshed or revoked tokens are not lost.
pub async fn handle_books_command(command: BooksCommands, config: &Config) -> Result<()> {
    let store = config.open_store()?;
    let client = api::connect_signed_in(config, &store)?;

    let result = run(command, &client).await;
    api::save_session(&client, &store).await?;
    result
}

async fn run(command: BooksCommands, client: &BooksClient) -> Result<()> {
    match command {
        BooksCommands::Accounts => {
            let accounts = client.list_accounts().await?;
            if accounts.is_empty() {
                println!("{}", "No accounts found.".yellow());
            }
            for account in accounts {
                println!(
                    "  {:>6}  {:<10} {:<32} {}",
                    account.id.to_string().dimmed(),
                    account.code.unwrap_or_default(),
                    account.name.bold(),
                    account
                        .balance
                        .map(|b| format!("{:.2}", b))
                        .unwrap_or_default()
                );
            }
        }
        BooksCommands::AddAccount {
            name,
            code,
            account_type,
        } => {
            let account = client
                .create_account(&NewAccount {
                    name,
                    code,
                    account_type,
                })
                .await?;
            println!("{}", "✓ Account created successfully!".green().bold());
            println!("  ID:   {}", account.id.to_string().cyan());
            println!("  Name: {}", account.name.bold());
        }
        BooksCommands::Items => {
            let items = client.list_items().await?;
            if items.is_empty() {
                println!("{}", "No items found.".yellow());
            }
            for item in items {
                let price = match (item.price, item.currency.as_deref()) {
                    (Some(p), Some(c)) => format!("{:.2} {}", p, c),
                    (Some(p), None) => format!("{:.2}", p),
                    _ => String::new(),
                };
                println!(
                    "  {:>6}  {:<32} {}",
                    item.id.to_string().dimmed(),
                    item.name.bold(),
                    price
                );
            }
        }
        BooksCommands::AddItem {
            name,
            sku,
            unit,
            price,
            currency,
            sf_number,
            weight,
        } => {
            let draft = ItemDraft {
                name,
                sku,
                unit,
                price,
                currency,
                sf_number,
                weight,
            };
            let item = client.create_item(&draft).await?;
            println!("{}", "✓ Item created successfully!".green().bold());
            println!("  ID:   {}", item.id.to_string().cyan());
            println!("  Name: {}", item.name.bold());
        }
        BooksCommands::Vendors => {
            let vendors = client.list_vendors().await?;
            if vendors.is_empty() {
                println!("{}", "No vendors found.".yellow());
            }
            for vendor in vendors {
                println!(
                    "  {:>6}  {:<32} {}",
                    vendor.id.to_string().dimmed(),
                    vendor.name.bold(),
                    vendor.email.unwrap_or_default().dimmed()
                );
            }
        }
        BooksCommands::Bills => {
            let bills = client.list_bills().await?;
            if bills.is_empty() {
                println!("{}", "No bills found.".yellow());
            }
            for bill in &bills {
                print_bill_row(bill);
            }
        }
        BooksCommands::Bill { id } => {
            let bill = client.get_bill(id).await?;
            print_bill_details(&bill);
        }
        BooksCommands::Transactions { account } => {
            let txns = client.list_transactions(account).await?;
            if txns.is_empty() {
                println!("{}", "No transactions found.".yellow());
            }
            for txn in txns {
                let amount = match txn.kind {
                    TransactionKind::Deposit => format!("+{:.2}", txn.amount).green(),
                    TransactionKind::Withdrawal => format!("-{:.2}", txn.amount).red(),
                };
                println!(
                    "  {}  {:>12}  {}",
                    txn.date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "----------".to_string())
                        .dimmed(),
                    amount,
                    txn.description
                );
            }
        }
    }

    Ok(())
}

fn bill_status(status: BillStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        BillStatus::Paid => label.green(),
        BillStatus::Overdue => label.red(),
        BillStatus::Open => label.yellow(),
        BillStatus::Draft | BillStatus::Void => label.dimmed(),
    }
}

fn print_bill_row(bill: &Bill) {
    println!(
        "  {:<12} {:<24} {:>12.2}  {}  {}",
        bill.bill_number.bold(),
        bill.vendor_name.as_deref().unwrap_or("-"),
        bill.total,
        bill.due_date
            .map(|d| format!("due {}", d))
            .unwrap_or_default()
            .dimmed(),
        bill_status(bill.status)
    );
}

fn print_bill_details(bill: &Bill) {
    println!("{}", "Bill Details:".bold());
    println!("  ID:       {}", bill.id.to_string().cyan());
    println!("  Number:   {}", bill.bill_number.bold());
    match (&bill.vendor_name, bill.vendor_id) {
        (Some(name), _) => println!("  Vendor:   {}", name),
        (None, Some(id)) => println!("  Vendor:   #{}", id),
        (None, None) => {}
    }
    if let Some(date) = bill.bill_date {
        println!("  Date:     {}", date);
    }
    if let Some(due) = bill.due_date {
        println!("  Due:      {}", due);
    }
    println!("  Total:    {:.2}", bill.total);
    println!("  Status:   {}", bill_status(bill.status));
}
