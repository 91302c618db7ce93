//! Books domain types
//!
//! Canonical shapes for the accounting entities served by the books API.
//! Wire variants with inconsistent field names are converted into these by
//! the adapters in [`crate::dto::books`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ledger account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
}

/// Request body for creating an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub code: Option<String>,
    pub account_type: Option<String>,
}

/// A sellable or purchasable item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub sf_number: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Form data for a new item, checked by
/// [`validate_item_draft`](crate::validation::validate_item_draft) before it
/// is sent anywhere
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub sf_number: Option<String>,
    pub weight: Option<f64>,
}

/// A supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Payment state of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Draft,
    Open,
    Paid,
    Overdue,
    Void,
}

impl BillStatus {
    /// Lenient parse used by the wire adapters; unknown values yield `None`
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(BillStatus::Draft),
            "open" | "unpaid" => Some(BillStatus::Open),
            "paid" => Some(BillStatus::Paid),
            "overdue" => Some(BillStatus::Overdue),
            "void" | "cancelled" => Some(BillStatus::Void),
            _ => None,
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillStatus::Draft => write!(f, "Draft"),
            BillStatus::Open => write!(f, "Open"),
            BillStatus::Paid => write!(f, "Paid"),
            BillStatus::Overdue => write!(f, "Overdue"),
            BillStatus::Void => write!(f, "Void"),
        }
    }
}

/// A vendor bill in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub bill_number: String,
    pub vendor_id: Option<i64>,
    pub vendor_name: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub total: f64,
    pub status: BillStatus,
}

/// Direction of a bank transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

/// A banking transaction in canonical form
///
/// `amount` is always non-negative; the sign lives in `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: i64,
    pub account_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
}
