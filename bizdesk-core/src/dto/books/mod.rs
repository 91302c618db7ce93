//! Books API payload adapters
//!
//! The books API is not consistent about field names: the same bill may
//! arrive with `due_date` or `dueDate`, a vendor as an id or an embedded
//! object, and amounts as numbers or decimal strings. The raw types here
//! accept every known variant and the `normalize_*` functions collapse them
//! into the canonical domain types. The first non-null variant wins.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::domain::books::{BankTransaction, Bill, BillStatus, TransactionKind};

/// Errors produced while normalizing an API payload
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("{entity} {id} is missing required field '{field}'")]
    MissingField {
        entity: &'static str,
        id: i64,
        field: &'static str,
    },

    #[error("{entity} {id} has invalid '{field}': {value}")]
    InvalidField {
        entity: &'static str,
        id: i64,
        field: &'static str,
        value: String,
    },
}

/// Bill as returned by the API, with every observed field spelling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBill {
    pub id: i64,
    #[serde(default)]
    pub bill_number: Option<String>,
    #[serde(default, rename = "billNumber")]
    pub bill_number_camel: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub vendor: Option<JsonValue>,
    #[serde(default)]
    pub vendor_id: Option<i64>,
    #[serde(default, rename = "vendorId")]
    pub vendor_id_camel: Option<i64>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default, rename = "vendorName")]
    pub vendor_name_camel: Option<String>,
    #[serde(default)]
    pub bill_date: Option<String>,
    #[serde(default, rename = "billDate")]
    pub bill_date_camel: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default, rename = "dueDate")]
    pub due_date_camel: Option<String>,
    #[serde(default)]
    pub total: Option<JsonValue>,
    #[serde(default)]
    pub amount: Option<JsonValue>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Bank transaction as returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBankTransaction {
    pub id: i64,
    #[serde(default)]
    pub account: Option<JsonValue>,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default, rename = "accountId")]
    pub account_id_camel: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default, rename = "transactionDate")]
    pub transaction_date_camel: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub amount: Option<JsonValue>,
    #[serde(default)]
    pub deposit: Option<JsonValue>,
    #[serde(default)]
    pub withdrawal: Option<JsonValue>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<String>,
}

const BILL: &str = "bill";
const TRANSACTION: &str = "transaction";

/// Collapses a raw bill into the canonical [`Bill`]
pub fn normalize_bill(raw: RawBill) -> Result<Bill, NormalizeError> {
    let id = raw.id;

    let bill_number = raw
        .bill_number
        .or(raw.bill_number_camel)
        .or(raw.number)
        .filter(|n| !n.trim().is_empty())
        .ok_or(NormalizeError::MissingField {
            entity: BILL,
            id,
            field: "bill_number",
        })?;

    let (embedded_vendor_id, embedded_vendor_name) = split_reference(raw.vendor.as_ref());
    let vendor_id = raw.vendor_id.or(raw.vendor_id_camel).or(embedded_vendor_id);
    let vendor_name = raw
        .vendor_name
        .or(raw.vendor_name_camel)
        .or(embedded_vendor_name);

    let bill_date = raw.bill_date.or(raw.bill_date_camel).or(raw.date);
    let bill_date = parse_optional_date(BILL, id, "bill_date", bill_date)?;
    let due_date = raw.due_date.or(raw.due_date_camel);
    let due_date = parse_optional_date(BILL, id, "due_date", due_date)?;

    let total = match raw.total.or(raw.amount) {
        Some(value) => parse_amount(BILL, id, "total", &value)?,
        None => {
            return Err(NormalizeError::MissingField {
                entity: BILL,
                id,
                field: "total",
            });
        }
    };

    let status = match raw.status.as_deref() {
        None => BillStatus::Open,
        Some(s) => BillStatus::parse(s).unwrap_or_else(|| {
            tracing::warn!("Bill {} has unknown status '{}', treating as open", id, s);
            BillStatus::Open
        }),
    };

    Ok(Bill {
        id,
        bill_number,
        vendor_id,
        vendor_name,
        bill_date,
        due_date,
        total,
        status,
    })
}

/// Collapses a raw bank transaction into the canonical [`BankTransaction`]
///
/// The direction comes from an explicit type field when present, then from
/// separate deposit/withdrawal columns, then from the sign of `amount`.
pub fn normalize_transaction(raw: RawBankTransaction) -> Result<BankTransaction, NormalizeError> {
    let id = raw.id;

    let (embedded_account_id, _) = split_reference(raw.account.as_ref());
    let account_id = raw
        .account_id
        .or(raw.account_id_camel)
        .or(embedded_account_id);

    let date = raw
        .date
        .or(raw.transaction_date)
        .or(raw.transaction_date_camel);
    let date = parse_optional_date(TRANSACTION, id, "date", date)?;

    let description = raw.description.or(raw.memo).unwrap_or_default();

    let explicit_kind = match raw.kind.or(raw.transaction_type) {
        Some(kind) => Some(parse_kind(id, &kind)?),
        None => None,
    };

    let deposit = optional_amount(TRANSACTION, id, "deposit", raw.deposit.as_ref())?;
    let withdrawal = optional_amount(TRANSACTION, id, "withdrawal", raw.withdrawal.as_ref())?;
    let signed = optional_amount(TRANSACTION, id, "amount", raw.amount.as_ref())?;

    let (amount, kind) = match (signed, deposit, withdrawal) {
        (Some(amount), _, _) => {
            let kind = explicit_kind.unwrap_or(if amount < 0.0 {
                TransactionKind::Withdrawal
            } else {
                TransactionKind::Deposit
            });
            (amount.abs(), kind)
        }
        (None, Some(d), _) if d != 0.0 => (d.abs(), TransactionKind::Deposit),
        (None, _, Some(w)) if w != 0.0 => (w.abs(), TransactionKind::Withdrawal),
        (None, Some(_), _) | (None, _, Some(_)) => {
            (0.0, explicit_kind.unwrap_or(TransactionKind::Deposit))
        }
        (None, None, None) => {
            return Err(NormalizeError::MissingField {
                entity: TRANSACTION,
                id,
                field: "amount",
            });
        }
    };

    Ok(BankTransaction {
        id,
        account_id,
        date,
        description,
        amount,
        kind,
    })
}

/// Splits a reference that may be a bare id or an embedded `{id, name}` object
fn split_reference(value: Option<&JsonValue>) -> (Option<i64>, Option<String>) {
    match value {
        Some(JsonValue::Number(n)) => (n.as_i64(), None),
        Some(JsonValue::String(s)) => (s.parse().ok(), None),
        Some(JsonValue::Object(obj)) => (
            obj.get("id").and_then(JsonValue::as_i64),
            obj.get("name").and_then(JsonValue::as_str).map(str::to_string),
        ),
        _ => (None, None),
    }
}

fn parse_kind(id: i64, input: &str) -> Result<TransactionKind, NormalizeError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "deposit" | "credit" | "in" => Ok(TransactionKind::Deposit),
        "withdrawal" | "debit" | "out" => Ok(TransactionKind::Withdrawal),
        _ => Err(NormalizeError::InvalidField {
            entity: TRANSACTION,
            id,
            field: "type",
            value: input.to_string(),
        }),
    }
}

fn optional_amount(
    entity: &'static str,
    id: i64,
    field: &'static str,
    value: Option<&JsonValue>,
) -> Result<Option<f64>, NormalizeError> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => parse_amount(entity, id, field, v).map(Some),
    }
}

/// Reads an amount given either as a JSON number or a decimal string
fn parse_amount(
    entity: &'static str,
    id: i64,
    field: &'static str,
    value: &JsonValue,
) -> Result<f64, NormalizeError> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| NormalizeError::InvalidField {
        entity,
        id,
        field,
        value: value.to_string(),
    })
}

fn parse_optional_date(
    entity: &'static str,
    id: i64,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, NormalizeError> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    parse_date(&value)
        .map(Some)
        .ok_or(NormalizeError::InvalidField {
            entity,
            id,
            field,
            value,
        })
}

/// Accepts plain `YYYY-MM-DD` dates and full RFC 3339 timestamps
fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.date_naive()))
}
