//! Bank transaction endpoints

use bizdesk_core::domain::books::BankTransaction;
use bizdesk_core::dto::books::{RawBankTransaction, normalize_transaction};

use crate::BooksClient;
use crate::error::{ClientError, Result};

impl BooksClient {
    /// List bank transactions, optionally for one account only
    ///
    /// # Arguments
    /// * `account_id` - Restrict to this bank account
    pub async fn list_transactions(&self, account_id: Option<i64>) -> Result<Vec<BankTransaction>> {
        let path = match account_id {
            Some(id) => format!("/api/bank-transactions/?account={}", id),
            None => "/api/bank-transactions/".to_string(),
        };

        let raw: Vec<RawBankTransaction> = self.fetch_all(&path).await?;
        raw.into_iter()
            .map(|r| normalize_transaction(r).map_err(ClientError::from))
            .collect()
    }
}
