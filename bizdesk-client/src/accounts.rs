//! Chart of accounts endpoints

use bizdesk_core::domain::books::{Account, NewAccount};

use crate::BooksClient;
use crate::error::{ClientError, Result};

impl BooksClient {
    // =============================================================================
    // Accounts
    // =============================================================================

    /// List all accounts, across every page
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.fetch_all("/api/accounts/").await
    }

    /// Get an account by ID
    ///
    /// # Arguments
    /// * `id` - The account ID
    pub async fn get_account(&self, id: i64) -> Result<Account> {
        let url = self.url(&format!("/api/accounts/{}/", id));
        let response = self.send_authorized(|c| c.get(&url)).await?;

        self.handle_response(response)
            .await
            .map_err(|e| match e {
                ClientError::ApiError { status: 404, .. } => {
                    ClientError::NotFound(format!("account {}", id))
                }
                other => other,
            })
    }

    /// Create an account
    ///
    /// # Returns
    /// The created account as stored by the API
    pub async fn create_account(&self, req: &NewAccount) -> Result<Account> {
        if req.name.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "account name cannot be empty".to_string(),
            ));
        }

        let url = self.url("/api/accounts/");
        let response = self.send_authorized(|c| c.post(&url).json(req)).await?;

        let account: Account = self.handle_response(response).await?;
        tracing::info!("Account created: {} ({})", account.name, account.id);
        Ok(account)
    }
}
