//! Bill endpoints
//!
//! Bills come back in several historical shapes. They are read as
//! [`RawBill`] and normalized before leaving this module.

use bizdesk_core::domain::books::Bill;
use bizdesk_core::dto::books::{RawBill, normalize_bill};

use crate::BooksClient;
use crate::error::{ClientError, Result};

impl BooksClient {
    // =============================================================================
    // Bills
    // =============================================================================

    /// List all bills, across every page
    ///
    /// A single malformed record fails the whole call with
    /// [`ClientError::Normalize`].
    pub async fn list_bills(&self) -> Result<Vec<Bill>> {
        let raw: Vec<RawBill> = self.fetch_all("/api/bills/").await?;
        raw.into_iter()
            .map(|r| normalize_bill(r).map_err(ClientError::from))
            .collect()
    }

    /// Get a bill by ID
    pub async fn get_bill(&self, id: i64) -> Result<Bill> {
        let url = self.url(&format!("/api/bills/{}/", id));
        let response = self.send_authorized(|c| c.get(&url)).await?;

        let raw: RawBill = self.handle_response(response).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::NotFound(format!("bill {}", id))
            } else {
                e
            }
        })?;
        Ok(normalize_bill(raw)?)
    }
}
