//! Vendor endpoints

use bizdesk_core::domain::books::Vendor;

use crate::BooksClient;
use crate::error::{ClientError, Result};

impl BooksClient {
    /// List all vendors, across every page
    pub async fn list_vendors(&self) -> Result<Vec<Vendor>> {
        self.fetch_all("/api/vendors/").await
    }

    /// Get a vendor by ID
    pub async fn get_vendor(&self, id: i64) -> Result<Vendor> {
        let url = self.url(&format!("/api/vendors/{}/", id));
        let response = self.send_authorized(|c| c.get(&url)).await?;

        self.handle_response(response).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::NotFound(format!("vendor {}", id))
            } else {
                e
            }
        })
    }
}
