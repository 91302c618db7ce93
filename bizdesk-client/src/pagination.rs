//! Paginated list endpoints

use bizdesk_core::dto::page::Page;
use serde::de::DeserializeOwned;
use std::collections::HashSet;

use crate::BooksClient;
use crate::error::Result;

impl BooksClient {
    // =============================================================================
    // Pagination
    // =============================================================================

    /// Fetch a single page
    ///
    /// # Arguments
    /// * `url` - Absolute URL of the page, as found in `next`/`previous`
    pub async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        let response = self.send_authorized(|c| c.get(url)).await?;
        self.handle_response(response).await
    }

    /// Fetch every page of a list endpoint and concatenate the results
    ///
    /// # Arguments
    /// * `path` - Endpoint path, optionally with a query string
    pub async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(self.url(path));

        while let Some(url) = next.take() {
            if !seen.insert(url.clone()) {
                tracing::warn!("Pagination loop detected at {}, stopping", url);
                break;
            }

            let page: Page<T> = self.get_page(&url).await?;
            tracing::debug!("Fetched {} record(s) from {}", page.results.len(), url);
            results.extend(page.results);
            next = page.next;
        }

        Ok(results)
    }
}
