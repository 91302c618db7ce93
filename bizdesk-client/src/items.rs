//! Inventory item endpoints

use bizdesk_core::domain::books::{Item, ItemDraft};
use bizdesk_core::validation::validate_item_draft;

use crate::BooksClient;
use crate::error::Result;

impl BooksClient {
    // =============================================================================
    // Items
    // =============================================================================

    /// List all items, across every page
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        self.fetch_all("/api/items/").await
    }

    /// Create an item
    ///
    /// The draft is validated first; an invalid draft is never sent.
    ///
    /// # Returns
    /// The created item
    pub async fn create_item(&self, draft: &ItemDraft) -> Result<Item> {
        validate_item_draft(draft)?;

        let url = self.url("/api/items/");
        let response = self.send_authorized(|c| c.post(&url).json(draft)).await?;

        let item: Item = self.handle_response(response).await?;
        tracing::info!("Item created: {} ({})", item.name, item.id);
        Ok(item)
    }
}
