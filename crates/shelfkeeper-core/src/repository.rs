//! Authenticated product CRUD.
//!
//! Every call reads the current session and fails with
//! `ApiError::Unauthenticated` before touching the network when there is
//! no valid token. Nothing is cached; callers re-fetch after mutating.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::api::{ApiError, ApiResult, CatalogApi};
use crate::auth::SessionStore;
use crate::models::{ProductDraft, ProductPage};

/// Cheap to clone; clones share the API client and session store.
#[derive(Clone)]
pub struct ProductRepository {
    api: Arc<dyn CatalogApi>,
    store: Arc<Mutex<SessionStore>>,
}

impl ProductRepository {
    pub fn new(api: Arc<dyn CatalogApi>, store: Arc<Mutex<SessionStore>>) -> Self {
        Self { api, store }
    }

    async fn token(&self) -> ApiResult<String> {
        self.store
            .lock()
            .await
            .token()
            .ok_or(ApiError::Unauthenticated)
    }

    /// Fetch one page of products. Pages start at 1.
    pub async fn list(&self, page: u32) -> ApiResult<ProductPage> {
        let token = self.token().await?;
        let page = page.max(1);
        let result = self.api.list_products(&token, page).await?;
        debug!(page, count = result.products.len(), "Product page loaded");
        Ok(result)
    }

    /// Create a new product from the draft. Any id on the draft is ignored.
    pub async fn create(&self, draft: &ProductDraft) -> ApiResult<()> {
        let token = self.token().await?;
        let product = draft.product().without_id();
        self.api.create_product(&token, &product).await?;
        info!(title = %product.title, "Product created");
        Ok(())
    }

    /// Replace the whole record at `id` with the draft.
    pub async fn update(&self, id: &str, draft: &ProductDraft) -> ApiResult<()> {
        let token = self.token().await?;
        self.api.update_product(&token, id, draft.product()).await?;
        info!(id, "Product updated");
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> ApiResult<()> {
        let token = self.token().await?;
        self.api.delete_product(&token, id).await?;
        info!(id, "Product deleted");
        Ok(())
    }
}
