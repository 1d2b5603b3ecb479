//! Product catalog and the production tracker.

use crate::error::{ShopError, ShopResult};
use crate::id::ProductId;
use crate::product::{
    NewProduct, Product, ProductPatch, ProductionRecord, ProductionStatus, ProductionView,
};
use crate::store::SharedStore;
use chrono::Utc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
}

impl CatalogService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> ShopResult<Vec<Product>> {
        self.store.list_products().await
    }

    pub async fn get(&self, id: ProductId) -> ShopResult<Product> {
        self.store
            .find_product(id)
            .await?
            .ok_or_else(|| ShopError::not_found("Product"))
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, new: NewProduct) -> ShopResult<Product> {
        new.validate()?;
        let product = self.store.create_product(new).await?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> ShopResult<Product> {
        patch.validate()?;
        self.store.update_product(id, &patch).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> ShopResult<()> {
        self.store.delete_product(id).await?;
        info!("product deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn start_production(&self, id: ProductId) -> ShopResult<ProductionRecord> {
        self.store.start_production(id, Utc::now()).await
    }

    /// `status` is the raw tracker status; anything outside
    /// `pending | in_progress | completed` is `InvalidStatus`
    #[instrument(skip(self))]
    pub async fn update_production_status(
        &self,
        id: ProductId,
        status: &str,
    ) -> ShopResult<ProductionRecord> {
        let status: ProductionStatus = status.parse()?;
        self.store
            .update_production_status(id, status, Utc::now())
            .await
    }

    pub async fn production(&self, id: ProductId) -> ShopResult<ProductionView> {
        self.store
            .find_production(id)
            .await?
            .ok_or_else(|| ShopError::not_found("Production record"))
    }

    pub async fn productions(&self) -> ShopResult<Vec<ProductionView>> {
        self.store.list_productions().await
    }
}
