//! Wishlist.

use crate::cart::{WishlistItem, WishlistLine};
use crate::error::ShopResult;
use crate::id::{ProductId, UserId};
use crate::store::SharedStore;
use tracing::instrument;

#[derive(Clone)]
pub struct WishlistService {
    store: SharedStore,
}

impl WishlistService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> ShopResult<WishlistItem> {
        self.store.add_to_wishlist(user_id, product_id).await
    }

    pub async fn list(&self, user_id: UserId) -> ShopResult<Vec<WishlistLine>> {
        self.store.list_wishlist(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> ShopResult<()> {
        self.store.remove_from_wishlist(user_id, product_id).await
    }
}
