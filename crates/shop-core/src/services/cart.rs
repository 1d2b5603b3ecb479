//! Shopping cart.

use crate::cart::{validate_quantity, CartItem, CartView};
use crate::error::ShopResult;
use crate::id::{CartItemId, ProductId, UserId};
use crate::store::SharedStore;
use tracing::instrument;

#[derive(Clone)]
pub struct CartService {
    store: SharedStore,
}

impl CartService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Add `quantity` of a product, merging into an existing line
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> ShopResult<CartItem> {
        validate_quantity(quantity)?;
        self.store.add_to_cart(user_id, product_id, quantity).await
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> ShopResult<CartItem> {
        validate_quantity(quantity)?;
        self.store.update_cart_item(user_id, item_id, quantity).await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> ShopResult<()> {
        self.store.remove_cart_item(user_id, item_id).await
    }

    pub async fn view(&self, user_id: UserId) -> ShopResult<CartView> {
        CartView::new(self.store.list_cart(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShopError;
    use crate::memory::MemoryStore;
    use crate::money::Money;
    use crate::product::NewProduct;
    use crate::store::CatalogStore;
    use std::sync::Arc;

    async fn setup(stock: i32) -> (CartService, Arc<MemoryStore>, ProductId) {
        let store = Arc::new(MemoryStore::new());
        let product = store
            .create_product(NewProduct {
                name: "Notebook".into(),
                description: String::new(),
                price: Money::from_minor(15000),
                stock_quantity: stock,
                category: "stationery".into(),
                image_url: String::new(),
            })
            .await
            .unwrap();
        (CartService::new(store.clone()), store, product.id)
    }

    #[tokio::test]
    async fn test_duplicate_add_merges() {
        let (cart, _, product) = setup(10).await;
        let user = UserId::new(1);

        let first = cart.add(user, product, 2).await.unwrap();
        let second = cart.add(user, product, 3).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 5);
        let view = cart.view(user).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total, Money::from_minor(75000));
        assert_eq!(view.items[0].product.name, "Notebook");
    }

    #[tokio::test]
    async fn test_merge_beyond_stock_rejected() {
        let (cart, _, product) = setup(4).await;
        let user = UserId::new(1);

        cart.add(user, product, 3).await.unwrap();
        let err = cart.add(user, product, 2).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { .. }));
        assert_eq!(cart.view(user).await.unwrap().items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let (cart, _, _) = setup(4).await;
        assert!(matches!(
            cart.add(UserId::new(1), ProductId::new(404), 1).await,
            Err(ShopError::NotFound(_))
        ));
        assert!(matches!(
            cart.add(UserId::new(1), ProductId::new(404), 0).await,
            Err(ShopError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ownership_enforced() {
        let (cart, _, product) = setup(10).await;
        let owner = UserId::new(1);
        let other = UserId::new(2);
        let line = cart.add(owner, product, 1).await.unwrap();

        assert!(matches!(
            cart.update(other, line.id, 2).await,
            Err(ShopError::Forbidden(_))
        ));
        assert!(matches!(
            cart.remove(other, line.id).await,
            Err(ShopError::Forbidden(_))
        ));

        assert_eq!(cart.update(owner, line.id, 4).await.unwrap().quantity, 4);
        assert!(matches!(
            cart.update(owner, line.id, 11).await,
            Err(ShopError::InsufficientStock { .. })
        ));
        cart.remove(owner, line.id).await.unwrap();
        assert!(matches!(
            cart.remove(owner, line.id).await,
            Err(ShopError::NotFound(_))
        ));
    }
}
