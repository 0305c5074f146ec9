//! Session cart operations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::domain::aggregates::{Cart, CartItem};
use crate::locks::KeyedLocks;
use crate::store::Store;
use crate::{EcommerceError, Result};

/// Client payload for adding a line.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    #[serde(default)]
    pub product_ref: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    pub price: Option<i64>,
    #[serde(default)]
    pub image: String,
    pub quantity: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total: i64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self { Self { items: cart.items().to_vec(), total: cart.total() } }
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
    locks: Arc<KeyedLocks>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>, locks: Arc<KeyedLocks>) -> Self { Self { store, locks } }

    /// Serialises every read-modify-write on one session's cart.
    pub(crate) async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> { self.locks.lock(session_id).await }

    pub(crate) async fn load_or_create(&self, session_id: &str) -> Result<Cart> {
        if let Some(cart) = self.store.load_cart(session_id).await? { return Ok(cart); }
        let cart = Cart::new(session_id);
        self.store.save_cart(&cart).await?;
        debug!(session_id, "Created cart");
        Ok(cart)
    }

    pub(crate) async fn save(&self, cart: &Cart) -> Result<()> { Ok(self.store.save_cart(cart).await?) }

    pub async fn get_or_create(&self, session_id: &str) -> Result<Cart> {
        let _guard = self.lock(session_id).await;
        self.load_or_create(session_id).await
    }

    pub async fn add_item(&self, session_id: &str, input: AddItem) -> Result<Cart> {
        let item = CartItem::new(&input.product_ref, &input.slug, &input.name, input.price, &input.image)?;
        let quantity = match input.quantity {
            None => 1,
            Some(q) if q >= 1 => u32::try_from(q).map_err(|_| EcommerceError::validation("Quantity is too large"))?,
            Some(_) => return Err(EcommerceError::validation("Quantity must be at least 1")),
        };
        let _guard = self.lock(session_id).await;
        let mut cart = self.load_or_create(session_id).await?;
        cart.add_item(item, quantity)?;
        self.save(&cart).await?;
        Ok(cart)
    }

    pub async fn set_quantity(&self, session_id: &str, product_ref: &str, quantity: i64) -> Result<Cart> {
        if quantity < 1 { return Err(EcommerceError::validation("Quantity must be at least 1")); }
        let _guard = self.lock(session_id).await;
        let mut cart = self.store.load_cart(session_id).await?.ok_or_else(|| EcommerceError::not_found("Cart"))?;
        cart.update_quantity(product_ref, quantity)?;
        self.save(&cart).await?;
        Ok(cart)
    }

    /// Idempotent: an absent line leaves the cart unchanged.
    pub async fn remove_item(&self, session_id: &str, product_ref: &str) -> Result<Cart> {
        let _guard = self.lock(session_id).await;
        let mut cart = self.load_or_create(session_id).await?;
        if cart.remove_item(product_ref) { self.save(&cart).await?; }
        Ok(cart)
    }

    pub async fn clear(&self, session_id: &str) -> Result<Cart> {
        let _guard = self.lock(session_id).await;
        let mut cart = self.load_or_create(session_id).await?;
        if !cart.is_empty() {
            cart.clear();
            self.save(&cart).await?;
        }
        Ok(cart)
    }
}
