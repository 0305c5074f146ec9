//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on a line's unit price, in rupees.
pub const MAX_PRICE: i64 = 100_000_000;
/// Upper bound on a line's quantity, merged or set.
pub const MAX_QUANTITY: u32 = 10_000;

/// One mutable cart per session; never deleted, only emptied.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    session_id: String,
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_ref: String,
    pub slug: String,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub quantity: u32,
}

impl CartItem {
    /// Builds a line from client-supplied fields, rejecting blanks.
    pub fn new(product_ref: &str, slug: &str, name: &str, price: Option<i64>, image: &str) -> Result<Self, CartError> {
        let required = [("productRef", product_ref), ("slug", slug), ("name", name), ("image", image)];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(CartError::MissingField(field));
        }
        let price = price.ok_or(CartError::MissingField("price"))?;
        if price < 0 { return Err(CartError::NegativePrice); }
        if price > MAX_PRICE { return Err(CartError::PriceTooLarge); }
        Ok(Self {
            product_ref: product_ref.trim().to_string(), slug: slug.trim().to_string(),
            name: name.trim().to_string(), price, image: image.trim().to_string(), quantity: 1,
        })
    }

    /// `None` only for lines that bypassed the price and quantity bounds.
    pub fn line_total(&self) -> Option<i64> { self.price.checked_mul(i64::from(self.quantity)) }
}

impl Cart {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { session_id: session_id.into(), items: vec![], created_at: now, updated_at: now }
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Sum of price x quantity. Derived on every read, never stored.
    pub fn total(&self) -> i64 {
        self.items.iter().fold(0i64, |sum, i| sum.saturating_add(i.line_total().unwrap_or(i64::MAX)))
    }

    pub fn add_item(&mut self, mut item: CartItem, quantity: u32) -> Result<(), CartError> {
        if quantity < 1 { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_ref == item.product_ref) {
            existing.quantity = existing.quantity.checked_add(quantity)
                .filter(|q| *q <= MAX_QUANTITY)
                .ok_or(CartError::QuantityTooLarge)?;
        } else {
            if quantity > MAX_QUANTITY { return Err(CartError::QuantityTooLarge); }
            item.quantity = quantity;
            self.items.push(item);
        }
        self.touch();
        Ok(())
    }

    pub fn update_quantity(&mut self, product_ref: &str, quantity: i64) -> Result<(), CartError> {
        if quantity < 1 { return Err(CartError::InvalidQuantity); }
        let quantity = u32::try_from(quantity).ok().filter(|q| *q <= MAX_QUANTITY).ok_or(CartError::QuantityTooLarge)?;
        let item = self.items.iter_mut().find(|i| i.product_ref == product_ref).ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        self.touch();
        Ok(())
    }

    /// Returns whether a line was removed; removing an absent line is not an error.
    pub fn remove_item(&mut self, product_ref: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_ref != product_ref);
        let removed = self.items.len() != before;
        if removed { self.touch(); }
        removed
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity, QuantityTooLarge, NegativePrice, PriceTooLarge, MissingField(&'static str) }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item not found in cart"),
            Self::InvalidQuantity => write!(f, "Quantity must be at least 1"),
            Self::QuantityTooLarge => write!(f, "Quantity must be at most {MAX_QUANTITY}"),
            Self::NegativePrice => write!(f, "Price must not be negative"),
            Self::PriceTooLarge => write!(f, "Price must be at most {MAX_PRICE}"),
            Self::MissingField(field) => write!(f, "Missing required field: {field}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch() -> CartItem { CartItem::new("p1", "steel-watch", "Steel Watch", Some(500), "/img/watch.jpg").unwrap() }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new("sess-1");
        cart.add_item(watch(), 2).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total(), 1000);
        cart.add_item(watch(), 3).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 5); // Merged
    }

    #[test]
    fn test_quantity_below_one_rejected() {
        let mut cart = Cart::new("sess-1");
        cart.add_item(watch(), 1).unwrap();
        assert_eq!(cart.update_quantity("p1", 0), Err(CartError::InvalidQuantity));
        assert_eq!(cart.update_quantity("p1", -3), Err(CartError::InvalidQuantity));
        assert_eq!(cart.update_quantity("missing", 2), Err(CartError::ItemNotFound));
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_remove_absent_item_is_noop() {
        let mut cart = Cart::new("sess-1");
        cart.add_item(watch(), 1).unwrap();
        assert!(!cart.remove_item("nope"));
        assert_eq!(cart.item_count(), 1);
        assert!(cart.remove_item("p1"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(CartItem::new("", "s", "n", Some(1), "i"), Err(CartError::MissingField("productRef")));
        assert_eq!(CartItem::new("p", "s", "n", None, "i"), Err(CartError::MissingField("price")));
        assert_eq!(CartItem::new("p", "s", "n", Some(1), " "), Err(CartError::MissingField("image")));
    }

    #[test]
    fn test_price_and_quantity_are_bounded() {
        assert_eq!(CartItem::new("p", "s", "n", Some(i64::MAX / 2 + 1), "i"), Err(CartError::PriceTooLarge));
        let mut cart = Cart::new("sess-1");
        assert_eq!(cart.add_item(watch(), MAX_QUANTITY + 1), Err(CartError::QuantityTooLarge));
        assert!(cart.is_empty());
        cart.add_item(watch(), MAX_QUANTITY - 1).unwrap();
        assert_eq!(cart.add_item(watch(), 2), Err(CartError::QuantityTooLarge));
        assert_eq!(cart.add_item(watch(), u32::MAX), Err(CartError::QuantityTooLarge));
        assert_eq!(cart.update_quantity("p1", i64::from(MAX_QUANTITY) + 1), Err(CartError::QuantityTooLarge));
        assert_eq!(cart.items()[0].quantity, MAX_QUANTITY - 1);
        assert_eq!(cart.total(), 500 * i64::from(MAX_QUANTITY - 1));
    }
}
