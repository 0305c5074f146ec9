//! In-process store for tests and `STORE=memory` runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OrderStats, Page, PageRequest, ProductFilter, ReviewFilter, Store, StoreError};
use crate::domain::aggregates::{Cart, Order, PaymentStatus, Product, Review};
use crate::domain::value_objects::{OrderNumber, Slug};

#[derive(Debug, Default)]
pub struct MemoryStore {
    order_seq: AtomicU64,
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    carts: HashMap<String, Cart>,
    // insertion order doubles as creation order
    orders: Vec<Order>,
    products: Vec<Product>,
    reviews: Vec<Review>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn paginate<T: Clone>(items: Vec<&T>, page: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let data = items.into_iter()
        .skip(page.offset() as usize)
        .take(page.per_page as usize)
        .cloned()
        .collect();
    Page { data, total, page: page.page, per_page: page.per_page }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_cart(&self, session_id: &str) -> Result<Option<Cart>, StoreError> {
        Ok(self.state.read().await.carts.get(session_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        self.state.write().await.carts.insert(cart.session_id().to_string(), cart.clone());
        Ok(())
    }

    async fn next_order_number(&self) -> Result<OrderNumber, StoreError> {
        Ok(OrderNumber::from_sequence(self.order_seq.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.orders.iter().any(|o| o.order_number() == order.order_number()) {
            return Err(StoreError::Duplicate("order number"));
        }
        state.orders.push(order.clone());
        Ok(())
    }

    async fn find_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        Ok(self.state.read().await.orders.iter().find(|o| o.order_number() == number).cloned())
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let slot = state.orders.iter_mut().find(|o| o.order_number() == order.order_number()).ok_or(StoreError::Missing("order"))?;
        *slot = order.clone();
        Ok(())
    }

    async fn delete_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let mut state = self.state.write().await;
        let pos = state.orders.iter().position(|o| o.order_number() == number);
        Ok(pos.map(|i| state.orders.remove(i)))
    }

    async fn list_orders(&self, status: Option<PaymentStatus>, page: PageRequest) -> Result<Page<Order>, StoreError> {
        let state = self.state.read().await;
        let matching = state.orders.iter().rev().filter(|o| status.map_or(true, |s| o.payment_status() == s)).collect();
        Ok(paginate(matching, page))
    }

    async fn order_stats(&self) -> Result<OrderStats, StoreError> {
        let state = self.state.read().await;
        let mut stats = OrderStats { total_orders: state.orders.len() as i64, ..OrderStats::default() };
        for order in &state.orders {
            *stats.by_payment_status.entry(order.payment_status()).or_default() += 1;
            if order.payment_status() == PaymentStatus::Paid { stats.revenue += order.total_amount(); }
        }
        Ok(stats)
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.products.iter().any(|p| p.slug() == product.slug()) { return Err(StoreError::Duplicate("slug")); }
        if state.products.iter().any(|p| p.code() == product.code()) { return Err(StoreError::Duplicate("product code")); }
        state.products.push(product.clone());
        Ok(())
    }

    async fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let slot = state.products.iter_mut().find(|p| p.id() == product.id()).ok_or(StoreError::Missing("product"))?;
        *slot = product.clone();
        Ok(())
    }

    async fn find_product(&self, slug: &Slug) -> Result<Option<Product>, StoreError> {
        Ok(self.state.read().await.products.iter().find(|p| p.slug() == slug).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>, StoreError> {
        let state = self.state.read().await;
        let matching = state.products.iter().rev()
            .filter(|p| !filter.visible_only || p.is_visible())
            .filter(|p| filter.category.as_deref().map_or(true, |c| p.category() == c))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn count_active_products(&self) -> Result<i64, StoreError> {
        Ok(self.state.read().await.products.iter().filter(|p| p.is_active()).count() as i64)
    }

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        self.state.write().await.reviews.push(review.clone());
        Ok(())
    }

    async fn save_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let slot = state.reviews.iter_mut().find(|r| r.id() == review.id()).ok_or(StoreError::Missing("review"))?;
        *slot = review.clone();
        Ok(())
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        Ok(self.state.read().await.reviews.iter().find(|r| r.id() == id).cloned())
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.reviews.len();
        state.reviews.retain(|r| r.id() != id);
        Ok(state.reviews.len() != before)
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError> {
        let state = self.state.read().await;
        Ok(state.reviews.iter().rev()
            .filter(|r| filter.product_slug.as_ref().map_or(true, |s| r.product_slug() == s))
            .filter(|r| filter.approved.map_or(true, |a| r.is_approved() == a))
            .cloned()
            .collect())
    }
}
