//! Document persistence for carts, orders, products and reviews.
//!
//! Every record is stored whole; the service layer owns all invariants and
//! serialises writers through [`crate::locks::KeyedLocks`]. The only
//! concurrency primitive asked of a backend is [`Store::next_order_number`],
//! which must hand out a distinct value on every call.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, PaymentStatus, Product, Review};
use crate::domain::value_objects::{OrderNumber, Slug};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("{0} not found")]
    Missing(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest { pub page: u32, pub per_page: u32 }

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self { page: page.unwrap_or(1).max(1), per_page: per_page.unwrap_or(20).clamp(1, 100) }
    }
    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.per_page) }
}

impl Default for PageRequest {
    fn default() -> Self { Self::new(None, None) }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> { pub data: Vec<T>, pub total: i64, pub page: u32, pub per_page: u32 }

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { data: self.data.into_iter().map(f).collect(), total: self.total, page: self.page, per_page: self.per_page }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProductFilter { pub category: Option<String>, pub visible_only: bool }

#[derive(Clone, Debug, Default)]
pub struct ReviewFilter { pub product_slug: Option<Slug>, pub approved: Option<bool> }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    pub by_payment_status: HashMap<PaymentStatus, i64>,
    /// Sum of `paid` order totals.
    pub revenue: i64,
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn load_cart(&self, session_id: &str) -> Result<Option<Cart>, StoreError>;
    async fn save_cart(&self, cart: &Cart) -> Result<(), StoreError>;

    /// Atomically reserves the next order number.
    async fn next_order_number(&self) -> Result<OrderNumber, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the number is taken.
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;
    async fn find_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError>;
    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;
    async fn delete_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError>;
    /// Newest first.
    async fn list_orders(&self, status: Option<PaymentStatus>, page: PageRequest) -> Result<Page<Order>, StoreError>;
    async fn order_stats(&self) -> Result<OrderStats, StoreError>;

    /// Fails with [`StoreError::Duplicate`] on a taken slug or product code.
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;
    async fn save_product(&self, product: &Product) -> Result<(), StoreError>;
    async fn find_product(&self, slug: &Slug) -> Result<Option<Product>, StoreError>;
    /// Newest first.
    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>, StoreError>;
    async fn count_active_products(&self) -> Result<i64, StoreError>;

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError>;
    async fn save_review(&self, review: &Review) -> Result<(), StoreError>;
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError>;
    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Newest first.
    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError>;
}
