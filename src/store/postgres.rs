//! PostgreSQL store: JSONB documents plus the columns needed for lookups.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::warn;
use uuid::Uuid;

use super::{OrderStats, Page, PageRequest, ProductFilter, ReviewFilter, Store, StoreError};
use crate::domain::aggregates::{Cart, Order, PaymentStatus, Product, Review};
use crate::domain::value_objects::{OrderNumber, Slug};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) { self.pool.close().await; }
}

fn unique_violation(e: sqlx::Error, what: impl FnOnce(Option<&str>) -> &'static str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Duplicate(what(db.constraint()));
        }
    }
    StoreError::Database(e)
}

fn limits(page: PageRequest) -> (i64, i64) {
    (i64::from(page.per_page), page.offset() as i64)
}

#[async_trait]
impl Store for PgStore {
    async fn load_cart(&self, session_id: &str) -> Result<Option<Cart>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Cart>>("SELECT document FROM carts WHERE session_id = $1")
            .bind(session_id).fetch_optional(&self.pool).await?;
        Ok(doc.map(|d| d.0))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO carts (session_id, document, updated_at) VALUES ($1, $2, $3) ON CONFLICT (session_id) DO UPDATE SET document = EXCLUDED.document, updated_at = EXCLUDED.updated_at")
            .bind(cart.session_id()).bind(Json(cart)).bind(cart.updated_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn next_order_number(&self) -> Result<OrderNumber, StoreError> {
        let seq: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')").fetch_one(&self.pool).await?;
        Ok(OrderNumber::from_sequence(seq.unsigned_abs()))
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO orders (order_number, payment_status, total_amount, document, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(order.order_number().as_str()).bind(order.payment_status().as_str()).bind(order.total_amount())
            .bind(Json(order)).bind(order.created_at()).bind(order.updated_at())
            .execute(&self.pool).await
            .map_err(|e| unique_violation(e, |_| "order number"))?;
        Ok(())
    }

    async fn find_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Order>>("SELECT document FROM orders WHERE order_number = $1")
            .bind(number.as_str()).fetch_optional(&self.pool).await?;
        Ok(doc.map(|d| d.0))
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE orders SET payment_status = $2, document = $3, updated_at = $4 WHERE order_number = $1")
            .bind(order.order_number().as_str()).bind(order.payment_status().as_str())
            .bind(Json(order)).bind(order.updated_at())
            .execute(&self.pool).await?;
        if res.rows_affected() == 0 { return Err(StoreError::Missing("order")); }
        Ok(())
    }

    async fn delete_order(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Order>>("DELETE FROM orders WHERE order_number = $1 RETURNING document")
            .bind(number.as_str()).fetch_optional(&self.pool).await?;
        Ok(doc.map(|d| d.0))
    }

    async fn list_orders(&self, status: Option<PaymentStatus>, page: PageRequest) -> Result<Page<Order>, StoreError> {
        let status = status.map(|s| s.as_str());
        let (limit, offset) = limits(page);
        let docs = sqlx::query_scalar::<_, Json<Order>>("SELECT document FROM orders WHERE ($1::text IS NULL OR payment_status = $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3")
            .bind(status).bind(limit).bind(offset).fetch_all(&self.pool).await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR payment_status = $1)")
            .bind(status).fetch_one(&self.pool).await?;
        Ok(Page { data: docs.into_iter().map(|d| d.0).collect(), total, page: page.page, per_page: page.per_page })
    }

    async fn order_stats(&self) -> Result<OrderStats, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64, i64)>("SELECT payment_status, COUNT(*), COALESCE(SUM(total_amount), 0)::BIGINT FROM orders GROUP BY payment_status")
            .fetch_all(&self.pool).await?;
        let mut stats = OrderStats::default();
        for (status, count, sum) in rows {
            stats.total_orders += count;
            match status.parse::<PaymentStatus>() {
                Ok(s) => {
                    if s == PaymentStatus::Paid { stats.revenue = sum; }
                    stats.by_payment_status.insert(s, count);
                }
                Err(e) => warn!("Skipping orders with {e} payment status"),
            }
        }
        Ok(stats)
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO products (id, slug, code, category, is_active, is_visible, document, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(product.id()).bind(product.slug().as_str()).bind(product.code().as_str()).bind(product.category())
            .bind(product.is_active()).bind(product.is_visible()).bind(Json(product)).bind(product.created_at())
            .execute(&self.pool).await
            .map_err(|e| unique_violation(e, |c| if c == Some("products_code_key") { "product code" } else { "slug" }))?;
        Ok(())
    }

    async fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE products SET category = $2, is_active = $3, is_visible = $4, document = $5 WHERE id = $1")
            .bind(product.id()).bind(product.category()).bind(product.is_active()).bind(product.is_visible()).bind(Json(product))
            .execute(&self.pool).await?;
        if res.rows_affected() == 0 { return Err(StoreError::Missing("product")); }
        Ok(())
    }

    async fn find_product(&self, slug: &Slug) -> Result<Option<Product>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Product>>("SELECT document FROM products WHERE slug = $1")
            .bind(slug.as_str()).fetch_optional(&self.pool).await?;
        Ok(doc.map(|d| d.0))
    }

    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>, StoreError> {
        let (limit, offset) = limits(page);
        let category = filter.category.as_deref();
        let docs = sqlx::query_scalar::<_, Json<Product>>("SELECT document FROM products WHERE (NOT $1 OR is_visible) AND ($2::text IS NULL OR category = $2) ORDER BY created_at DESC LIMIT $3 OFFSET $4")
            .bind(filter.visible_only).bind(category).bind(limit).bind(offset).fetch_all(&self.pool).await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE (NOT $1 OR is_visible) AND ($2::text IS NULL OR category = $2)")
            .bind(filter.visible_only).bind(category).fetch_one(&self.pool).await?;
        Ok(Page { data: docs.into_iter().map(|d| d.0).collect(), total, page: page.page, per_page: page.per_page })
    }

    async fn count_active_products(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active").fetch_one(&self.pool).await?)
    }

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO reviews (id, product_slug, approved, document, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(review.id()).bind(review.product_slug().as_str()).bind(review.is_approved()).bind(Json(review)).bind(review.created_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn save_review(&self, review: &Review) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE reviews SET approved = $2, document = $3 WHERE id = $1")
            .bind(review.id()).bind(review.is_approved()).bind(Json(review))
            .execute(&self.pool).await?;
        if res.rows_affected() == 0 { return Err(StoreError::Missing("review")); }
        Ok(())
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Review>>("SELECT document FROM reviews WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(doc.map(|d| d.0))
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError> {
        let docs = sqlx::query_scalar::<_, Json<Review>>("SELECT document FROM reviews WHERE ($1::text IS NULL OR product_slug = $1) AND ($2::bool IS NULL OR approved = $2) ORDER BY created_at DESC")
            .bind(filter.product_slug.as_ref().map(|s| s.as_str())).bind(filter.approved)
            .fetch_all(&self.pool).await?;
        Ok(docs.into_iter().map(|d| d.0).collect())
    }
}
