//! Product catalog and customer reviews.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Product, ProductDetails, RatingSummary, Review};
use crate::domain::value_objects::{ProductCode, Slug};
use crate::store::{Page, PageRequest, ProductFilter, ReviewFilter, Store};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub slug: Option<String>,
    pub code: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Option<i64>,
    pub compare_at_price: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub in_stock: Option<bool>,
}

impl ProductInput {
    fn details(&self) -> Result<ProductDetails> {
        let price = self.price.ok_or_else(|| EcommerceError::validation("Missing required field: price"))?;
        Ok(ProductDetails {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            price,
            compare_at_price: self.compare_at_price,
            images: self.images.clone(),
            in_stock: self.in_stock.unwrap_or(true),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub name: String,
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub product: Product,
    pub rating: RatingSummary,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    /// Storefront listing: active, in-stock products, newest first.
    pub async fn list(&self, category: Option<String>, page: PageRequest) -> Result<Page<Product>> {
        let filter = ProductFilter { category: category.filter(|c| !c.is_empty()).map(|c| c.to_lowercase()), visible_only: true };
        Ok(self.store.list_products(&filter, page).await?)
    }

    pub async fn list_all(&self, page: PageRequest) -> Result<Page<Product>> {
        Ok(self.store.list_products(&ProductFilter::default(), page).await?)
    }

    async fn find(&self, slug: &str) -> Result<Product> {
        let slug = Slug::new(slug).map_err(|_| EcommerceError::not_found("Product"))?;
        self.store.find_product(&slug).await?.ok_or_else(|| EcommerceError::not_found("Product"))
    }

    async fn find_active(&self, slug: &str) -> Result<Product> {
        Some(self.find(slug).await?).filter(Product::is_active).ok_or_else(|| EcommerceError::not_found("Product"))
    }

    pub async fn get(&self, slug: &str) -> Result<ProductDetail> {
        let product = self.find_active(slug).await?;
        let filter = ReviewFilter { product_slug: Some(product.slug().clone()), approved: Some(true) };
        let rating = RatingSummary::of(&self.store.list_reviews(&filter).await?);
        Ok(ProductDetail { product, rating })
    }

    pub async fn create(&self, input: ProductInput) -> Result<Product> {
        let slug = Slug::new(input.slug.clone().unwrap_or_else(|| input.name.clone()))?;
        let code = ProductCode::new(input.code.clone().unwrap_or_default())?;
        let product = Product::create(slug, code, input.details()?)?;
        self.store.insert_product(&product).await?;
        info!(slug = %product.slug(), code = %product.code(), "Product created");
        Ok(product)
    }

    /// Slug and code are fixed at creation; only the details change.
    pub async fn update(&self, slug: &str, input: ProductInput) -> Result<Product> {
        let mut product = self.find(slug).await?;
        product.update(input.details()?)?;
        self.store.save_product(&product).await?;
        info!(slug = %product.slug(), "Product updated");
        Ok(product)
    }

    /// Deactivates rather than deletes; orders keep their snapshots either way.
    pub async fn deactivate(&self, slug: &str) -> Result<Product> {
        let mut product = self.find(slug).await?;
        if product.is_active() {
            product.deactivate();
            self.store.save_product(&product).await?;
            info!(slug = %product.slug(), "Product deactivated");
        }
        Ok(product)
    }

    pub async fn submit_review(&self, slug: &str, input: ReviewInput) -> Result<Review> {
        let product = self.find_active(slug).await?;
        let rating = input.rating.and_then(|r| u8::try_from(r).ok()).unwrap_or(0);
        let review = Review::submit(product.slug().clone(), &input.name, rating, &input.comment)?;
        self.store.insert_review(&review).await?;
        info!(slug = %product.slug(), review_id = %review.id(), "Review submitted for moderation");
        Ok(review)
    }

    pub async fn approved_reviews(&self, slug: &str) -> Result<Vec<Review>> {
        let product = self.find_active(slug).await?;
        let filter = ReviewFilter { product_slug: Some(product.slug().clone()), approved: Some(true) };
        Ok(self.store.list_reviews(&filter).await?)
    }

    pub async fn reviews(&self, approved: Option<bool>) -> Result<Vec<Review>> {
        Ok(self.store.list_reviews(&ReviewFilter { product_slug: None, approved }).await?)
    }

    pub async fn approve_review(&self, id: Uuid) -> Result<Review> {
        let mut review = self.store.find_review(id).await?.ok_or_else(|| EcommerceError::not_found("Review"))?;
        if !review.is_approved() {
            review.approve();
            self.store.save_review(&review).await?;
            info!(review_id = %id, "Review approved");
        }
        Ok(review)
    }

    pub async fn delete_review(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_review(id).await? { return Err(EcommerceError::not_found("Review")); }
        info!(review_id = %id, "Review deleted");
        Ok(())
    }
}
