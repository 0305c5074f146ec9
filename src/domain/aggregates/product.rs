//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{ProductCode, Slug};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: Uuid,
    slug: Slug,
    code: ProductCode,
    name: String,
    description: String,
    category: String,
    price: i64,
    compare_at_price: Option<i64>,
    images: Vec<String>,
    in_stock: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Editable product fields, as submitted by an admin.
#[derive(Clone, Debug)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub images: Vec<String>,
    pub in_stock: bool,
}

impl ProductDetails {
    fn check(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if self.category.trim().is_empty() { return Err(ProductError::MissingCategory); }
        if self.price <= 0 { return Err(ProductError::InvalidPrice); }
        if self.compare_at_price.is_some_and(|p| p < self.price) { return Err(ProductError::InvalidPrice); }
        Ok(())
    }
}

impl Product {
    pub fn create(slug: Slug, code: ProductCode, details: ProductDetails) -> Result<Self, ProductError> {
        details.check()?;
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::now_v7(), slug, code, name: String::new(), description: String::new(), category: String::new(),
            price: 0, compare_at_price: None, images: vec![], in_stock: true, is_active: true,
            created_at: now, updated_at: now,
        };
        product.apply(details);
        Ok(product)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn slug(&self) -> &Slug { &self.slug }
    pub fn code(&self) -> &ProductCode { &self.code }
    pub fn name(&self) -> &str { &self.name }
    pub fn category(&self) -> &str { &self.category }
    pub fn price(&self) -> i64 { self.price }
    pub fn in_stock(&self) -> bool { self.in_stock }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Whether storefront visitors may see the product.
    pub fn is_visible(&self) -> bool { self.is_active && self.in_stock }

    pub fn update(&mut self, details: ProductDetails) -> Result<(), ProductError> {
        details.check()?;
        self.apply(details);
        Ok(())
    }

    pub fn deactivate(&mut self) { self.is_active = false; self.touch(); }

    fn apply(&mut self, d: ProductDetails) {
        self.name = d.name.trim().to_string();
        self.description = d.description;
        self.category = d.category.trim().to_lowercase();
        self.price = d.price;
        self.compare_at_price = d.compare_at_price;
        self.images = d.images;
        self.in_stock = d.in_stock;
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, MissingCategory, InvalidPrice }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Product name is required"),
            Self::MissingCategory => write!(f, "Product category is required"),
            Self::InvalidPrice => write!(f, "Price must be positive and not above the compare-at price"),
        }
    }
}
