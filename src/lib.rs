//! Storefront backend
//!
//! Watches, belts and wallets sold through a session cart and a checkout that
//! supports cash on delivery, mobile wallets, bank transfer and PayFast.
//!
//! ## Features
//! - Product catalog and customer reviews
//! - Session-scoped shopping cart
//! - Checkout with atomic order numbering
//! - Payment proof upload, manual verification and PayFast notifications
//! - Admin back-office behind a signed token
//! - Background email notifications

use std::sync::Arc;
use thiserror::Error;

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod locks;
pub mod notifications;
pub mod services;
pub mod shutdown;
pub mod store;
pub mod uploads;

use crate::auth::AdminAuth;
use crate::config::Config;
use crate::locks::KeyedLocks;
use crate::notifications::Notifier;
use crate::services::{AdminService, CartService, CatalogService, CheckoutService, OrderService, PayFastService};
use crate::shutdown::Shutdown;
use crate::store::Store;
use crate::uploads::ScreenshotStorage;

// =============================================================================
// Application state
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AdminAuth,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub payfast: PayFastService,
    pub catalog: CatalogService,
    pub admin: AdminService,
}

impl AppState {
    /// Wires every service over one store handle, created once at start-up.
    pub fn new(config: Config, store: Arc<dyn Store>, notifier: Notifier, shutdown: Shutdown) -> Self {
        let config = Arc::new(config);
        let uploads = ScreenshotStorage::new(config.upload_dir.clone());
        let carts = CartService::new(store.clone(), Arc::new(KeyedLocks::default()));
        let checkout = CheckoutService::new(store.clone(), carts.clone(), notifier.clone(), config.pricing());
        let orders = OrderService::new(
            store.clone(), Arc::new(KeyedLocks::default()), uploads, notifier,
            config.verification_delay(), config.max_upload_bytes, shutdown,
        );
        let payfast = PayFastService::new(orders.clone(), config.payfast.clone(), config.site_url.clone());
        let catalog = CatalogService::new(store.clone());
        let admin = AdminService::new(store);
        let auth = AdminAuth::new(&config.admin_password, &config.jwt_secret, config.admin_token_ttl_secs);
        Self { config, auth, carts, checkout, orders, payfast, catalog, admin }
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Integrity(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EcommerceError {
    pub fn validation(message: impl Into<String>) -> Self { Self::Validation(message.into()) }
    pub fn not_found(what: &str) -> Self { Self::NotFound(format!("{what} not found")) }
}

impl From<store::StoreError> for EcommerceError {
    fn from(e: store::StoreError) -> Self {
        match e {
            store::StoreError::Duplicate(what) => Self::Conflict(format!("A record with this {what} already exists")),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<domain::aggregates::CartError> for EcommerceError {
    fn from(e: domain::aggregates::CartError) -> Self {
        match e {
            domain::aggregates::CartError::ItemNotFound => Self::NotFound(e.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<domain::aggregates::OrderError> for EcommerceError {
    fn from(e: domain::aggregates::OrderError) -> Self {
        match e {
            domain::aggregates::OrderError::NoItems => Self::EmptyCart,
            domain::aggregates::OrderError::AmountTooLarge => Self::Validation(e.to_string()),
            domain::aggregates::OrderError::ScreenshotExists => Self::Conflict(e.to_string()),
            other => Self::InvalidState(other.to_string()),
        }
    }
}

impl From<domain::aggregates::ProductError> for EcommerceError {
    fn from(e: domain::aggregates::ProductError) -> Self { Self::Validation(e.to_string()) }
}

impl From<domain::aggregates::ReviewError> for EcommerceError {
    fn from(e: domain::aggregates::ReviewError) -> Self { Self::Validation(e.to_string()) }
}

impl From<domain::value_objects::IdentError> for EcommerceError {
    fn from(e: domain::value_objects::IdentError) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
