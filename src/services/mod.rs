//! Application services. Each owns one slice of the storefront's behaviour and
//! talks to persistence only through the [`Store`](crate::store::Store) trait.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod payfast;

pub use admin::{AdminService, DashboardStats};
pub use cart::{AddItem, CartService, CartView};
pub use catalog::{CatalogService, ProductDetail, ProductInput, ReviewInput};
pub use checkout::{CheckoutRequest, CheckoutService, ShippingAddressInput};
pub use orders::{OrderService, OrderUpdate, ScreenshotUpload};
pub use payfast::{ItnOutcome, PayFastPayload, PayFastService, SignedFields};
