//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod review;

pub use product::{Product, ProductDetails, ProductError};
pub use order::{FulfillmentStatus, Order, OrderError, OrderItem, PaymentStatus, Pricing, ShippingAddress};
pub use cart::{Cart, CartError, CartItem};
pub use review::{RatingSummary, Review, ReviewError};
