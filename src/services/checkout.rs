//! Checkout: turns a session cart into an order.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::cart::CartService;
use crate::domain::aggregates::{CartItem, Order, Pricing, ShippingAddress};
use crate::domain::value_objects::PaymentMethod;
use crate::notifications::Notifier;
use crate::store::{Store, StoreError};
use crate::{EcommerceError, Result};

const ORDER_NUMBER_ATTEMPTS: usize = 3;

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub full_name: Option<String>,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 10, max = 15, message = "Please enter a valid phone number"))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl ShippingAddressInput {
    /// Presence first, in field order, then format.
    pub fn into_address(self) -> Result<ShippingAddress> {
        let required = [
            ("fullName", &self.full_name), ("email", &self.email), ("phone", &self.phone),
            ("address", &self.address), ("city", &self.city), ("postalCode", &self.postal_code),
        ];
        for (field, value) in required {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(EcommerceError::validation(format!("Missing required field: {field}")));
            }
        }
        let trimmed = Self {
            full_name: self.full_name.map(|v| v.trim().to_string()),
            email: self.email.map(|v| v.trim().to_string()),
            phone: self.phone.map(|v| v.trim().to_string()),
            address: self.address.map(|v| v.trim().to_string()),
            city: self.city.map(|v| v.trim().to_string()),
            postal_code: self.postal_code.map(|v| v.trim().to_string()),
        };
        trimmed.validate().map_err(|errors| {
            let message = errors.field_errors().into_iter()
                .min_by_key(|(field, _)| if *field == "email" { 0 } else { 1 })
                .and_then(|(_, errs)| errs.first().and_then(|e| e.message.as_ref().map(|m| m.to_string())))
                .unwrap_or_else(|| "Invalid shipping address".to_string());
            EcommerceError::Validation(message)
        })?;
        Ok(ShippingAddress {
            full_name: trimmed.full_name.unwrap_or_default(),
            email: trimmed.email.unwrap_or_default(),
            phone: trimmed.phone.unwrap_or_default(),
            address: trimmed.address.unwrap_or_default(),
            city: trimmed.city.unwrap_or_default(),
            postal_code: trimmed.postal_code.unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: Option<ShippingAddressInput>,
    pub payment_method: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
    carts: CartService,
    notifier: Notifier,
    pricing: Pricing,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn Store>, carts: CartService, notifier: Notifier, pricing: Pricing) -> Self {
        Self { store, carts, notifier, pricing }
    }

    /// Validates input, snapshots the cart into a new order and empties the cart.
    /// Once the order is stored the checkout has succeeded; cart clearing and
    /// notifications after that point only log their failures.
    #[instrument(skip(self, request))]
    pub async fn checkout(&self, session_id: &str, request: CheckoutRequest) -> Result<Order> {
        let address = request.shipping_address
            .ok_or_else(|| EcommerceError::validation("Shipping address is required"))?
            .into_address()?;
        let method = request.payment_method.as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| EcommerceError::validation("Payment method is required"))?
            .parse::<PaymentMethod>()
            .map_err(|_| EcommerceError::validation("Invalid payment method"))?;

        let _guard = self.carts.lock(session_id).await;
        let mut cart = match self.store.load_cart(session_id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(EcommerceError::EmptyCart),
        };

        let mut order = self.place(session_id, cart.items(), address, method).await?;
        info!(order_number = %order.order_number(), total = order.total_amount(), method = %method, "Order placed");

        cart.clear();
        if let Err(e) = self.carts.save(&cart).await {
            warn!(order_number = %order.order_number(), "Failed to clear cart after checkout: {e}");
        }
        self.notifier.publish(&mut order);
        Ok(order)
    }

    async fn place(
        &self,
        session_id: &str,
        items: &[CartItem],
        address: ShippingAddress,
        method: PaymentMethod,
    ) -> Result<Order> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let number = self.store.next_order_number().await?;
            let order = Order::place(number, session_id, items, address.clone(), method, self.pricing)?;
            match self.store.insert_order(&order).await {
                Ok(()) => return Ok(order),
                Err(StoreError::Duplicate(_)) => warn!(order_number = %order.order_number(), "Order number taken, retrying"),
                Err(e) => return Err(e.into()),
            }
        }
        Err(EcommerceError::Storage("could not allocate an order number".into()))
    }
}
