//! Order Aggregate
//!
//! Items and totals are frozen when the order is placed. After that only the
//! payment status, the fulfillment status and the one-time screenshot
//! attachment change, each through the transition methods below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::CartItem;
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{OrderNumber, PaymentMethod, UnknownVariant};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    order_number: OrderNumber,
    session_id: String,
    items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    subtotal: i64,
    delivery_charges: i64,
    total_amount: i64,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    payment_note: String,
    status: FulfillmentStatus,
    payment_screenshot: Option<String>,
    screenshot_uploaded_at: Option<DateTime<Utc>>,
    payment_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<OrderEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem { pub product_ref: String, pub slug: String, pub name: String, pub price: i64, pub image: String, pub quantity: u32 }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress { pub full_name: String, pub email: String, pub phone: String, pub address: String, pub city: String, pub postal_code: String }

/// Delivery pricing applied once at checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pricing { pub free_shipping_threshold: i64, pub delivery_charge: i64 }

impl Default for Pricing {
    fn default() -> Self { Self { free_shipping_threshold: 7000, delivery_charge: 250 } }
}

impl Pricing {
    pub fn delivery_for(&self, subtotal: i64) -> i64 {
        if subtotal >= self.free_shipping_threshold { 0 } else { self.delivery_charge }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, AwaitingVerification, Paid, Failed }

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [Self::Pending, Self::AwaitingVerification, Self::Paid, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingVerification => "awaiting_verification",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    /// Forward-only: pending -> awaiting_verification -> {paid | failed}.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Pending, AwaitingVerification | Paid | Failed) | (AwaitingVerification, Paid | Failed))
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Paid | Self::Failed) }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s.trim()).ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

impl FulfillmentStatus {
    pub const ALL: [FulfillmentStatus; 5] = [Self::Pending, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: FulfillmentStatus) -> bool {
        use FulfillmentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Cancelled) | (Processing, Shipped | Cancelled) | (Shipped, Delivered)
        )
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FulfillmentStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s.trim()).ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl Order {
    /// Snapshots `items` into a new order and computes its totals.
    pub fn place(
        order_number: OrderNumber,
        session_id: impl Into<String>,
        items: &[CartItem],
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        pricing: Pricing,
    ) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let items: Vec<OrderItem> = items.iter().map(|i| OrderItem {
            product_ref: i.product_ref.clone(), slug: i.slug.clone(), name: i.name.clone(),
            price: i.price, image: i.image.clone(), quantity: i.quantity,
        }).collect();
        let subtotal = items.iter()
            .try_fold(0i64, |sum, i| i.price.checked_mul(i64::from(i.quantity))?.checked_add(sum))
            .ok_or(OrderError::AmountTooLarge)?;
        let delivery_charges = pricing.delivery_for(subtotal);
        let total_amount = subtotal.checked_add(delivery_charges).ok_or(OrderError::AmountTooLarge)?;
        let (payment_status, payment_note) = initial_payment_state(payment_method);
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), order_number: order_number.clone(), session_id: session_id.into(), items, shipping_address,
            subtotal, delivery_charges, total_amount,
            payment_method, payment_status, payment_note: payment_note.to_string(), status: FulfillmentStatus::Pending,
            payment_screenshot: None, screenshot_uploaded_at: None, payment_verified_at: None,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(OrderEvent::Placed { order_number });
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn subtotal(&self) -> i64 { self.subtotal }
    pub fn delivery_charges(&self) -> i64 { self.delivery_charges }
    pub fn total_amount(&self) -> i64 { self.total_amount }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn payment_note(&self) -> &str { &self.payment_note }
    pub fn status(&self) -> FulfillmentStatus { self.status }
    pub fn payment_screenshot(&self) -> Option<&str> { self.payment_screenshot.as_deref() }
    pub fn has_screenshot(&self) -> bool { self.payment_screenshot.is_some() }
    pub fn screenshot_uploaded_at(&self) -> Option<DateTime<Utc>> { self.screenshot_uploaded_at }
    pub fn payment_verified_at(&self) -> Option<DateTime<Utc>> { self.payment_verified_at }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Single-attempt: a second screenshot is refused, never replaces the first.
    pub fn attach_screenshot(&mut self, reference: impl Into<String>, method: PaymentMethod) -> Result<(), OrderError> {
        if self.payment_screenshot.is_some() { return Err(OrderError::ScreenshotExists); }
        let from = self.payment_status;
        if from != PaymentStatus::AwaitingVerification && !from.can_transition_to(PaymentStatus::AwaitingVerification) {
            return Err(OrderError::InvalidTransition { from: from.as_str(), to: PaymentStatus::AwaitingVerification.as_str() });
        }
        let now = Utc::now();
        self.payment_screenshot = Some(reference.into());
        self.screenshot_uploaded_at = Some(now);
        self.payment_method = method;
        self.payment_status = PaymentStatus::AwaitingVerification;
        self.touch();
        self.raise_event(OrderEvent::ScreenshotUploaded { order_number: self.order_number.clone() });
        Ok(())
    }

    /// Manual confirmation of an uploaded proof of payment.
    pub fn verify_payment(&mut self) -> Result<(), OrderError> {
        if self.payment_screenshot.is_none() { return Err(OrderError::NoScreenshot); }
        if self.payment_status != PaymentStatus::AwaitingVerification {
            return Err(OrderError::InvalidTransition { from: self.payment_status.as_str(), to: PaymentStatus::Paid.as_str() });
        }
        self.set_payment_status(PaymentStatus::Paid);
        Ok(())
    }

    /// Applies an externally requested payment status. Returns `false` when the
    /// order is already in `next`, so repeated triggers are harmless.
    pub fn transition_payment(&mut self, next: PaymentStatus) -> Result<bool, OrderError> {
        if self.payment_status == next { return Ok(false); }
        if !self.payment_status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.payment_status.as_str(), to: next.as_str() });
        }
        self.set_payment_status(next);
        Ok(true)
    }

    pub fn transition_fulfillment(&mut self, next: FulfillmentStatus) -> Result<bool, OrderError> {
        if self.status == next { return Ok(false); }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status.as_str(), to: next.as_str() });
        }
        self.status = next;
        self.touch();
        self.raise_event(OrderEvent::FulfillmentChanged { order_number: self.order_number.clone(), to: next });
        Ok(true)
    }

    fn set_payment_status(&mut self, next: PaymentStatus) {
        let from = self.payment_status;
        self.payment_status = next;
        if next == PaymentStatus::Paid { self.payment_verified_at = Some(Utc::now()); }
        self.touch();
        self.raise_event(OrderEvent::PaymentStatusChanged { order_number: self.order_number.clone(), from, to: next });
    }

    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn initial_payment_state(method: PaymentMethod) -> (PaymentStatus, &'static str) {
    match method {
        PaymentMethod::Cod => (PaymentStatus::Pending, "Pay on delivery. Please keep the exact amount ready."),
        PaymentMethod::Payfast => (PaymentStatus::Pending, "Complete your payment on the PayFast page."),
        PaymentMethod::Jazzcash | PaymentMethod::Easypaisa | PaymentMethod::BankTransfer => {
            (PaymentStatus::AwaitingVerification, "Upload a screenshot of your payment as proof of payment.")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NoItems, AmountTooLarge, ScreenshotExists, NoScreenshot, InvalidTransition { from: &'static str, to: &'static str } }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "Order has no items"),
            Self::AmountTooLarge => write!(f, "Order total is too large"),
            Self::ScreenshotExists => write!(f, "A payment screenshot has already been uploaded for this order"),
            Self::NoScreenshot => write!(f, "No payment screenshot has been uploaded for this order"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot change status from {from} to {to}"),
        }
    }
}
