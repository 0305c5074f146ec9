//! Client-facing projections of the order aggregate.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::aggregates::{FulfillmentStatus, Order, OrderItem, PaymentStatus, ShippingAddress};
use crate::domain::value_objects::PaymentMethod;

/// Customer view: the screenshot reference is reduced to a flag.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView<'a> {
    pub order_number: &'a str,
    pub items: &'a [OrderItem],
    pub shipping_address: &'a ShippingAddress,
    pub subtotal: i64,
    pub delivery_charges: i64,
    pub total_amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_note: &'a str,
    pub status: FulfillmentStatus,
    pub has_screenshot: bool,
    pub screenshot_uploaded_at: Option<DateTime<Utc>>,
    pub payment_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Order> for OrderView<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            order_number: order.order_number().as_str(),
            items: order.items(),
            shipping_address: order.shipping_address(),
            subtotal: order.subtotal(),
            delivery_charges: order.delivery_charges(),
            total_amount: order.total_amount(),
            payment_method: order.payment_method(),
            payment_status: order.payment_status(),
            payment_note: order.payment_note(),
            status: order.status(),
            has_screenshot: order.has_screenshot(),
            screenshot_uploaded_at: order.screenshot_uploaded_at(),
            payment_verified_at: order.payment_verified_at(),
            created_at: order.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView<'a> {
    pub order_number: &'a str,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_verified_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Order> for PaymentView<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            order_number: order.order_number().as_str(),
            payment_status: order.payment_status(),
            payment_method: order.payment_method(),
            payment_verified_at: order.payment_verified_at(),
        }
    }
}
