//! Domain events
use crate::domain::aggregates::{FulfillmentStatus, PaymentStatus};
use crate::domain::value_objects::OrderNumber;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderEvent {
    Placed { order_number: OrderNumber },
    ScreenshotUploaded { order_number: OrderNumber },
    PaymentStatusChanged { order_number: OrderNumber, from: PaymentStatus, to: PaymentStatus },
    FulfillmentChanged { order_number: OrderNumber, to: FulfillmentStatus },
}
