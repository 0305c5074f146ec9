//! Plain-text messages for order lifecycle events.

use std::fmt::Write;

use super::Email;
use crate::domain::aggregates::{FulfillmentStatus, Order, PaymentStatus};
use crate::domain::events::OrderEvent;

pub fn emails_for(event: &OrderEvent, order: &Order, store_email: &str) -> Vec<Email> {
    let number = order.order_number();
    let customer = &order.shipping_address().email;
    let name = &order.shipping_address().full_name;
    match event {
        OrderEvent::Placed { .. } => vec![
            Email { to: store_email.to_string(), subject: format!("New order {number}"), body: operator_summary(order) },
            Email {
                to: customer.clone(),
                subject: format!("Order {number} confirmed"),
                body: format!("Dear {name},\n\nThank you for your order.\n\n{}\n{}\n", order_lines(order), order.payment_note()),
            },
        ],
        OrderEvent::ScreenshotUploaded { .. } => vec![
            Email {
                to: store_email.to_string(),
                subject: format!("Payment proof uploaded for {number}"),
                body: format!(
                    "A {} payment screenshot was uploaded for order {number} (Rs. {}). Please verify it.\n",
                    order.payment_method().label(), order.total_amount(),
                ),
            },
            Email {
                to: customer.clone(),
                subject: format!("We received your payment proof for {number}"),
                body: format!("Dear {name},\n\nWe received your payment screenshot and will confirm your payment shortly.\n"),
            },
        ],
        OrderEvent::PaymentStatusChanged { to: PaymentStatus::Paid, .. } => vec![Email {
            to: customer.clone(),
            subject: format!("Payment confirmed for {number}"),
            body: format!("Dear {name},\n\nYour payment of Rs. {} has been confirmed. We are preparing your order.\n", order.total_amount()),
        }],
        OrderEvent::PaymentStatusChanged { to: PaymentStatus::Failed, .. } => vec![Email {
            to: customer.clone(),
            subject: format!("Payment failed for {number}"),
            body: format!("Dear {name},\n\nWe could not confirm your payment for order {number}. Please contact us to complete your order.\n"),
        }],
        OrderEvent::PaymentStatusChanged { .. } => vec![],
        OrderEvent::FulfillmentChanged { to: FulfillmentStatus::Processing, .. } => vec![],
        OrderEvent::FulfillmentChanged { to, .. } => vec![Email {
            to: customer.clone(),
            subject: format!("Order {number} is {to}"),
            body: format!("Dear {name},\n\nYour order {number} is now {to}.\n"),
        }],
    }
}

fn order_lines(order: &Order) -> String {
    let mut out = String::new();
    for item in order.items() {
        let _ = writeln!(out, "{} x{} - Rs. {}", item.name, item.quantity, item.price * i64::from(item.quantity));
    }
    let _ = writeln!(out, "Subtotal: Rs. {}", order.subtotal());
    let _ = writeln!(out, "Delivery: Rs. {}", order.delivery_charges());
    let _ = write!(out, "Total: Rs. {}", order.total_amount());
    out
}

fn operator_summary(order: &Order) -> String {
    let a = order.shipping_address();
    format!(
        "Order {} via {}\n\n{}\n\nCustomer: {} <{}>, {}\nShip to: {}, {} {}\n",
        order.order_number(), order.payment_method().label(), order_lines(order),
        a.full_name, a.email, a.phone, a.address, a.city, a.postal_code,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CartItem, Pricing, ShippingAddress};
    use crate::domain::value_objects::{OrderNumber, PaymentMethod};

    fn order() -> Order {
        let item = CartItem::new("p1", "wallet", "Bifold Wallet", Some(1500), "/w.jpg").unwrap();
        let address = ShippingAddress { full_name: "Ayesha Khan".into(), email: "ayesha@example.com".into(), ..ShippingAddress::default() };
        Order::place(OrderNumber::from_sequence(3), "s", &[item], address, PaymentMethod::Cod, Pricing::default()).unwrap()
    }

    #[test]
    fn test_placed_notifies_operator_and_customer() {
        let mut order = order();
        let events = order.take_events();
        let emails = emails_for(&events[0], &order, "shop@example.com");
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].to, "shop@example.com");
        assert_eq!(emails[1].to, "ayesha@example.com");
        assert!(emails[1].body.contains("Total: Rs. 1750"));
    }

    #[test]
    fn test_processing_is_silent() {
        let mut order = order();
        order.transition_fulfillment(FulfillmentStatus::Processing).unwrap();
        let events = order.take_events();
        assert!(emails_for(&events[1], &order, "shop@example.com").is_empty());
    }
}
