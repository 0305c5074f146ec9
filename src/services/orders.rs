//! Order reads and every post-checkout order mutation: screenshot upload,
//! payment verification, gateway and admin status changes, deletion.
//!
//! All mutations of one order run under that order's lock, so transitions
//! apply in arrival order and a check-then-write is never interleaved.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::VerificationDelay;
use crate::domain::aggregates::{FulfillmentStatus, Order, PaymentStatus};
use crate::domain::value_objects::{OrderNumber, PaymentMethod};
use crate::locks::KeyedLocks;
use crate::notifications::Notifier;
use crate::shutdown::Shutdown;
use crate::store::{Page, PageRequest, Store};
use crate::uploads::{ScreenshotStorage, UploadedImage};
use crate::{EcommerceError, Result};

/// Multipart fields of a payment proof submission.
#[derive(Clone, Debug, Default)]
pub struct ScreenshotUpload {
    pub order_number: Option<String>,
    pub payment_method: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    locks: Arc<KeyedLocks>,
    uploads: ScreenshotStorage,
    notifier: Notifier,
    delay: VerificationDelay,
    max_upload_bytes: usize,
    shutdown: Shutdown,
}

pub(crate) fn parse_number(raw: &str) -> Result<OrderNumber> {
    OrderNumber::parse(raw).ok_or_else(|| EcommerceError::not_found("Order"))
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        locks: Arc<KeyedLocks>,
        uploads: ScreenshotStorage,
        notifier: Notifier,
        delay: VerificationDelay,
        max_upload_bytes: usize,
        shutdown: Shutdown,
    ) -> Self {
        Self { store, locks, uploads, notifier, delay, max_upload_bytes, shutdown }
    }

    pub async fn get(&self, number: &str) -> Result<Order> {
        self.find(&parse_number(number)?).await
    }

    /// Customer-facing read: another session's order looks like a missing one.
    pub async fn get_for_session(&self, number: &str, session_id: &str) -> Result<Order> {
        Some(self.get(number).await?)
            .filter(|order| order.session_id() == session_id)
            .ok_or_else(|| EcommerceError::not_found("Order"))
    }

    pub async fn list(&self, payment_status: Option<&str>, page: PageRequest) -> Result<Page<Order>> {
        let status = payment_status.filter(|s| !s.is_empty()).map(parse_payment_status).transpose()?;
        Ok(self.store.list_orders(status, page).await?)
    }

    async fn find(&self, number: &OrderNumber) -> Result<Order> {
        self.store.find_order(number).await?.ok_or_else(|| EcommerceError::not_found("Order"))
    }

    /// Loads, mutates and saves one order under its lock, then publishes its events.
    async fn mutate<T>(&self, number: &OrderNumber, f: impl FnOnce(&mut Order) -> Result<T>) -> Result<(Order, T)> {
        let _guard = self.locks.lock(number.as_str()).await;
        let mut order = self.find(number).await?;
        let out = f(&mut order)?;
        self.store.save_order(&order).await?;
        self.notifier.publish(&mut order);
        Ok((order, out))
    }

    /// Stores a payment screenshot and moves the order to awaiting verification.
    #[instrument(skip(self, upload), fields(order_number = ?upload.order_number))]
    pub async fn attach_screenshot(&self, upload: ScreenshotUpload) -> Result<Order> {
        let image = UploadedImage::validate(upload.content_type.as_deref(), upload.bytes.unwrap_or_default(), self.max_upload_bytes)?;
        let number = upload.order_number.as_deref().map(str::trim).filter(|n| !n.is_empty())
            .ok_or_else(|| EcommerceError::validation("Order number is required"))?;
        let method = upload.payment_method.as_deref().unwrap_or_default().parse::<PaymentMethod>()
            .map_err(|_| EcommerceError::validation("Invalid payment method"))?;
        if !method.requires_proof() {
            return Err(EcommerceError::validation("Payment proof is only accepted for JazzCash, EasyPaisa and bank transfer"));
        }
        let number = parse_number(number)?;

        let _guard = self.locks.lock(number.as_str()).await;
        let mut order = self.find(&number).await?;
        if order.has_screenshot() {
            return Err(EcommerceError::Conflict("A payment screenshot has already been uploaded for this order".into()));
        }
        if order.payment_status().is_terminal() {
            return Err(EcommerceError::InvalidState(format!("Order payment is already {}", order.payment_status())));
        }

        let reference = self.uploads.save(&number, &image).await?;
        let stored: Result<()> = async {
            order.attach_screenshot(reference.clone(), method)?;
            self.store.save_order(&order).await?;
            Ok(())
        }.await;
        if let Err(e) = stored {
            if let Err(cleanup) = self.uploads.remove(&reference).await {
                warn!(%reference, "Failed to remove orphaned screenshot: {cleanup}");
            }
            return Err(e);
        }

        info!(order_number = %number, method = %method, "Payment screenshot uploaded");
        self.notifier.publish(&mut order);
        Ok(order)
    }

    /// Marks an order with an uploaded screenshot as paid.
    #[instrument(skip(self))]
    pub async fn verify(&self, number: &str) -> Result<Order> {
        let number = parse_number(number)?;
        let (order, ()) = self.mutate(&number, |order| Ok(order.verify_payment()?)).await?;
        info!(order_number = %number, "Payment verified");
        Ok(order)
    }

    /// Verification after a simulated processing delay. The work runs in its own
    /// task: a client disconnect does not stop it, shutdown does, but only
    /// before the order is touched.
    #[instrument(skip(self))]
    pub async fn verify_after_delay(&self, number: &str) -> Result<Order> {
        let parsed = parse_number(number)?;
        let mut probe = self.find(&parsed).await?;
        probe.verify_payment()?;

        let delay = self.delay.sample();
        let shutdown = self.shutdown.clone();
        let this = self.clone();
        let number = number.to_string();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.wait() => {
                    warn!(order_number = %number, "Shutdown before payment verification completed");
                    Err(EcommerceError::Unavailable("Server is shutting down, please try again".into()))
                }
                _ = tokio::time::sleep(delay) => this.verify(&number).await,
            }
        });
        task.await.map_err(|e| EcommerceError::Storage(format!("verification task failed: {e}")))?
    }

    /// Applies a payment status reported by a gateway or an admin. Returns
    /// whether anything changed; re-applying the current status is a no-op.
    pub async fn transition_payment(&self, number: &OrderNumber, status: PaymentStatus) -> Result<(Order, bool)> {
        let (order, changed) = self.mutate(number, |order| Ok(order.transition_payment(status)?)).await?;
        if changed { info!(order_number = %number, status = %status, "Payment status changed"); }
        Ok((order, changed))
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, number: &str, update: OrderUpdate) -> Result<Order> {
        let number = parse_number(number)?;
        let status = update.status.as_deref().map(parse_fulfillment_status).transpose()?;
        let payment = update.payment_status.as_deref().map(parse_payment_status).transpose()?;
        if status.is_none() && payment.is_none() {
            return Err(EcommerceError::validation("Nothing to update"));
        }
        let (order, ()) = self.mutate(&number, |order| {
            if let Some(p) = payment { order.transition_payment(p)?; }
            if let Some(s) = status { order.transition_fulfillment(s)?; }
            Ok(())
        }).await?;
        info!(order_number = %number, status = %order.status(), payment_status = %order.payment_status(), "Order updated");
        Ok(order)
    }

    /// Admin override; also removes the stored screenshot.
    pub async fn delete(&self, number: &str) -> Result<Order> {
        let number = parse_number(number)?;
        let _guard = self.locks.lock(number.as_str()).await;
        let order = self.store.delete_order(&number).await?.ok_or_else(|| EcommerceError::not_found("Order"))?;
        if let Some(reference) = order.payment_screenshot() {
            if let Err(e) = self.uploads.remove(reference).await {
                warn!(order_number = %number, "Failed to remove screenshot of deleted order: {e}");
            }
        }
        warn!(order_number = %number, "Order deleted");
        Ok(order)
    }
}

fn parse_payment_status(raw: &str) -> Result<PaymentStatus> {
    raw.parse().map_err(|_| EcommerceError::validation(format!("Unknown payment status '{raw}'")))
}

fn parse_fulfillment_status(raw: &str) -> Result<FulfillmentStatus> {
    raw.parse().map_err(|_| EcommerceError::validation(format!("Unknown order status '{raw}'")))
}
