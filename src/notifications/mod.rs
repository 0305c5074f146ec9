//! Best-effort email fan-out for order lifecycle events.
//!
//! Request handlers enqueue onto a bounded channel and return immediately. A
//! single worker drains the channel and retries each delivery with
//! exponential backoff; jobs that still fail, or that arrive while the queue
//! is full, are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::domain::aggregates::Order;
use crate::domain::events::OrderEvent;

pub mod mailer;
pub mod messages;

pub use mailer::{Email, LogMailer, MailError, Mailer, NatsMailer};

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy { pub attempts: u32, pub base_delay: Duration }

impl Default for RetryPolicy {
    fn default() -> Self { Self { attempts: 3, base_delay: Duration::from_millis(500) } }
}

#[derive(Clone, Debug)]
pub struct Notifier {
    tx: mpsc::Sender<Email>,
    store_email: Arc<str>,
}

impl Notifier {
    /// Starts the delivery worker. It exits once every `Notifier` clone is dropped
    /// and the queue is drained.
    pub fn spawn(mailer: Arc<dyn Mailer>, capacity: usize, store_email: &str, policy: RetryPolicy) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(rx, mailer, policy));
        (Self { tx, store_email: Arc::from(store_email) }, worker)
    }

    fn order_event(&self, event: &OrderEvent, order: &Order) {
        for email in messages::emails_for(event, order, &self.store_email) {
            self.enqueue(email);
        }
    }

    /// Drains the order's pending events into the queue.
    pub fn publish(&self, order: &mut Order) {
        for event in order.take_events() {
            self.order_event(&event, order);
        }
    }

    fn enqueue(&self, email: Email) {
        match self.tx.try_send(email) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(email)) => {
                warn!(to = %email.to, subject = %email.subject, "Notification queue full, dropping email");
            }
            Err(mpsc::error::TrySendError::Closed(email)) => {
                warn!(to = %email.to, subject = %email.subject, "Notification worker stopped, dropping email");
            }
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<Email>, mailer: Arc<dyn Mailer>, policy: RetryPolicy) {
    while let Some(email) = rx.recv().await {
        deliver_with_retry(mailer.as_ref(), &email, policy).await;
    }
    debug!("Notification worker drained");
}

async fn deliver_with_retry(mailer: &dyn Mailer, email: &Email, policy: RetryPolicy) {
    let mut delay = policy.base_delay;
    for attempt in 1..=policy.attempts.max(1) {
        match mailer.deliver(email).await {
            Ok(()) => return,
            Err(e) if attempt < policy.attempts => {
                warn!(attempt, to = %email.to, "Email delivery failed, retrying: {e}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                error!(to = %email.to, subject = %email.subject, "Email delivery failed, giving up: {e}");
            }
        }
    }
}
