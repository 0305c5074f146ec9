//! PayFast hosted-payment integration: signed redirect payloads, ITN
//! (instant transaction notification) handling and browser return redirects.

use md5::{Digest, Md5};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::orders::{parse_number, OrderService};
use crate::config::PayFastConfig;
use crate::domain::aggregates::PaymentStatus;
use crate::domain::value_objects::PaymentMethod;
use crate::{EcommerceError, Result};

const SIGNATURE_FIELD: &str = "signature";

/// Form fields in submission order; serialised as a JSON object that keeps it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignedFields(pub Vec<(String, String)>);

impl SignedFields {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

impl Serialize for SignedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 { map.serialize_entry(k, v)?; }
        map.end()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayFastPayload {
    pub process_url: String,
    pub fields: SignedFields,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItnOutcome {
    Applied(PaymentStatus),
    /// Already in the reported state.
    Unchanged,
    /// Status we do not act on, or a transition the order no longer allows.
    Ignored,
}

#[derive(Clone)]
pub struct PayFastService {
    orders: OrderService,
    config: PayFastConfig,
    site_url: String,
}

impl PayFastService {
    pub fn new(orders: OrderService, config: PayFastConfig, site_url: String) -> Self {
        Self { orders, config, site_url: site_url.trim_end_matches('/').to_string() }
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.config.is_configured() { Ok(()) } else { Err(EcommerceError::Unavailable("PayFast is not configured".into())) }
    }

    /// Gateway signature: MD5 over the url-encoded fields in order, minus the
    /// signature, with the passphrase appended when one is set.
    pub fn sign(&self, fields: &[(String, String)]) -> String {
        let mut params: Vec<(&str, &str)> = fields.iter()
            .filter(|(k, _)| k != SIGNATURE_FIELD)
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !self.config.passphrase.is_empty() {
            params.push(("passphrase", self.config.passphrase.as_str()));
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish()
            .replace('*', "%2A");
        hex::encode(Md5::digest(query.as_bytes()))
    }

    fn verify(&self, fields: &[(String, String)], signature: &str) -> bool {
        constant_time_eq(&self.sign(fields), &signature.trim().to_ascii_lowercase())
    }

    #[instrument(skip(self, session_id))]
    pub async fn initiate(&self, order_number: &str, session_id: &str) -> Result<PayFastPayload> {
        self.ensure_configured()?;
        let order = self.orders.get_for_session(order_number, session_id).await?;
        if order.payment_method() != PaymentMethod::Payfast {
            return Err(EcommerceError::validation("Order is not set up for PayFast payment"));
        }
        if order.payment_status() != PaymentStatus::Pending {
            return Err(EcommerceError::InvalidState(format!("Order payment is already {}", order.payment_status())));
        }

        let number = order.order_number().as_str();
        let address = order.shipping_address();
        let (first, last) = address.full_name.split_once(' ').unwrap_or((address.full_name.as_str(), ""));
        let encoded: String = url::form_urlencoded::byte_serialize(number.as_bytes()).collect();
        let webhook = format!("{}/api/payfast/webhook", self.site_url);
        let mut fields: Vec<(String, String)> = [
            ("merchant_id", self.config.merchant_id.clone()),
            ("merchant_key", self.config.merchant_key.clone()),
            ("return_url", format!("{webhook}?result=success&order={encoded}")),
            ("cancel_url", format!("{webhook}?result=cancel&order={encoded}")),
            ("notify_url", webhook.clone()),
            ("name_first", first.trim().to_string()),
            ("name_last", last.trim().to_string()),
            ("email_address", address.email.clone()),
            ("m_payment_id", number.to_string()),
            ("amount", format!("{}.00", order.total_amount())),
            ("item_name", format!("Order {number}")),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let signature = self.sign(&fields);
        fields.push((SIGNATURE_FIELD.to_string(), signature));

        info!(order_number = number, "PayFast payment initiated");
        Ok(PayFastPayload { process_url: self.config.process_url.clone(), fields: SignedFields(fields) })
    }

    /// Verifies and applies one ITN. Integrity failures never touch the order.
    #[instrument(skip_all, fields(order_number))]
    pub async fn handle_notification(&self, fields: SignedFields) -> Result<ItnOutcome> {
        self.ensure_configured()?;
        let signature = fields.get(SIGNATURE_FIELD).unwrap_or_default();
        if signature.is_empty() || !self.verify(&fields.0, signature) {
            warn!("Rejected PayFast notification with an invalid signature");
            return Err(EcommerceError::Integrity("Invalid signature".into()));
        }

        let reference = fields.get("m_payment_id").unwrap_or_default();
        tracing::Span::current().record("order_number", reference);
        let number = parse_number(reference)?;
        let order = self.orders.get(reference).await?;
        if order.payment_method() != PaymentMethod::Payfast {
            warn!(order_number = reference, "PayFast notification for a non-PayFast order");
            return Err(EcommerceError::Integrity("Order is not a PayFast order".into()));
        }
        if let Some(gross) = fields.get("amount_gross") {
            if !amount_matches(gross, order.total_amount()) {
                warn!(order_number = reference, gross, expected = order.total_amount(), "PayFast amount mismatch");
                return Err(EcommerceError::Integrity("Amount does not match order total".into()));
            }
        }

        let status = match fields.get("payment_status").unwrap_or_default() {
            "COMPLETE" => PaymentStatus::Paid,
            "FAILED" | "CANCELLED" => PaymentStatus::Failed,
            other => {
                info!(order_number = reference, status = other, "Ignoring PayFast status");
                return Ok(ItnOutcome::Ignored);
            }
        };

        match self.orders.transition_payment(&number, status).await {
            Ok((_, true)) => Ok(ItnOutcome::Applied(status)),
            Ok((_, false)) => Ok(ItnOutcome::Unchanged),
            Err(EcommerceError::InvalidState(reason)) => {
                warn!(order_number = reference, %status, "PayFast notification not applied: {reason}");
                Ok(ItnOutcome::Ignored)
            }
            Err(e) => Err(e),
        }
    }

    /// Where to send the shopper's browser after the hosted payment page.
    pub fn return_redirect(&self, result: Option<&str>, order: Option<&str>) -> String {
        let order: Option<String> = order.filter(|o| !o.is_empty())
            .map(|o| url::form_urlencoded::byte_serialize(o.as_bytes()).collect());
        match (result, order) {
            (Some("success"), Some(order)) => format!("{}/order-confirmation/{order}", self.site_url),
            (Some("success"), None) => format!("{}/", self.site_url),
            (_, Some(order)) => format!("{}/checkout?cancelled={order}", self.site_url),
            (_, None) => format!("{}/checkout", self.site_url),
        }
    }
}

fn amount_matches(gross: &str, total: i64) -> bool {
    match (gross.trim().parse::<f64>(), total.checked_mul(100)) {
        (Ok(g), Some(cents)) => (g * 100.0).round() as i64 == cents,
        _ => false,
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() { return false; }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
