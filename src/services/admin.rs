//! Back-office dashboard figures.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::aggregates::PaymentStatus;
use crate::store::{ReviewFilter, Store};
use crate::Result;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: i64,
    pub orders_by_payment_status: HashMap<PaymentStatus, i64>,
    pub revenue: i64,
    pub active_products: i64,
    pub pending_reviews: usize,
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Store>,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn stats(&self) -> Result<DashboardStats> {
        let orders = self.store.order_stats().await?;
        let active_products = self.store.count_active_products().await?;
        let pending = self.store.list_reviews(&ReviewFilter { product_slug: None, approved: Some(false) }).await?;
        let mut by_status = orders.by_payment_status;
        for status in PaymentStatus::ALL {
            by_status.entry(status).or_insert(0);
        }
        Ok(DashboardStats {
            total_orders: orders.total_orders,
            orders_by_payment_status: by_status,
            revenue: orders.revenue,
            active_products,
            pending_reviews: pending.len(),
        })
    }
}
