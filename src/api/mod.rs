//! HTTP surface. Every endpoint answers with a JSON envelope carrying a
//! `success` flag; failures add a display-safe `error` sentence.

use axum::{
    extract::{rejection::{FormRejection, JsonRejection, QueryRejection}, DefaultBodyLimit},
    middleware,
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{AppState, EcommerceError, Result};

mod admin;
mod error;
mod payfast;
pub mod session;
mod shop;
pub mod views;

/// Multipart framing on top of the image itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/cart", get(shop::get_cart).post(shop::add_to_cart).put(shop::update_cart).delete(shop::remove_from_cart))
        .route("/cart/clear", post(shop::clear_cart))
        .route("/checkout", post(shop::checkout))
        .route("/orders/:order_number", get(shop::get_order))
        .route("/payfast/initiate", post(payfast::initiate))
        .layer(middleware::from_fn(session::session_middleware));

    let upload_limit = state.config.max_upload_bytes + UPLOAD_OVERHEAD_BYTES;
    let public_routes = Router::new()
        .route("/products", get(shop::list_products))
        .route("/products/:slug", get(shop::get_product))
        .route("/products/:slug/reviews", get(shop::list_reviews).post(shop::submit_review))
        .route("/orders/:order_number/verify-payment", post(shop::verify_payment))
        .route("/payment-verification", post(shop::upload_screenshot).layer(DefaultBodyLimit::max(upload_limit)))
        .route("/payfast/webhook", get(payfast::return_redirect).post(payfast::notify));

    let admin_routes = Router::new()
        .route("/orders", get(admin::list_orders))
        .route("/orders/:order_number", get(admin::get_order).patch(admin::update_order).delete(admin::delete_order))
        .route("/orders/:order_number/verify", post(admin::verify_order))
        .route("/products", get(admin::list_products).post(admin::create_product))
        .route("/products/:slug", delete(admin::delete_product).put(admin::update_product))
        .route("/reviews", get(admin::list_reviews))
        .route("/reviews/:id", delete(admin::delete_review))
        .route("/reviews/:id/approve", post(admin::approve_review))
        .route("/stats", get(admin::stats))
        .layer(middleware::from_fn_with_state(state.clone(), admin::require_admin))
        .route("/login", post(admin::login))
        .route("/logout", post(admin::logout));

    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "storefront"})) }))
        .nest("/api", session_routes.merge(public_routes).nest("/admin", admin_routes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload.map(|Json(body)| body).map_err(|e| EcommerceError::Validation(format!("Invalid request body: {}", e.body_text())))
}

fn query<T>(params: std::result::Result<axum::extract::Query<T>, QueryRejection>) -> Result<T> {
    params.map(|axum::extract::Query(q)| q).map_err(|_| EcommerceError::validation("Invalid query parameters"))
}

fn form<T>(payload: std::result::Result<Form<T>, FormRejection>) -> Result<T> {
    payload.map(|Form(body)| body).map_err(|_| EcommerceError::validation("Malformed form body"))
}
