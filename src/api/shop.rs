//! Customer-facing handlers: catalog, cart, checkout, order tracking and
//! payment proof.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::session::SessionId;
use super::views::{OrderView, PaymentView};
use super::{json_body, query};
use crate::services::{AddItem, CartView, CheckoutRequest, ReviewInput, ScreenshotUpload};
use crate::store::PageRequest;
use crate::{AppState, EcommerceError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductQuery {
    category: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateQuantity {
    product_ref: Option<String>,
    quantity: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductRefQuery {
    product_ref: Option<String>,
}

fn cart_response(cart: &crate::domain::aggregates::Cart) -> Json<Value> {
    Json(json!({ "success": true, "cart": CartView::from(cart) }))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| EcommerceError::validation(format!("Missing required field: {field}")))
}

// ---------------------------------------------------------------- catalog

pub(super) async fn list_products(
    State(state): State<AppState>,
    params: std::result::Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let params = query(params)?;
    let page = state.catalog.list(params.category, PageRequest::new(params.page, params.per_page)).await?;
    Ok(Json(json!({ "success": true, "products": page })))
}

pub(super) async fn get_product(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Value>> {
    let detail = state.catalog.get(&slug).await?;
    Ok(Json(json!({ "success": true, "product": detail.product, "rating": detail.rating })))
}

pub(super) async fn list_reviews(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Value>> {
    let reviews = state.catalog.approved_reviews(&slug).await?;
    Ok(Json(json!({ "success": true, "reviews": reviews })))
}

pub(super) async fn submit_review(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: std::result::Result<Json<ReviewInput>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let review = state.catalog.submit_review(&slug, json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "review": review,
        "message": "Thank you! Your review will appear once approved.",
    }))))
}

// ------------------------------------------------------------------- cart

pub(super) async fn get_cart(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Result<Json<Value>> {
    Ok(cart_response(&state.carts.get_or_create(&session.0).await?))
}

pub(super) async fn add_to_cart(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    payload: std::result::Result<Json<AddItem>, JsonRejection>,
) -> Result<Json<Value>> {
    Ok(cart_response(&state.carts.add_item(&session.0, json_body(payload)?).await?))
}

pub(super) async fn update_cart(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    payload: std::result::Result<Json<UpdateQuantity>, JsonRejection>,
) -> Result<Json<Value>> {
    let update = json_body(payload)?;
    let product_ref = required(update.product_ref.filter(|r| !r.is_empty()), "productRef")?;
    let quantity = required(update.quantity, "quantity")?;
    Ok(cart_response(&state.carts.set_quantity(&session.0, &product_ref, quantity).await?))
}

pub(super) async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    params: std::result::Result<Query<ProductRefQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let product_ref = required(query(params)?.product_ref.filter(|r| !r.is_empty()), "productRef")?;
    Ok(cart_response(&state.carts.remove_item(&session.0, &product_ref).await?))
}

pub(super) async fn clear_cart(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Result<Json<Value>> {
    Ok(cart_response(&state.carts.clear(&session.0).await?))
}

// --------------------------------------------------------------- checkout

pub(super) async fn checkout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let order = state.checkout.checkout(&session.0, json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "order": OrderView::from(&order) }))))
}

// ----------------------------------------------------------------- orders

pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse> {
    let order = state.orders.get_for_session(&number, &session.0).await?;
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(json!({ "success": true, "order": OrderView::from(&order) }))))
}

pub(super) async fn verify_payment(State(state): State<AppState>, Path(number): Path<String>) -> Result<Json<Value>> {
    let order = state.orders.verify_after_delay(&number).await?;
    Ok(Json(json!({ "success": true, "order": PaymentView::from(&order) })))
}

fn multipart_error(e: MultipartError) -> EcommerceError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        EcommerceError::validation("File is too large")
    } else {
        EcommerceError::validation("Malformed upload")
    }
}

pub(super) async fn upload_screenshot(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>> {
    let mut multipart = multipart.map_err(|_| EcommerceError::validation("Expected a multipart form upload"))?;
    let mut upload = ScreenshotUpload::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "screenshot" => {
                upload.content_type = field.content_type().map(str::to_string);
                upload.bytes = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            "orderNumber" => upload.order_number = Some(field.text().await.map_err(multipart_error)?),
            "paymentMethod" => upload.payment_method = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }
    let order = state.orders.attach_screenshot(upload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Screenshot received. We will verify your payment shortly.",
        "order": PaymentView::from(&order),
    })))
}
