//! Back-office handlers. Everything except login and logout sits behind
//! [`require_admin`].

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::session::{read_cookie, set_cookie};
use super::{json_body, query};
use crate::auth::ADMIN_COOKIE;
use crate::services::{OrderUpdate, ProductInput};
use crate::store::PageRequest;
use crate::{AppState, EcommerceError, Result};

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OrderQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    payment_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PageQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ReviewQuery {
    approved: Option<bool>,
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers.get(header::AUTHORIZATION)?.to_str().ok()?
        .strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

/// Accepts the token from the `admin_token` cookie or a bearer header.
pub(super) async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Result<Response> {
    let token = bearer(request.headers())
        .or_else(|| read_cookie(request.headers(), ADMIN_COOKIE))
        .ok_or(EcommerceError::Unauthorized)?;
    state.auth.verify(&token)?;
    Ok(next.run(request).await)
}

fn review_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| EcommerceError::not_found("Review"))
}

// ------------------------------------------------------------------ session

pub(super) async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let token = state.auth.login(&json_body(payload)?.password)?;
    let cookie = set_cookie(ADMIN_COOKIE, &token, state.auth.ttl_secs(), "Strict")
        .ok_or_else(|| EcommerceError::Storage("token is not a valid cookie value".into()))?;
    info!("Admin logged in");
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "success": true, "token": token }))))
}

pub(super) async fn logout() -> impl IntoResponse {
    let cleared = format!("{ADMIN_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    ([(header::SET_COOKIE, cleared)], Json(json!({ "success": true })))
}

// ------------------------------------------------------------------- orders

pub(super) async fn list_orders(
    State(state): State<AppState>,
    params: std::result::Result<Query<OrderQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let params = query(params)?;
    let page = state.orders.list(params.payment_status.as_deref(), PageRequest::new(params.page, params.per_page)).await?;
    Ok(Json(json!({ "success": true, "orders": page })))
}

pub(super) async fn get_order(State(state): State<AppState>, Path(number): Path<String>) -> Result<Json<Value>> {
    let order = state.orders.get(&number).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

pub(super) async fn update_order(
    State(state): State<AppState>,
    Path(number): Path<String>,
    payload: std::result::Result<Json<OrderUpdate>, JsonRejection>,
) -> Result<Json<Value>> {
    let order = state.orders.update(&number, json_body(payload)?).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

pub(super) async fn verify_order(State(state): State<AppState>, Path(number): Path<String>) -> Result<Json<Value>> {
    let order = state.orders.verify(&number).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

pub(super) async fn delete_order(State(state): State<AppState>, Path(number): Path<String>) -> Result<Json<Value>> {
    let order = state.orders.delete(&number).await?;
    Ok(Json(json!({ "success": true, "orderNumber": order.order_number() })))
}

// ----------------------------------------------------------------- products

pub(super) async fn list_products(
    State(state): State<AppState>,
    params: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let params = query(params)?;
    let page = state.catalog.list_all(PageRequest::new(params.page, params.per_page)).await?;
    Ok(Json(json!({ "success": true, "products": page })))
}

pub(super) async fn create_product(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let product = state.catalog.create(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "product": product }))))
}

pub(super) async fn update_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<Value>> {
    let product = state.catalog.update(&slug, json_body(payload)?).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

pub(super) async fn delete_product(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Value>> {
    let product = state.catalog.deactivate(&slug).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

// ------------------------------------------------------------------ reviews

pub(super) async fn list_reviews(
    State(state): State<AppState>,
    params: std::result::Result<Query<ReviewQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let reviews = state.catalog.reviews(query(params)?.approved).await?;
    Ok(Json(json!({ "success": true, "reviews": reviews })))
}

pub(super) async fn approve_review(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let review = state.catalog.approve_review(review_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "review": review })))
}

pub(super) async fn delete_review(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    state.catalog.delete_review(review_id(&id)?).await?;
    Ok(Json(json!({ "success": true })))
}

// -------------------------------------------------------------------- stats

pub(super) async fn stats(State(state): State<AppState>) -> Result<Json<Value>> {
    Ok(Json(json!({ "success": true, "stats": state.admin.stats().await? })))
}
