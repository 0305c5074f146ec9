use axum::{
    extract::{rejection::{FormRejection, JsonRejection}, Query, State},
    response::Redirect,
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::session::SessionId;
use super::{form, json_body};
use crate::services::{ItnOutcome, SignedFields};
use crate::{AppState, EcommerceError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InitiateRequest {
    order_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ReturnParams {
    result: Option<String>,
    order: Option<String>,
}

pub(super) async fn initiate(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    payload: std::result::Result<Json<InitiateRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let number = json_body(payload)?.order_number.filter(|n| !n.is_empty())
        .ok_or_else(|| EcommerceError::validation("Order number is required"))?;
    let payment = state.payfast.initiate(&number, &session.0).await?;
    Ok(Json(json!({ "success": true, "payment": payment })))
}

/// ITN endpoint. Fields are kept in received order for signature checking.
pub(super) async fn notify(
    State(state): State<AppState>,
    payload: std::result::Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Json<Value>> {
    let outcome = state.payfast.handle_notification(SignedFields(form(payload)?)).await?;
    info!(?outcome, "PayFast notification processed");
    Ok(Json(json!({ "success": true, "applied": matches!(outcome, ItnOutcome::Applied(_)) })))
}

pub(super) async fn return_redirect(State(state): State<AppState>, Query(params): Query<ReturnParams>) -> Redirect {
    Redirect::to(&state.payfast.return_redirect(params.result.as_deref(), params.order.as_deref()))
}
