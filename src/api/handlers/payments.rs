use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    response::Redirect,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    domain::PaymentStatus,
    error::{AppError, Result},
    payments::{format_amount, PayHereNotification},
};

/// Server-to-server notification from PayHere.
pub async fn payhere_notify(
    State(state): State<AppState>,
    form: std::result::Result<Form<PayHereNotification>, FormRejection>,
) -> Result<Json<Value>> {
    let Form(notification) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;

    tracing::info!(
        order_id = %notification.order_id,
        status_code = %notification.status_code,
        "Received PayHere notification"
    );

    let outcome = state
        .service_context
        .payment_service
        .handle_notification(notification)
        .await?;

    tracing::debug!("Notification outcome: {:?}", outcome);

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ReturnParams {
    pub order_id: Option<String>,
}

/// Browser redirect back from the hosted checkout.
pub async fn payhere_return(
    State(state): State<AppState>,
    Query(params): Query<ReturnParams>,
) -> Redirect {
    let Some(order_id) = params
        .order_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
    else {
        return error_redirect("Missing order reference");
    };

    match state.service_context.payment_service.handle_return(&order_id).await {
        Ok(payment) => {
            let page = match payment.status {
                PaymentStatus::Completed => "success",
                PaymentStatus::Pending | PaymentStatus::Processing => "processing",
                PaymentStatus::Failed | PaymentStatus::Cancelled | PaymentStatus::Refunded => {
                    "failed"
                }
            };
            Redirect::to(&format!(
                "/competitions/payment/{}/{}",
                page,
                urlencoding::encode(&payment.order_id)
            ))
        }
        Err(AppError::NotFound(_)) => error_redirect("Payment not found"),
        Err(e) => {
            tracing::error!(%order_id, "Payment return failed: {:?}", e);
            error_redirect("We could not verify your payment")
        }
    }
}

fn error_redirect(message: &str) -> Redirect {
    Redirect::to(&format!(
        "/competitions/payment/error?message={}",
        urlencoding::encode(message)
    ))
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub order_id: String,
    pub status: PaymentStatus,
    pub amount: String,
    pub currency: String,
    pub registrations: Vec<String>,
}

pub async fn status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>> {
    let payments = &state.service_context.payment_service;
    let payment = payments.find_by_order_id(&order_id).await?;
    let registrations = payments.registrations_for(&payment).await?;

    Ok(Json(PaymentStatusResponse {
        order_id: payment.order_id,
        status: payment.status,
        amount: format_amount(payment.amount_cents),
        currency: payment.currency,
        registrations: registrations
            .into_iter()
            .map(|r| r.registration_number)
            .collect(),
    }))
}
