use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    domain::{Payment, PaymentStatus},
    error::AppError,
    payments::format_amount,
    web::templates::{
        HtmlTemplate, PaymentErrorTemplate, PaymentFailedTemplate, PaymentProcessingTemplate,
        PaymentSuccessTemplate,
    },
};

const PROCESSING_REFRESH_SECONDS: u32 = 5;

async fn load_payment(state: &AppState, order_id: &str) -> Result<Payment, Response> {
    match state.service_context.payment_service.find_by_order_id(order_id).await {
        Ok(payment) => Ok(payment),
        Err(AppError::NotFound(_)) => Err(error_response("Payment not found")),
        Err(e) => {
            tracing::error!(%order_id, "Failed to load payment for result page: {:?}", e);
            Err(error_response("We could not load your payment"))
        }
    }
}

fn page_redirect(page: &str, order_id: &str) -> Response {
    Redirect::to(&format!(
        "/competitions/payment/{}/{}",
        page,
        urlencoding::encode(order_id)
    ))
    .into_response()
}

fn error_response(message: &str) -> Response {
    HtmlTemplate(PaymentErrorTemplate {
        message: message.to_string(),
    })
    .into_response()
}

pub async fn success_page(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Response {
    let payment = match load_payment(&state, &order_id).await {
        Ok(payment) => payment,
        Err(response) => return response,
    };

    match payment.status {
        PaymentStatus::Completed => {}
        PaymentStatus::Pending | PaymentStatus::Processing => {
            return page_redirect("processing", &payment.order_id)
        }
        _ => return page_redirect("failed", &payment.order_id),
    }

    let registration_numbers = match state
        .service_context
        .payment_service
        .registrations_for(&payment)
        .await
    {
        Ok(registrations) => registrations
            .into_iter()
            .map(|r| r.registration_number)
            .collect(),
        Err(e) => {
            tracing::warn!(order_id = %payment.order_id, "Failed to load registrations: {:?}", e);
            Vec::new()
        }
    };

    HtmlTemplate(PaymentSuccessTemplate {
        amount: format_amount(payment.amount_cents),
        currency: payment.currency,
        order_id: payment.order_id,
        registration_numbers,
    })
    .into_response()
}

pub async fn processing_page(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Response {
    let payment = match load_payment(&state, &order_id).await {
        Ok(payment) => payment,
        Err(response) => return response,
    };

    match payment.status {
        PaymentStatus::Completed => page_redirect("success", &payment.order_id),
        PaymentStatus::Pending | PaymentStatus::Processing => {
            HtmlTemplate(PaymentProcessingTemplate {
                refresh_url: format!(
                    "/api/payments/payhere/return?order_id={}",
                    urlencoding::encode(&payment.order_id)
                ),
                order_id: payment.order_id,
                refresh_seconds: PROCESSING_REFRESH_SECONDS,
            })
            .into_response()
        }
        _ => page_redirect("failed", &payment.order_id),
    }
}

pub async fn failed_page(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Response {
    let payment = match load_payment(&state, &order_id).await {
        Ok(payment) => payment,
        Err(response) => return response,
    };

    // Also the gateway's cancel target, so a PENDING payment renders here.
    if payment.status == PaymentStatus::Completed {
        return page_redirect("success", &payment.order_id);
    }

    HtmlTemplate(PaymentFailedTemplate {
        order_id: payment.order_id,
        reason: payment.failure_reason,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct ErrorParams {
    pub message: Option<String>,
}

pub async fn error_page(Query(params): Query<ErrorParams>) -> Response {
    let message = params
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "An unexpected error occurred while processing your payment".to_string());

    error_response(&message)
}
