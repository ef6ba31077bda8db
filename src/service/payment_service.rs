use std::sync::Arc;

use crate::{
    domain::*,
    error::{AppError, Result},
    payments::{parse_amount, GatewayStatus, PayHereClient, PayHereNotification},
    repository::{PaymentRepository, RegistrationRepository},
    service::{
        notification_service::NotificationDispatcher,
        registration_service::{Materialization, RegistrationMaterializer},
    },
};

/// What a processed gateway notification did to the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Completed { registrations: usize },
    AlreadyCompleted,
    Cancelled,
    Failed,
    Refunded,
    Ignored,
}

pub struct PaymentService {
    payment_repo: Arc<dyn PaymentRepository>,
    registration_repo: Arc<dyn RegistrationRepository>,
    payhere: Arc<PayHereClient>,
    materializer: Arc<RegistrationMaterializer>,
    notifier: NotificationDispatcher,
    return_fallback_enabled: bool,
}

impl PaymentService {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        registration_repo: Arc<dyn RegistrationRepository>,
        payhere: Arc<PayHereClient>,
        materializer: Arc<RegistrationMaterializer>,
        notifier: NotificationDispatcher,
        return_fallback_enabled: bool,
    ) -> Self {
        Self {
            payment_repo,
            registration_repo,
            payhere,
            materializer,
            notifier,
            return_fallback_enabled,
        }
    }

    pub async fn find_by_order_id(&self, order_id: &str) -> Result<Payment> {
        self.payment_repo
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }

    pub async fn registrations_for(&self, payment: &Payment) -> Result<Vec<Registration>> {
        self.registration_repo.find_by_payment(payment.id).await
    }

    /// Handle the gateway's server-to-server notification. The signature is
    /// the only thing that authorizes a state change here.
    pub async fn handle_notification(
        &self,
        notification: PayHereNotification,
    ) -> Result<NotificationOutcome> {
        let payment = self.find_by_order_id(&notification.order_id).await?;

        if !self.payhere.verify_notification(&notification) {
            if payment.is_settled() {
                tracing::warn!(
                    order_id = %payment.order_id,
                    "Invalid signature on notification for settled payment; leaving it untouched"
                );
            } else {
                self.payment_repo
                    .record_failure(
                        payment.id,
                        PaymentStatus::Failed,
                        "Invalid payment signature",
                        notification.status_message.as_deref(),
                    )
                    .await?;
            }
            return Err(AppError::InvalidSignature(format!(
                "Signature mismatch for order {}",
                notification.order_id
            )));
        }

        if let Some(declared) = parse_amount(&notification.payhere_amount) {
            if declared != payment.amount_cents || notification.payhere_currency != payment.currency {
                tracing::warn!(
                    order_id = %payment.order_id,
                    declared_amount = %notification.payhere_amount,
                    declared_currency = %notification.payhere_currency,
                    expected_cents = payment.amount_cents,
                    "Gateway amount differs from the stored payment"
                );
            }
        }

        match notification.status() {
            GatewayStatus::Success => self.complete_from_notification(payment, &notification).await,
            GatewayStatus::Cancelled => {
                self.close_unsuccessful(payment, PaymentStatus::Cancelled, &notification)
                    .await
            }
            GatewayStatus::Failed => {
                self.close_unsuccessful(payment, PaymentStatus::Failed, &notification)
                    .await
            }
            GatewayStatus::ChargedBack => {
                self.payment_repo
                    .update_status(payment.id, PaymentStatus::Refunded)
                    .await?;
                tracing::warn!(order_id = %payment.order_id, "Payment charged back");
                Ok(NotificationOutcome::Refunded)
            }
            GatewayStatus::Pending => {
                tracing::info!(order_id = %payment.order_id, "Gateway reports payment pending");
                Ok(NotificationOutcome::Ignored)
            }
            GatewayStatus::Unknown(code) => {
                tracing::warn!(
                    order_id = %payment.order_id,
                    "Unhandled gateway status code: {}",
                    code
                );
                Ok(NotificationOutcome::Ignored)
            }
        }
    }

    async fn complete_from_notification(
        &self,
        payment: Payment,
        notification: &PayHereNotification,
    ) -> Result<NotificationOutcome> {
        if payment.status == PaymentStatus::Completed {
            tracing::info!(order_id = %payment.order_id, "Payment already completed");
            return Ok(NotificationOutcome::AlreadyCompleted);
        }

        let metadata = payment.cart_metadata().ok_or_else(|| {
            AppError::Payment(format!(
                "Payment {} has no cart reference in its metadata",
                payment.order_id
            ))
        })?;

        match self
            .materializer
            .materialize(&payment, &metadata, &notification.confirmation())
            .await
            // Any failure here must surface as a 5xx so the gateway retries
            .map_err(|e| {
                AppError::Payment(format!(
                    "Failed to confirm registrations for order {}: {}",
                    payment.order_id, e
                ))
            })?
        {
            Materialization::Created {
                payment,
                registrations,
            } => {
                let count = registrations.len();
                self.notifier.dispatch(payment, registrations).await;
                Ok(NotificationOutcome::Completed {
                    registrations: count,
                })
            }
            Materialization::AlreadyMaterialized => Ok(NotificationOutcome::AlreadyCompleted),
        }
    }

    async fn close_unsuccessful(
        &self,
        payment: Payment,
        status: PaymentStatus,
        notification: &PayHereNotification,
    ) -> Result<NotificationOutcome> {
        if payment.is_settled() {
            tracing::warn!(
                order_id = %payment.order_id,
                "Ignoring {} notification for settled payment",
                status.as_str()
            );
            return Ok(NotificationOutcome::Ignored);
        }

        let reason = notification
            .status_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(match status {
                PaymentStatus::Cancelled => "Payment cancelled by customer",
                _ => "Payment declined by gateway",
            });

        self.payment_repo
            .record_failure(payment.id, status, reason, notification.status_message.as_deref())
            .await?;

        tracing::info!(order_id = %payment.order_id, "Payment marked {}", status.as_str());

        Ok(match status {
            PaymentStatus::Cancelled => NotificationOutcome::Cancelled,
            _ => NotificationOutcome::Failed,
        })
    }

    /// Browser return after checkout. Only the order id comes from the
    /// request; everything else is read from the stored payment. When the
    /// payment is still pending the notification is assumed lost and the
    /// registrations are created here instead.
    pub async fn handle_return(&self, order_id: &str) -> Result<Payment> {
        let payment = self.find_by_order_id(order_id).await?;

        if payment.status == PaymentStatus::Pending
            && payment.payment_method == PaymentMethod::PayHere
            && self.return_fallback_enabled
        {
            tracing::warn!(
                order_id = %payment.order_id,
                "Payment still pending on return; assuming notification was not delivered"
            );
            if let Err(e) = self.reconcile_pending(&payment).await {
                tracing::error!(
                    order_id = %payment.order_id,
                    "Return fallback failed: {:?}",
                    e
                );
            }
        }

        self.find_by_order_id(order_id).await
    }

    async fn reconcile_pending(&self, payment: &Payment) -> Result<()> {
        let existing = self.registration_repo.count_by_payment(payment.id).await?;
        if existing > 0 {
            tracing::info!(
                order_id = %payment.order_id,
                existing,
                "Registrations already exist; marking payment completed"
            );
            self.payment_repo
                .update_status(payment.id, PaymentStatus::Completed)
                .await?;
            return Ok(());
        }

        let Some(metadata) = payment.cart_metadata() else {
            tracing::debug!(
                order_id = %payment.order_id,
                "No cart reference on payment; nothing to reconcile"
            );
            return Ok(());
        };

        let confirmation = GatewayConfirmation::return_fallback(&payment.order_id);
        match self
            .materializer
            .materialize(payment, &metadata, &confirmation)
            .await?
        {
            Materialization::Created {
                payment,
                registrations,
            } => {
                self.notifier.dispatch(payment, registrations).await;
            }
            Materialization::AlreadyMaterialized => {}
        }

        Ok(())
    }
}
