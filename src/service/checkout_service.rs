use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    payments::{format_amount, CheckoutForm, PayHereClient},
    repository::{CartRepository, PaymentRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub payment: Payment,
    pub form: CheckoutForm,
}

/// Opens a PENDING payment for the user's active cart and prepares the
/// hosted checkout form that goes with it.
pub struct CheckoutService {
    cart_repo: Arc<dyn CartRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    user_repo: Arc<dyn UserRepository>,
    payhere: Arc<PayHereClient>,
    base_url: String,
}

impl CheckoutService {
    pub fn new(
        cart_repo: Arc<dyn CartRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        user_repo: Arc<dyn UserRepository>,
        payhere: Arc<PayHereClient>,
        base_url: String,
    ) -> Self {
        Self {
            cart_repo,
            payment_repo,
            user_repo,
            payhere,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn begin_checkout(
        &self,
        user_id: Uuid,
        order_id: Option<String>,
    ) -> Result<CheckoutSession> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let cart = self
            .cart_repo
            .find_active_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::Validation("No active cart to check out".to_string()))?;

        let items = self.cart_repo.list_items(cart.id).await?;
        if items.is_empty() {
            return Err(AppError::Validation("Cart is empty".to_string()));
        }

        let item_ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        let details = self.cart_repo.find_item_details(cart.id, &item_ids).await?;

        let currency = details[0].registration_type.currency.clone();
        if details.iter().any(|d| d.registration_type.currency != currency) {
            return Err(AppError::Validation(
                "Cart mixes registration types priced in different currencies".to_string(),
            ));
        }

        let amount_cents: i64 = items.iter().map(|item| item.subtotal_cents).sum();
        if amount_cents <= 0 {
            return Err(AppError::Validation("Cart total must be positive".to_string()));
        }

        let metadata = PaymentMetadata {
            cart_id: cart.id,
            item_ids,
        };
        let order_id = order_id.unwrap_or_else(generate_order_id);
        let now = Utc::now();

        let payment = self
            .payment_repo
            .create(Payment {
                id: Uuid::new_v4(),
                order_id: order_id.clone(),
                user_id,
                amount_cents,
                currency: currency.clone(),
                status: PaymentStatus::Pending,
                payment_method: PaymentMethod::PayHere,
                gateway_payment_id: None,
                gateway_method: None,
                status_message: None,
                signature: None,
                card_holder_name: None,
                card_no: None,
                metadata: Some(metadata.to_value()),
                gateway_response: None,
                failure_reason: None,
                completed_at: None,
                refunded_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(
            %order_id,
            %user_id,
            amount_cents,
            items = details.len(),
            "Created pending payment for checkout"
        );

        let amount = format_amount(amount_cents);
        let items_label = details
            .iter()
            .map(|d| format!("{} ({})", d.competition.title, d.registration_type.name))
            .collect::<Vec<_>>()
            .join(", ");

        let form = CheckoutForm {
            action_url: self.payhere.checkout_url().to_string(),
            merchant_id: self.payhere.merchant_id().to_string(),
            return_url: format!(
                "{}/api/payments/payhere/return?order_id={}",
                self.base_url,
                urlencoding::encode(&order_id)
            ),
            cancel_url: format!(
                "{}/competitions/payment/failed/{}",
                self.base_url,
                urlencoding::encode(&order_id)
            ),
            notify_url: format!("{}/api/payments/payhere/notify", self.base_url),
            hash: self.payhere.checkout_hash(&order_id, &amount, &currency),
            order_id,
            items: items_label,
            currency,
            amount,
            first_name: user.first_name().to_string(),
            last_name: user.last_name(),
            email: user.email.clone(),
        };

        Ok(CheckoutSession { payment, form })
    }
}

fn generate_order_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("ARC{}{:04}", Utc::now().format("%y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_order_ids() {
        let order_id = generate_order_id();
        assert!(order_id.starts_with("ARC"));
        assert_eq!(order_id.len(), 3 + 12 + 4);
        assert!(order_id[3..].bytes().all(|b| b.is_ascii_digit()));
    }
}
