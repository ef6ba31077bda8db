use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: String,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub gateway_payment_id: Option<String>,
    pub gateway_method: Option<String>,
    pub status_message: Option<String>,
    pub signature: Option<String>,
    pub card_holder_name: Option<String>,
    pub card_no: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub gateway_response: Option<serde_json::Value>,
    pub failure_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Cart reference stored at checkout. `None` when the metadata is
    /// missing or does not have the `{cartId, itemIds}` shape.
    pub fn cart_metadata(&self) -> Option<PaymentMetadata> {
        self.metadata
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, PaymentStatus::Completed | PaymentStatus::Refunded)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(PaymentStatus::Pending),
            "PROCESSING" => Some(PaymentStatus::Processing),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[serde(rename = "PAYHERE")]
    PayHere,
    BankTransfer,
    Manual,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::PayHere => "PAYHERE",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Manual => "MANUAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PAYHERE" => Some(PaymentMethod::PayHere),
            "BANK_TRANSFER" => Some(PaymentMethod::BankTransfer),
            "MANUAL" => Some(PaymentMethod::Manual),
            _ => None,
        }
    }
}

/// Shape of `Payment.metadata` written by checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentMetadata {
    #[serde(rename = "cartId")]
    pub cart_id: Uuid,
    #[serde(rename = "itemIds")]
    pub item_ids: Vec<Uuid>,
}

impl PaymentMetadata {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "cartId": self.cart_id,
            "itemIds": self.item_ids,
        })
    }
}

/// Gateway-side details recorded on the payment once it is confirmed.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfirmation {
    pub gateway_payment_id: Option<String>,
    pub gateway_method: Option<String>,
    pub status_message: Option<String>,
    pub signature: Option<String>,
    pub card_holder_name: Option<String>,
    pub card_no: Option<String>,
    pub raw_response: serde_json::Value,
}

impl GatewayConfirmation {
    /// Confirmation used when the browser return path completes a payment
    /// whose notification never arrived.
    pub fn return_fallback(order_id: &str) -> Self {
        Self {
            status_message: Some("Completed via return fallback".to_string()),
            raw_response: serde_json::json!({
                "source": "return_fallback",
                "order_id": order_id,
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_with_metadata(metadata: Option<serde_json::Value>) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            order_id: "ORDER1".to_string(),
            user_id: Uuid::new_v4(),
            amount_cents: 150000,
            currency: "LKR".to_string(),
            status: PaymentStatus::Pending,
            payment_method: PaymentMethod::PayHere,
            gateway_payment_id: None,
            gateway_method: None,
            status_message: None,
            signature: None,
            card_holder_name: None,
            card_no: None,
            metadata,
            gateway_response: None,
            failure_reason: None,
            completed_at: None,
            refunded_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_metadata_parses_camel_case() {
        let cart_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();
        let payment = payment_with_metadata(Some(serde_json::json!({
            "cartId": cart_id.to_string(),
            "itemIds": [item_id.to_string()],
        })));

        let metadata = payment.cart_metadata().expect("metadata should parse");
        assert_eq!(metadata.cart_id, cart_id);
        assert_eq!(metadata.item_ids, vec![item_id]);
    }

    #[test]
    fn test_cart_metadata_missing_or_malformed() {
        assert!(payment_with_metadata(None).cart_metadata().is_none());
        assert!(payment_with_metadata(Some(serde_json::json!({"cartId": "nope"})))
            .cart_metadata()
            .is_none());
        assert!(payment_with_metadata(Some(serde_json::json!("just a string")))
            .cart_metadata()
            .is_none());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(PaymentStatus::Completed.as_str(), "COMPLETED");
        assert_eq!(PaymentStatus::from_str("cancelled"), Some(PaymentStatus::Cancelled));
        assert_eq!(PaymentStatus::from_str("settled"), None);
        assert_eq!(PaymentMethod::from_str("PAYHERE"), Some(PaymentMethod::PayHere));
    }
}
