use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{
    config::PayHereConfig,
    domain::GatewayConfirmation,
};

const LIVE_CHECKOUT_URL: &str = "https://www.payhere.lk/pay/checkout";
const SANDBOX_CHECKOUT_URL: &str = "https://sandbox.payhere.lk/pay/checkout";

/// Server-to-server payment notification, posted form-encoded to the
/// notify URL. Absent fields decode as empty strings so a short payload
/// still reaches signature verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PayHereNotification {
    pub merchant_id: String,
    pub order_id: String,
    pub payhere_amount: String,
    pub payhere_currency: String,
    pub status_code: String,
    pub md5sig: String,
    pub method: Option<String>,
    pub status_message: Option<String>,
    pub payment_id: Option<String>,
    pub card_holder_name: Option<String>,
    pub card_no: Option<String>,
    pub card_expiry: Option<String>,
}

impl PayHereNotification {
    pub fn status(&self) -> GatewayStatus {
        GatewayStatus::from_code(&self.status_code)
    }

    pub fn confirmation(&self) -> GatewayConfirmation {
        GatewayConfirmation {
            gateway_payment_id: non_empty(&self.payment_id),
            gateway_method: non_empty(&self.method),
            status_message: non_empty(&self.status_message),
            signature: Some(self.md5sig.clone()),
            card_holder_name: non_empty(&self.card_holder_name),
            card_no: non_empty(&self.card_no),
            raw_response: serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    Success,
    Pending,
    Cancelled,
    Failed,
    ChargedBack,
    Unknown(String),
}

impl GatewayStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "2" => GatewayStatus::Success,
            "0" => GatewayStatus::Pending,
            "-1" => GatewayStatus::Cancelled,
            "-2" => GatewayStatus::Failed,
            "-3" => GatewayStatus::ChargedBack,
            other => GatewayStatus::Unknown(other.to_string()),
        }
    }
}

/// Fields posted to the hosted checkout page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub action_url: String,
    pub merchant_id: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    pub order_id: String,
    pub items: String,
    pub currency: String,
    pub amount: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub hash: String,
}

pub struct PayHereClient {
    merchant_id: String,
    merchant_secret: String,
    sandbox: bool,
}

impl PayHereClient {
    pub fn new(config: &PayHereConfig) -> Self {
        Self {
            merchant_id: config.merchant_id.clone(),
            merchant_secret: config.merchant_secret.clone(),
            sandbox: config.sandbox,
        }
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn checkout_url(&self) -> &'static str {
        if self.sandbox {
            SANDBOX_CHECKOUT_URL
        } else {
            LIVE_CHECKOUT_URL
        }
    }

    fn hashed_secret(&self) -> String {
        md5_upper(&self.merchant_secret)
    }

    /// Expected `md5sig` for a notification:
    /// `UPPER(MD5(merchant_id + order_id + amount + currency + status_code + UPPER(MD5(secret))))`.
    pub fn notification_signature(
        &self,
        merchant_id: &str,
        order_id: &str,
        amount: &str,
        currency: &str,
        status_code: &str,
    ) -> String {
        md5_upper(&format!(
            "{}{}{}{}{}{}",
            merchant_id,
            order_id,
            amount,
            currency,
            status_code,
            self.hashed_secret()
        ))
    }

    pub fn verify_notification(&self, notification: &PayHereNotification) -> bool {
        let expected = self.notification_signature(
            &notification.merchant_id,
            &notification.order_id,
            &notification.payhere_amount,
            &notification.payhere_currency,
            &notification.status_code,
        );
        let provided = notification.md5sig.trim().to_uppercase();

        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }

    /// Hash sent with the checkout form:
    /// `UPPER(MD5(merchant_id + order_id + amount + currency + UPPER(MD5(secret))))`.
    pub fn checkout_hash(&self, order_id: &str, amount: &str, currency: &str) -> String {
        md5_upper(&format!(
            "{}{}{}{}{}",
            self.merchant_id,
            order_id,
            amount,
            currency,
            self.hashed_secret()
        ))
    }
}

fn md5_upper(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode_upper(hasher.finalize())
}

/// Gateway amount format: two decimals, no grouping (`1500.00`).
pub fn format_amount(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a gateway amount back into cents. `None` for anything that is not
/// a plain decimal with at most two fractional digits.
pub fn parse_amount(amount: &str) -> Option<i64> {
    let amount = amount.trim();
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    if whole.is_empty() || fraction.len() > 2 {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(fraction)
}
