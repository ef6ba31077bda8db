use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::{Payment, PaymentStatus, PaymentMethod},
    error::{AppError, Result},
    repository::PaymentRepository,
};

const PAYMENT_COLUMNS: &str = r#"
    id, order_id, user_id, amount_cents, currency, status, payment_method,
    gateway_payment_id, gateway_method, status_message, signature,
    card_holder_name, card_no, metadata, gateway_response, failure_reason,
    completed_at, refunded_at, created_at, updated_at
"#;

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    order_id: String,
    user_id: String,
    amount_cents: i64,
    currency: String,
    status: String,
    payment_method: String,
    gateway_payment_id: Option<String>,
    gateway_method: Option<String>,
    status_message: Option<String>,
    signature: Option<String>,
    card_holder_name: Option<String>,
    card_no: Option<String>,
    metadata: Option<String>,
    gateway_response: Option<String>,
    failure_reason: Option<String>,
    completed_at: Option<NaiveDateTime>,
    refunded_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        Ok(Payment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            order_id: row.order_id,
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
            amount_cents: row.amount_cents,
            currency: row.currency,
            status: PaymentStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid payment status: {}", row.status)))?,
            payment_method: PaymentMethod::from_str(&row.payment_method)
                .ok_or_else(|| AppError::Database(format!("Invalid payment method: {}", row.payment_method)))?,
            gateway_payment_id: row.gateway_payment_id,
            gateway_method: row.gateway_method,
            status_message: row.status_message,
            signature: row.signature,
            card_holder_name: row.card_holder_name,
            card_no: row.card_no,
            // Unparseable JSON is kept out of the domain type rather than failing the read
            metadata: row.metadata.and_then(|raw| serde_json::from_str(&raw).ok()),
            gateway_response: row.gateway_response.and_then(|raw| serde_json::from_str(&raw).ok()),
            failure_reason: row.failure_reason,
            completed_at: row.completed_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            refunded_at: row.refunded_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    async fn fetch_updated(&self, id: Uuid) -> Result<Payment> {
        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated payment".to_string())
        })
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment> {
        let now = Utc::now().naive_utc();
        let metadata = payment.metadata.as_ref().map(|m| m.to_string());
        let gateway_response = payment.gateway_response.as_ref().map(|r| r.to_string());

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, user_id, amount_cents, currency, status,
                payment_method, gateway_payment_id, gateway_method,
                status_message, signature, card_holder_name, card_no,
                metadata, gateway_response, failure_reason,
                completed_at, refunded_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(payment.id.to_string())
        .bind(&payment.order_id)
        .bind(payment.user_id.to_string())
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.payment_method.as_str())
        .bind(&payment.gateway_payment_id)
        .bind(&payment.gateway_method)
        .bind(&payment.status_message)
        .bind(&payment.signature)
        .bind(&payment.card_holder_name)
        .bind(&payment.card_no)
        .bind(metadata)
        .bind(gateway_response)
        .bind(&payment.failure_reason)
        .bind(payment.completed_at.map(|dt| dt.naive_utc()))
        .bind(payment.refunded_at.map(|dt| dt.naive_utc()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Order {} already exists", payment.order_id))
            }
            other => AppError::Database(other.to_string()),
        })?;

        self.find_by_id(payment.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            &format!("SELECT {} FROM payments WHERE id = ?", PAYMENT_COLUMNS)
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            &format!("SELECT {} FROM payments WHERE order_id = ?", PAYMENT_COLUMNS)
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            &format!(
                "SELECT {} FROM payments WHERE user_id = ? ORDER BY created_at DESC",
                PAYMENT_COLUMNS
            )
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_payment)
            .collect()
    }

    async fn update_status(&self, id: Uuid, status: PaymentStatus) -> Result<Payment> {
        let now = Utc::now().naive_utc();

        // Completion and refund each stamp their own timestamp
        let completed_at = (status == PaymentStatus::Completed).then_some(now);
        let refunded_at = (status == PaymentStatus::Refunded).then_some(now);

        sqlx::query(
            r#"
            UPDATE payments
            SET status = ?,
                completed_at = COALESCE(?, completed_at),
                refunded_at = COALESCE(?, refunded_at),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(status.as_str())
        .bind(completed_at)
        .bind(refunded_at)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.fetch_updated(id).await
    }

    async fn record_failure(
        &self,
        id: Uuid,
        status: PaymentStatus,
        reason: &str,
        status_message: Option<&str>,
    ) -> Result<Payment> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE payments
            SET status = ?,
                failure_reason = ?,
                status_message = COALESCE(?, status_message),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(status.as_str())
        .bind(reason)
        .bind(status_message)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.fetch_updated(id).await
    }
}
