use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{CartRepository, PaymentRepository},
};

const MAX_NUMBER_ATTEMPTS: usize = 10;

#[derive(Debug)]
pub enum Materialization {
    Created {
        payment: Payment,
        registrations: Vec<Registration>,
    },
    /// Another confirmation already created the registrations for this payment.
    AlreadyMaterialized,
}

/// Turns a paid cart into confirmed registrations.
///
/// Everything is written in one transaction that starts by claiming the
/// payment's row in `payment_materializations`. Whichever confirmation
/// (webhook or return fallback) claims it first creates the registrations,
/// completes the payment and closes the cart; later attempts see the claim
/// and back out without writing.
pub struct RegistrationMaterializer {
    pool: SqlitePool,
    cart_repo: Arc<dyn CartRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
}

impl RegistrationMaterializer {
    pub fn new(
        pool: SqlitePool,
        cart_repo: Arc<dyn CartRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self {
            pool,
            cart_repo,
            payment_repo,
        }
    }

    pub async fn materialize(
        &self,
        payment: &Payment,
        metadata: &PaymentMetadata,
        confirmation: &GatewayConfirmation,
    ) -> Result<Materialization> {
        if metadata.item_ids.is_empty() {
            return Err(AppError::Validation(format!(
                "Payment {} references no cart items",
                payment.order_id
            )));
        }

        let cart = self
            .cart_repo
            .find_by_id(metadata.cart_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Cart {} not found", metadata.cart_id)))?;

        if cart.user_id != payment.user_id {
            return Err(AppError::Validation(format!(
                "Cart {} does not belong to the owner of order {}",
                cart.id, payment.order_id
            )));
        }

        let items = self
            .cart_repo
            .find_item_details(metadata.cart_id, &metadata.item_ids)
            .await?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let claim = sqlx::query(
            r#"
            INSERT INTO payment_materializations (payment_id, registration_count, materialized_at)
            VALUES (?, ?, ?)
            ON CONFLICT(payment_id) DO NOTHING
            "#,
        )
        .bind(payment.id.to_string())
        .bind(items.len() as i64)
        .bind(now.naive_utc())
        .execute(&mut *tx)
        .await?;

        if claim.rows_affected() == 0 {
            tx.rollback().await?;
            tracing::info!(
                order_id = %payment.order_id,
                "Registrations already materialized for payment; skipping"
            );
            return Ok(Materialization::AlreadyMaterialized);
        }

        let mut registrations = Vec::with_capacity(items.len());
        for details in &items {
            let registration_number = Self::allocate_registration_number(&mut tx, now).await?;
            let registration = Self::registration_for(payment, details, registration_number, now);
            Self::insert_registration(&mut tx, &registration).await?;
            registrations.push(registration);
        }

        let gateway_response = confirmation.raw_response.to_string();
        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'COMPLETED',
                completed_at = ?,
                gateway_payment_id = COALESCE(?, gateway_payment_id),
                gateway_method = COALESCE(?, gateway_method),
                status_message = COALESCE(?, status_message),
                signature = COALESCE(?, signature),
                card_holder_name = COALESCE(?, card_holder_name),
                card_no = COALESCE(?, card_no),
                gateway_response = ?,
                failure_reason = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now.naive_utc())
        .bind(&confirmation.gateway_payment_id)
        .bind(&confirmation.gateway_method)
        .bind(&confirmation.status_message)
        .bind(&confirmation.signature)
        .bind(&confirmation.card_holder_name)
        .bind(&confirmation.card_no)
        .bind(gateway_response)
        .bind(now.naive_utc())
        .bind(payment.id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE carts SET status = 'COMPLETED', updated_at = ? WHERE id = ?")
            .bind(now.naive_utc())
            .bind(metadata.cart_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %payment.order_id,
            registrations = registrations.len(),
            "Payment completed and registrations confirmed"
        );

        let payment = self
            .payment_repo
            .find_by_id(payment.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to reload completed payment".to_string()))?;

        Ok(Materialization::Created {
            payment,
            registrations,
        })
    }

    fn registration_for(
        payment: &Payment,
        details: &CartItemDetails,
        registration_number: String,
        now: DateTime<Utc>,
    ) -> Registration {
        let item = &details.item;
        Registration {
            id: Uuid::new_v4(),
            registration_number,
            user_id: payment.user_id,
            competition_id: details.competition.id,
            registration_type_id: details.registration_type.id,
            payment_id: payment.id,
            cart_item_id: item.id,
            participant_type: item.participant_type,
            country: item.country.clone(),
            team_name: item.team_name.clone(),
            team_members: item.team_members.clone(),
            amount_paid_cents: item.subtotal_cents,
            currency: payment.currency.clone(),
            status: RegistrationStatus::Confirmed,
            confirmed_at: Some(now),
            created_at: now,
        }
    }

    async fn allocate_registration_number(
        tx: &mut Transaction<'_, Sqlite>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let candidate = generate_registration_number(now);
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM registrations WHERE registration_number = ?",
            )
            .bind(&candidate)
            .fetch_one(&mut **tx)
            .await?;

            if taken == 0 {
                return Ok(candidate);
            }
            tracing::debug!("Registration number {} already taken, retrying", candidate);
        }

        Err(AppError::Internal(
            "Could not allocate a unique registration number".to_string(),
        ))
    }

    async fn insert_registration(
        tx: &mut Transaction<'_, Sqlite>,
        registration: &Registration,
    ) -> Result<()> {
        let team_members = serde_json::to_string(&registration.team_members)?;

        sqlx::query(
            r#"
            INSERT INTO registrations (
                id, registration_number, user_id, competition_id,
                registration_type_id, payment_id, cart_item_id,
                participant_type, country, team_name, team_members,
                amount_paid_cents, currency, status, confirmed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(registration.id.to_string())
        .bind(&registration.registration_number)
        .bind(registration.user_id.to_string())
        .bind(registration.competition_id.to_string())
        .bind(registration.registration_type_id.to_string())
        .bind(registration.payment_id.to_string())
        .bind(registration.cart_item_id.to_string())
        .bind(registration.participant_type.as_str())
        .bind(&registration.country)
        .bind(&registration.team_name)
        .bind(team_members)
        .bind(registration.amount_paid_cents)
        .bind(&registration.currency)
        .bind(registration.status.as_str())
        .bind(registration.confirmed_at.map(|dt| dt.naive_utc()))
        .bind(registration.created_at.naive_utc())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
