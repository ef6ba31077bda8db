use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{ParticipantType, Registration, RegistrationStatus, TeamMember},
    error::{AppError, Result},
    repository::RegistrationRepository,
};

#[derive(FromRow)]
struct RegistrationRow {
    id: String,
    registration_number: String,
    user_id: String,
    competition_id: String,
    registration_type_id: String,
    payment_id: String,
    cart_item_id: String,
    participant_type: String,
    country: String,
    team_name: Option<String>,
    team_members: String,
    amount_paid_cents: i64,
    currency: String,
    status: String,
    confirmed_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

pub struct SqliteRegistrationRepository {
    pool: SqlitePool,
}

impl SqliteRegistrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_registration(row: RegistrationRow) -> Result<Registration> {
        let parse = |s: &str| Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()));
        let team_members: Vec<TeamMember> = serde_json::from_str(&row.team_members)
            .map_err(|e| AppError::Database(format!("Invalid team members JSON: {}", e)))?;

        Ok(Registration {
            id: parse(&row.id)?,
            registration_number: row.registration_number,
            user_id: parse(&row.user_id)?,
            competition_id: parse(&row.competition_id)?,
            registration_type_id: parse(&row.registration_type_id)?,
            payment_id: parse(&row.payment_id)?,
            cart_item_id: parse(&row.cart_item_id)?,
            participant_type: ParticipantType::from_str(&row.participant_type).ok_or_else(|| {
                AppError::Database(format!("Invalid participant type: {}", row.participant_type))
            })?,
            country: row.country,
            team_name: row.team_name,
            team_members,
            amount_paid_cents: row.amount_paid_cents,
            currency: row.currency,
            status: RegistrationStatus::from_str(&row.status).ok_or_else(|| {
                AppError::Database(format!("Invalid registration status: {}", row.status))
            })?,
            confirmed_at: row.confirmed_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl RegistrationRepository for SqliteRegistrationRepository {
    async fn find_by_payment(&self, payment_id: Uuid) -> Result<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(
            r#"
            SELECT id, registration_number, user_id, competition_id,
                   registration_type_id, payment_id, cart_item_id,
                   participant_type, country, team_name, team_members,
                   amount_paid_cents, currency, status, confirmed_at, created_at
            FROM registrations
            WHERE payment_id = ?
            ORDER BY created_at, registration_number
            "#,
        )
        .bind(payment_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_registration).collect()
    }

    async fn find_by_number(&self, registration_number: &str) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            r#"
            SELECT id, registration_number, user_id, competition_id,
                   registration_type_id, payment_id, cart_item_id,
                   participant_type, country, team_name, team_members,
                   amount_paid_cents, currency, status, confirmed_at, created_at
            FROM registrations
            WHERE registration_number = ?
            "#,
        )
        .bind(registration_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_registration).transpose()
    }

    async fn count_by_payment(&self, payment_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM registrations WHERE payment_id = ?"
        )
        .bind(payment_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }
}
