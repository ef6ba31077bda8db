use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        Cart, CartItem, CartItemDetails, CartStatus, Competition, ParticipantType,
        RegistrationType, TeamMember,
    },
    error::{AppError, Result},
    repository::CartRepository,
};

#[derive(FromRow)]
struct CartRow {
    id: String,
    user_id: String,
    status: String,
    expires_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct CartItemRow {
    id: String,
    cart_id: String,
    competition_id: String,
    registration_type_id: String,
    participant_type: String,
    country: String,
    team_name: Option<String>,
    team_members: String,
    subtotal_cents: i64,
    created_at: NaiveDateTime,
}

/// Line item joined with its competition and registration type.
#[derive(FromRow)]
struct CartItemDetailsRow {
    #[sqlx(flatten)]
    item: CartItemRow,
    competition_slug: String,
    competition_title: String,
    competition_description: String,
    competition_guidelines_url: Option<String>,
    competition_registration_deadline: Option<NaiveDateTime>,
    competition_created_at: NaiveDateTime,
    type_name: String,
    type_slug: String,
    type_price_cents: i64,
    type_currency: String,
    type_is_team: i32,
    type_max_members: i32,
    type_created_at: NaiveDateTime,
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

pub struct SqliteCartRepository {
    pool: SqlitePool,
}

impl SqliteCartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_cart(row: CartRow) -> Result<Cart> {
        Ok(Cart {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            status: CartStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid cart status: {}", row.status)))?,
            expires_at: row.expires_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_item(row: CartItemRow) -> Result<CartItem> {
        let team_members: Vec<TeamMember> = serde_json::from_str(&row.team_members)
            .map_err(|e| AppError::Database(format!("Invalid team members JSON: {}", e)))?;

        Ok(CartItem {
            id: parse_uuid(&row.id)?,
            cart_id: parse_uuid(&row.cart_id)?,
            competition_id: parse_uuid(&row.competition_id)?,
            registration_type_id: parse_uuid(&row.registration_type_id)?,
            participant_type: ParticipantType::from_str(&row.participant_type).ok_or_else(|| {
                AppError::Database(format!("Invalid participant type: {}", row.participant_type))
            })?,
            country: row.country,
            team_name: row.team_name,
            team_members,
            subtotal_cents: row.subtotal_cents,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn row_to_details(row: CartItemDetailsRow) -> Result<CartItemDetails> {
        let item = Self::row_to_item(row.item)?;

        let competition = Competition {
            id: item.competition_id,
            slug: row.competition_slug,
            title: row.competition_title,
            description: row.competition_description,
            guidelines_url: row.competition_guidelines_url,
            registration_deadline: row
                .competition_registration_deadline
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.competition_created_at, Utc),
        };

        let registration_type = RegistrationType {
            id: item.registration_type_id,
            competition_id: item.competition_id,
            name: row.type_name,
            slug: row.type_slug,
            price_cents: row.type_price_cents,
            currency: row.type_currency,
            is_team: row.type_is_team != 0,
            max_members: row.type_max_members,
            created_at: DateTime::from_naive_utc_and_offset(row.type_created_at, Utc),
        };

        Ok(CartItemDetails {
            item,
            competition,
            registration_type,
        })
    }
}

#[async_trait]
impl CartRepository for SqliteCartRepository {
    async fn create(&self, user_id: Uuid, expires_at: Option<DateTime<Utc>>) -> Result<Cart> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, status, expires_at, created_at, updated_at)
            VALUES (?, ?, 'ACTIVE', ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(expires_at.map(|dt| dt.naive_utc()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("User already has an active cart".to_string())
            }
            other => AppError::Database(other.to_string()),
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created cart".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, status, expires_at, created_at, updated_at
            FROM carts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, status, expires_at, created_at, updated_at
            FROM carts
            WHERE user_id = ? AND status = 'ACTIVE'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn expire_stale(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET status = 'EXPIRED', updated_at = ?
            WHERE user_id = ?
              AND status = 'ACTIVE'
              AND expires_at IS NOT NULL
              AND expires_at < ?
            "#,
        )
        .bind(now.naive_utc())
        .bind(user_id.to_string())
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn update_status(&self, id: Uuid, status: CartStatus) -> Result<Cart> {
        sqlx::query("UPDATE carts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))
    }

    async fn add_item(&self, item: CartItem) -> Result<CartItem> {
        let team_members = serde_json::to_string(&item.team_members)?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (
                id, cart_id, competition_id, registration_type_id,
                participant_type, country, team_name, team_members,
                subtotal_cents, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.cart_id.to_string())
        .bind(item.competition_id.to_string())
        .bind(item.registration_type_id.to_string())
        .bind(item.participant_type.as_str())
        .bind(&item.country)
        .bind(&item.team_name)
        .bind(team_members)
        .bind(item.subtotal_cents)
        .bind(item.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(item)
    }

    async fn list_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r#"
            SELECT id, cart_id, competition_id, registration_type_id,
                   participant_type, country, team_name, team_members,
                   subtotal_cents, created_at
            FROM cart_items
            WHERE cart_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(cart_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn find_item_details(
        &self,
        cart_id: Uuid,
        item_ids: &[Uuid],
    ) -> Result<Vec<CartItemDetails>> {
        let cart_id_str = cart_id.to_string();
        let mut details = Vec::with_capacity(item_ids.len());

        for item_id in item_ids {
            let row = sqlx::query_as::<_, CartItemDetailsRow>(
                r#"
                SELECT ci.id, ci.cart_id, ci.competition_id, ci.registration_type_id,
                       ci.participant_type, ci.country, ci.team_name, ci.team_members,
                       ci.subtotal_cents, ci.created_at,
                       c.slug AS competition_slug,
                       c.title AS competition_title,
                       c.description AS competition_description,
                       c.guidelines_url AS competition_guidelines_url,
                       c.registration_deadline AS competition_registration_deadline,
                       c.created_at AS competition_created_at,
                       rt.name AS type_name,
                       rt.slug AS type_slug,
                       rt.price_cents AS type_price_cents,
                       rt.currency AS type_currency,
                       rt.is_team AS type_is_team,
                       rt.max_members AS type_max_members,
                       rt.created_at AS type_created_at
                FROM cart_items ci
                JOIN competitions c ON c.id = ci.competition_id
                JOIN registration_types rt ON rt.id = ci.registration_type_id
                WHERE ci.id = ? AND ci.cart_id = ?
                "#,
            )
            .bind(item_id.to_string())
            .bind(&cart_id_str)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

            match row {
                Some(row) => details.push(Self::row_to_details(row)?),
                None => {
                    return Err(AppError::Validation(format!(
                        "Cart item {} not found in cart {}",
                        item_id, cart_id
                    )))
                }
            }
        }

        Ok(details)
    }
}
