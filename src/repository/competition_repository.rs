use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        Competition, CreateCompetitionRequest, CreateRegistrationTypeRequest, RegistrationType,
    },
    error::{AppError, Result},
    repository::CompetitionRepository,
};

#[derive(FromRow)]
struct CompetitionRow {
    id: String,
    slug: String,
    title: String,
    description: String,
    guidelines_url: Option<String>,
    registration_deadline: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct RegistrationTypeRow {
    id: String,
    competition_id: String,
    name: String,
    slug: String,
    price_cents: i64,
    currency: String,
    is_team: i32,
    max_members: i32,
    created_at: NaiveDateTime,
}

pub struct SqliteCompetitionRepository {
    pool: SqlitePool,
}

impl SqliteCompetitionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_competition(row: CompetitionRow) -> Result<Competition> {
        Ok(Competition {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            slug: row.slug,
            title: row.title,
            description: row.description,
            guidelines_url: row.guidelines_url,
            registration_deadline: row
                .registration_deadline
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn row_to_registration_type(row: RegistrationTypeRow) -> Result<RegistrationType> {
        Ok(RegistrationType {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            competition_id: Uuid::parse_str(&row.competition_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            slug: row.slug,
            price_cents: row.price_cents,
            currency: row.currency,
            is_team: row.is_team != 0,
            max_members: row.max_members,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl CompetitionRepository for SqliteCompetitionRepository {
    async fn create(&self, request: CreateCompetitionRequest) -> Result<Competition> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO competitions (
                id, slug, title, description, guidelines_url,
                registration_deadline, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&request.slug)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.guidelines_url)
        .bind(request.registration_deadline.map(|dt| dt.naive_utc()))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created competition".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Competition>> {
        let row = sqlx::query_as::<_, CompetitionRow>(
            r#"
            SELECT id, slug, title, description, guidelines_url,
                   registration_deadline, created_at
            FROM competitions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_competition).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Competition>> {
        let row = sqlx::query_as::<_, CompetitionRow>(
            r#"
            SELECT id, slug, title, description, guidelines_url,
                   registration_deadline, created_at
            FROM competitions
            WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_competition).transpose()
    }

    async fn create_registration_type(
        &self,
        request: CreateRegistrationTypeRequest,
    ) -> Result<RegistrationType> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO registration_types (
                id, competition_id, name, slug, price_cents, currency,
                is_team, max_members, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(request.competition_id.to_string())
        .bind(&request.name)
        .bind(&request.slug)
        .bind(request.price_cents)
        .bind(&request.currency)
        .bind(request.is_team as i32)
        .bind(request.max_members)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_registration_type(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created registration type".to_string())
        })
    }

    async fn find_registration_type(&self, id: Uuid) -> Result<Option<RegistrationType>> {
        let row = sqlx::query_as::<_, RegistrationTypeRow>(
            r#"
            SELECT id, competition_id, name, slug, price_cents, currency,
                   is_team, max_members, created_at
            FROM registration_types
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_registration_type).transpose()
    }

    async fn list_registration_types(&self, competition_id: Uuid) -> Result<Vec<RegistrationType>> {
        let rows = sqlx::query_as::<_, RegistrationTypeRow>(
            r#"
            SELECT id, competition_id, name, slug, price_cents, currency,
                   is_team, max_members, created_at
            FROM registration_types
            WHERE competition_id = ?
            ORDER BY price_cents, name
            "#,
        )
        .bind(competition_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_registration_type).collect()
    }
}
