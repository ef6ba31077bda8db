use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competition {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub guidelines_url: Option<String>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Competition {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.registration_deadline
            .map(|deadline| now <= deadline)
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationType {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub name: String,
    pub slug: String,
    pub price_cents: i64,
    pub currency: String,
    pub is_team: bool,
    pub max_members: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompetitionRequest {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub guidelines_url: Option<String>,
    pub registration_deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRegistrationTypeRequest {
    pub competition_id: Uuid,
    pub name: String,
    pub slug: String,
    pub price_cents: i64,
    pub currency: String,
    pub is_team: bool,
    pub max_members: i32,
}
