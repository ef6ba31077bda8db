use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Competition, RegistrationType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: CartStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    Active,
    Completed,
    Expired,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "ACTIVE",
            CartStatus::Completed => "COMPLETED",
            CartStatus::Expired => "EXPIRED",
            CartStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(CartStatus::Active),
            "COMPLETED" => Some(CartStatus::Completed),
            "EXPIRED" => Some(CartStatus::Expired),
            "ABANDONED" => Some(CartStatus::Abandoned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    Individual,
    Team,
}

impl ParticipantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantType::Individual => "INDIVIDUAL",
            ParticipantType::Team => "TEAM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INDIVIDUAL" => Some(ParticipantType::Individual),
            "TEAM" => Some(ParticipantType::Team),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub competition_id: Uuid,
    pub registration_type_id: Uuid,
    pub participant_type: ParticipantType,
    pub country: String,
    pub team_name: Option<String>,
    pub team_members: Vec<TeamMember>,
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// A line item joined with the reference data it points at.
#[derive(Debug, Clone)]
pub struct CartItemDetails {
    pub item: CartItem,
    pub competition: Competition,
    pub registration_type: RegistrationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCartItem {
    pub competition_id: Uuid,
    pub registration_type_id: Uuid,
    pub participant_type: ParticipantType,
    pub country: String,
    pub team_name: Option<String>,
    #[serde(default)]
    pub team_members: Vec<TeamMember>,
}
