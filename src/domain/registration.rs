use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ParticipantType, TeamMember};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub registration_number: String,
    pub user_id: Uuid,
    pub competition_id: Uuid,
    pub registration_type_id: Uuid,
    pub payment_id: Uuid,
    pub cart_item_id: Uuid,
    pub participant_type: ParticipantType,
    pub country: String,
    pub team_name: Option<String>,
    pub team_members: Vec<TeamMember>,
    pub amount_paid_cents: i64,
    pub currency: String,
    pub status: RegistrationStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "PENDING",
            RegistrationStatus::Confirmed => "CONFIRMED",
            RegistrationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(RegistrationStatus::Pending),
            "CONFIRMED" => Some(RegistrationStatus::Confirmed),
            "CANCELLED" => Some(RegistrationStatus::Cancelled),
            _ => None,
        }
    }
}

const REGISTRATION_NUMBER_PREFIX: &str = "ARC";
const REGISTRATION_NUMBER_SUFFIX_LEN: usize = 8;
const REGISTRATION_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Candidate registration number, e.g. `ARC-2026-7KQ2M9XD`. Uniqueness is
/// checked by the caller against stored registrations.
pub fn generate_registration_number(now: DateTime<Utc>) -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let suffix: String = (0..REGISTRATION_NUMBER_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..REGISTRATION_NUMBER_ALPHABET.len());
            REGISTRATION_NUMBER_ALPHABET[idx] as char
        })
        .collect();

    format!("{}-{}-{}", REGISTRATION_NUMBER_PREFIX, now.format("%Y"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_registration_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let number = generate_registration_number(now);

        assert!(number.starts_with("ARC-2026-"));
        let suffix = number.trim_start_matches("ARC-2026-");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.bytes().all(|b| REGISTRATION_NUMBER_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_registration_numbers_vary() {
        let now = Utc::now();
        let first = generate_registration_number(now);
        let second = generate_registration_number(now);
        assert_ne!(first, second);
    }
}
