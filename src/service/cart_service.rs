use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::CartConfig,
    domain::*,
    error::{AppError, Result},
    repository::{CartRepository, CompetitionRepository},
};

pub struct CartService {
    cart_repo: Arc<dyn CartRepository>,
    competition_repo: Arc<dyn CompetitionRepository>,
    config: CartConfig,
}

impl CartService {
    pub fn new(
        cart_repo: Arc<dyn CartRepository>,
        competition_repo: Arc<dyn CompetitionRepository>,
        config: CartConfig,
    ) -> Self {
        Self {
            cart_repo,
            competition_repo,
            config,
        }
    }

    /// The user's current ACTIVE cart, created on demand. Carts past their
    /// expiry are closed first when expiry is enabled.
    pub async fn get_or_create_active(&self, user_id: Uuid) -> Result<Cart> {
        let now = Utc::now();

        if self.config.expiry_enabled {
            let expired = self.cart_repo.expire_stale(user_id, now).await?;
            if expired > 0 {
                tracing::debug!(%user_id, expired, "Expired stale carts");
            }
        }

        if let Some(cart) = self.cart_repo.find_active_for_user(user_id).await? {
            return Ok(cart);
        }

        let expires_at = self
            .config
            .expiry_enabled
            .then(|| now + Duration::minutes(self.config.ttl_minutes));

        self.cart_repo.create(user_id, expires_at).await
    }

    pub async fn add_item(&self, user_id: Uuid, request: NewCartItem) -> Result<CartItem> {
        let competition = self
            .competition_repo
            .find_by_id(request.competition_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Competition not found".to_string()))?;

        if !competition.is_open(Utc::now()) {
            return Err(AppError::Validation(format!(
                "Registration for {} has closed",
                competition.title
            )));
        }

        let registration_type = self
            .competition_repo
            .find_registration_type(request.registration_type_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration type not found".to_string()))?;

        if registration_type.competition_id != competition.id {
            return Err(AppError::Validation(
                "Registration type does not belong to this competition".to_string(),
            ));
        }

        validate_participants(&request, &registration_type)?;

        let cart = self.get_or_create_active(user_id).await?;

        let item = CartItem {
            id: Uuid::new_v4(),
            cart_id: cart.id,
            competition_id: competition.id,
            registration_type_id: registration_type.id,
            participant_type: request.participant_type,
            country: request.country.trim().to_string(),
            team_name: request
                .team_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            team_members: request.team_members,
            subtotal_cents: registration_type.price_cents,
            created_at: Utc::now(),
        };

        self.cart_repo.add_item(item).await
    }

    pub async fn items(&self, cart_id: Uuid) -> Result<Vec<CartItem>> {
        self.cart_repo.list_items(cart_id).await
    }
}

fn validate_participants(request: &NewCartItem, registration_type: &RegistrationType) -> Result<()> {
    if request.country.trim().is_empty() {
        return Err(AppError::Validation("Country is required".to_string()));
    }

    match request.participant_type {
        ParticipantType::Individual => {
            if registration_type.is_team {
                return Err(AppError::Validation(format!(
                    "{} is a team registration",
                    registration_type.name
                )));
            }
        }
        ParticipantType::Team => {
            if !registration_type.is_team {
                return Err(AppError::Validation(format!(
                    "{} is not a team registration",
                    registration_type.name
                )));
            }

            let has_name = request
                .team_name
                .as_deref()
                .map(|name| !name.trim().is_empty())
                .unwrap_or(false);
            if !has_name {
                return Err(AppError::Validation("Team name is required".to_string()));
            }

            let members = request.team_members.len();
            if members == 0 || members > registration_type.max_members.max(1) as usize {
                return Err(AppError::Validation(format!(
                    "Team must have between 1 and {} members",
                    registration_type.max_members
                )));
            }

            if request.team_members.iter().any(|m| m.name.trim().is_empty()) {
                return Err(AppError::Validation("Every team member needs a name".to_string()));
            }
        }
    }

    Ok(())
}
