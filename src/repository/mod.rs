use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod user_repository;
pub mod competition_repository;
pub mod cart_repository;
pub mod payment_repository;
pub mod registration_repository;

pub use user_repository::SqliteUserRepository;
pub use competition_repository::SqliteCompetitionRepository;
pub use cart_repository::SqliteCartRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use registration_repository::SqliteRegistrationRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait CompetitionRepository: Send + Sync {
    async fn create(&self, competition: CreateCompetitionRequest) -> Result<Competition>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Competition>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Competition>>;
    async fn create_registration_type(&self, request: CreateRegistrationTypeRequest) -> Result<RegistrationType>;
    async fn find_registration_type(&self, id: Uuid) -> Result<Option<RegistrationType>>;
    async fn list_registration_types(&self, competition_id: Uuid) -> Result<Vec<RegistrationType>>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn create(&self, user_id: Uuid, expires_at: Option<DateTime<Utc>>) -> Result<Cart>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Cart>>;
    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<Cart>>;
    async fn expire_stale(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<u64>;
    async fn update_status(&self, id: Uuid, status: CartStatus) -> Result<Cart>;
    async fn add_item(&self, item: CartItem) -> Result<CartItem>;
    async fn list_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>>;
    async fn find_item_details(&self, cart_id: Uuid, item_ids: &[Uuid]) -> Result<Vec<CartItemDetails>>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<Payment>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>>;
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>>;
    async fn update_status(&self, id: Uuid, status: PaymentStatus) -> Result<Payment>;
    async fn record_failure(
        &self,
        id: Uuid,
        status: PaymentStatus,
        reason: &str,
        status_message: Option<&str>,
    ) -> Result<Payment>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn find_by_payment(&self, payment_id: Uuid) -> Result<Vec<Registration>>;
    async fn find_by_number(&self, registration_number: &str) -> Result<Option<Registration>>;
    async fn count_by_payment(&self, payment_id: Uuid) -> Result<i64>;
}
