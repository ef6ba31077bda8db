pub mod cart_service;
pub mod checkout_service;
pub mod notification_service;
pub mod payment_service;
pub mod registration_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::config::Settings;
use crate::email::EmailSender;
use crate::payments::PayHereClient;
use crate::repository::*;
use cart_service::CartService;
use checkout_service::CheckoutService;
use notification_service::NotificationDispatcher;
use payment_service::PaymentService;
use registration_service::RegistrationMaterializer;

pub use checkout_service::CheckoutSession;
pub use payment_service::NotificationOutcome;
pub use registration_service::Materialization;

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub competition_repo: Arc<dyn CompetitionRepository>,
    pub cart_repo: Arc<dyn CartRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub registration_repo: Arc<dyn RegistrationRepository>,
    pub payhere: Arc<PayHereClient>,
    pub materializer: Arc<RegistrationMaterializer>,
    pub notifier: NotificationDispatcher,
    pub payment_service: Arc<PaymentService>,
    pub checkout_service: Arc<CheckoutService>,
    pub cart_service: Arc<CartService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings, mailer: Arc<dyn EmailSender>) -> Self {
        // Repositories
        let user_repo: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let competition_repo: Arc<dyn CompetitionRepository> =
            Arc::new(SqliteCompetitionRepository::new(db_pool.clone()));
        let cart_repo: Arc<dyn CartRepository> =
            Arc::new(SqliteCartRepository::new(db_pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> =
            Arc::new(SqlitePaymentRepository::new(db_pool.clone()));
        let registration_repo: Arc<dyn RegistrationRepository> =
            Arc::new(SqliteRegistrationRepository::new(db_pool.clone()));

        let payhere = Arc::new(PayHereClient::new(&settings.payhere));

        let materializer = Arc::new(RegistrationMaterializer::new(
            db_pool.clone(),
            cart_repo.clone(),
            payment_repo.clone(),
        ));

        let notifier = NotificationDispatcher::new(
            mailer,
            user_repo.clone(),
            competition_repo.clone(),
            settings.email.deliver_inline,
        );

        let payment_service = Arc::new(PaymentService::new(
            payment_repo.clone(),
            registration_repo.clone(),
            payhere.clone(),
            materializer.clone(),
            notifier.clone(),
            settings.payhere.return_fallback_enabled,
        ));

        let checkout_service = Arc::new(CheckoutService::new(
            cart_repo.clone(),
            payment_repo.clone(),
            user_repo.clone(),
            payhere.clone(),
            settings.server.base_url.clone(),
        ));

        let cart_service = Arc::new(CartService::new(
            cart_repo.clone(),
            competition_repo.clone(),
            settings.cart.clone(),
        ));

        Self {
            user_repo,
            competition_repo,
            cart_repo,
            payment_repo,
            registration_repo,
            payhere,
            materializer,
            notifier,
            payment_service,
            checkout_service,
            cart_service,
            db_pool,
        }
    }
}
