#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use archalley::{
    api,
    config::Settings,
    domain::*,
    email::{EmailMessage, EmailSender},
    error::Result as AppResult,
    service::ServiceContext,
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use md5::{Digest, Md5};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const MERCHANT_ID: &str = "1211149";
pub const MERCHANT_SECRET: &str = "test-merchant-secret";

/// Collects every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub context: Arc<ServiceContext>,
    pub mailer: Arc<RecordingMailer>,
    pub router: Router,
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.server.base_url = "https://competitions.test".to_string();
    settings.payhere.merchant_id = MERCHANT_ID.to_string();
    settings.payhere.merchant_secret = MERCHANT_SECRET.to_string();
    settings.payhere.currency = "LKR".to_string();
    settings.email.deliver_inline = true;
    settings
}

pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    // A single long-lived connection keeps the in-memory database alive and
    // serializes concurrent writers the way SQLite would on disk.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// On-disk database shared by several connections, so writers really
/// contend for the lock.
pub async fn file_pool(max_connections: u32) -> anyhow::Result<(SqlitePool, PathBuf)> {
    let path = std::env::temp_dir().join(format!("archalley-test-{}.db", Uuid::new_v4()));
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok((pool, path))
}

pub async fn remove_database(pool: SqlitePool, path: &Path) {
    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

pub async fn spawn_app() -> anyhow::Result<TestApp> {
    spawn_app_with(test_settings()).await
}

pub async fn spawn_app_with(settings: Settings) -> anyhow::Result<TestApp> {
    spawn_app_on(test_pool().await?, settings).await
}

pub async fn spawn_app_on(pool: SqlitePool, settings: Settings) -> anyhow::Result<TestApp> {
    let mailer = Arc::new(RecordingMailer::default());
    let context = Arc::new(ServiceContext::new(pool.clone(), &settings, mailer.clone()));
    let router = api::create_app(context.clone(), Arc::new(settings));

    Ok(TestApp {
        pool,
        context,
        mailer,
        router,
    })
}

pub struct Entry {
    pub competition: Competition,
    pub registration_type: RegistrationType,
}

impl TestApp {
    pub async fn create_user(&self, email: &str, full_name: &str) -> anyhow::Result<User> {
        Ok(self
            .context
            .user_repo
            .create(CreateUserRequest {
                email: email.to_string(),
                full_name: full_name.to_string(),
            })
            .await?)
    }

    pub async fn create_entry(
        &self,
        slug: &str,
        title: &str,
        price_cents: i64,
        is_team: bool,
    ) -> anyhow::Result<Entry> {
        let competition = self
            .context
            .competition_repo
            .create(CreateCompetitionRequest {
                slug: slug.to_string(),
                title: title.to_string(),
                description: format!("{} brief", title),
                guidelines_url: Some(format!("https://archalley.test/{}/guidelines", slug)),
                registration_deadline: None,
            })
            .await?;

        let registration_type = self
            .context
            .competition_repo
            .create_registration_type(CreateRegistrationTypeRequest {
                competition_id: competition.id,
                name: if is_team { "Team" } else { "Individual" }.to_string(),
                slug: if is_team { "team" } else { "individual" }.to_string(),
                price_cents,
                currency: "LKR".to_string(),
                is_team,
                max_members: if is_team { 4 } else { 1 },
            })
            .await?;

        Ok(Entry {
            competition,
            registration_type,
        })
    }

    pub async fn add_to_cart(&self, user: &User, entry: &Entry) -> anyhow::Result<CartItem> {
        let request = if entry.registration_type.is_team {
            NewCartItem {
                competition_id: entry.competition.id,
                registration_type_id: entry.registration_type.id,
                participant_type: ParticipantType::Team,
                country: "Sri Lanka".to_string(),
                team_name: Some("Studio Laterite".to_string()),
                team_members: vec![
                    TeamMember { name: "Nimal Perera".to_string(), email: None },
                    TeamMember { name: "Ayesha Silva".to_string(), email: None },
                ],
            }
        } else {
            NewCartItem {
                competition_id: entry.competition.id,
                registration_type_id: entry.registration_type.id,
                participant_type: ParticipantType::Individual,
                country: "Sri Lanka".to_string(),
                team_name: None,
                team_members: Vec::new(),
            }
        };

        Ok(self.context.cart_service.add_item(user.id, request).await?)
    }

    /// A user with `items` entries in their cart and a PENDING payment for it.
    pub async fn pending_order(&self, order_id: &str, items: usize) -> anyhow::Result<(User, Payment)> {
        let user = self
            .create_user(&format!("{}@example.com", order_id.to_lowercase()), "Kasun Fernando")
            .await?;

        for i in 0..items {
            let entry = self
                .create_entry(
                    &format!("{}-competition-{}", order_id.to_lowercase(), i),
                    &format!("Competition {}", i + 1),
                    250000,
                    i % 2 == 1,
                )
                .await?;
            self.add_to_cart(&user, &entry).await?;
        }

        let session = self
            .context
            .checkout_service
            .begin_checkout(user.id, Some(order_id.to_string()))
            .await?;

        Ok((user, session.payment))
    }

    /// A PENDING payment inserted directly, bypassing checkout.
    pub async fn bare_payment(
        &self,
        user: &User,
        order_id: &str,
        metadata: Option<serde_json::Value>,
    ) -> anyhow::Result<Payment> {
        let now = Utc::now();
        Ok(self
            .context
            .payment_repo
            .create(Payment {
                id: Uuid::new_v4(),
                order_id: order_id.to_string(),
                user_id: user.id,
                amount_cents: 100000,
                currency: "LKR".to_string(),
                status: PaymentStatus::Pending,
                payment_method: PaymentMethod::PayHere,
                gateway_payment_id: None,
                gateway_method: None,
                status_message: None,
                signature: None,
                card_holder_name: None,
                card_no: None,
                metadata,
                gateway_response: None,
                failure_reason: None,
                completed_at: None,
                refunded_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?)
    }

    pub async fn payment(&self, order_id: &str) -> anyhow::Result<Payment> {
        self.context
            .payment_repo
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("payment {} missing", order_id))
    }

    pub async fn registration_count(&self, payment: &Payment) -> anyhow::Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM registrations WHERE payment_id = ?",
        )
        .bind(payment.id.to_string())
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn post_notification(&self, fields: &[(&str, String)]) -> anyhow::Result<Response<Body>> {
        Ok(self.router.clone().oneshot(notify_request(fields)?).await?)
    }

    pub async fn get(&self, uri: &str) -> anyhow::Result<Response<Body>> {
        Ok(self.router.clone().oneshot(get_request(uri)?).await?)
    }
}

pub fn notify_request(fields: &[(&str, String)]) -> anyhow::Result<Request<Body>> {
    let body = serde_urlencoded::to_string(fields)?;
    Ok(Request::builder()
        .method("POST")
        .uri("/api/payments/payhere/notify")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))?)
}

pub fn get_request(uri: &str) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder().uri(uri).body(Body::empty())?)
}

fn md5_upper(input: &str) -> String {
    hex::encode_upper(Md5::digest(input.as_bytes()))
}

pub fn sign(order_id: &str, amount: &str, currency: &str, status_code: &str) -> String {
    md5_upper(&format!(
        "{}{}{}{}{}{}",
        MERCHANT_ID,
        order_id,
        amount,
        currency,
        status_code,
        md5_upper(MERCHANT_SECRET)
    ))
}

/// A correctly signed notification for `payment`.
pub fn notification(payment: &Payment, status_code: &str) -> Vec<(&'static str, String)> {
    let amount = format!("{}.{:02}", payment.amount_cents / 100, payment.amount_cents % 100);
    let md5sig = sign(&payment.order_id, &amount, &payment.currency, status_code);

    vec![
        ("merchant_id", MERCHANT_ID.to_string()),
        ("order_id", payment.order_id.clone()),
        ("payment_id", "320025071278".to_string()),
        ("payhere_amount", amount),
        ("payhere_currency", payment.currency.clone()),
        ("status_code", status_code.to_string()),
        ("md5sig", md5sig),
        ("method", "VISA".to_string()),
        ("status_message", "Successfully completed the payment.".to_string()),
        ("card_holder_name", "K FERNANDO".to_string()),
        ("card_no", "************1292".to_string()),
    ]
}

pub async fn json_body(response: Response<Body>) -> anyhow::Result<serde_json::Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub async fn text_body(response: Response<Body>) -> anyhow::Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
