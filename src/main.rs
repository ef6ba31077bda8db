use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use archalley::{
    api,
    config::Settings,
    email::{EmailSender, LogEmailSender, SmtpEmailSender},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "archalley=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().map_err(|e| {
        tracing::error!("Failed to load config: {}", e);
        e
    })?;

    if let Err(e) = settings.validate() {
        tracing::error!("Refusing to start: {}", e);
        return Err(e.into());
    }

    tracing::info!("Starting Archalley server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let mailer: Arc<dyn EmailSender> = if settings.email.enabled {
        match SmtpEmailSender::new(&settings.email) {
            Ok(sender) => {
                tracing::info!("SMTP email delivery enabled");
                Arc::new(sender)
            }
            Err(e) => {
                tracing::warn!("SMTP setup failed: {}. Emails will only be logged.", e);
                Arc::new(LogEmailSender)
            }
        }
    } else {
        tracing::info!("Email delivery disabled; messages will be logged");
        Arc::new(LogEmailSender)
    };

    if settings.payhere.sandbox {
        tracing::info!("PayHere running against the sandbox");
    }

    // Create service context
    let service_context = Arc::new(ServiceContext::new(db_pool, &settings, mailer));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
