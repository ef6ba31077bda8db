use std::sync::Arc;

use archalley::{
    config::Settings,
    domain::{
        CreateCompetitionRequest, CreateRegistrationTypeRequest, CreateUserRequest, NewCartItem,
        ParticipantType, TeamMember,
    },
    email::LogEmailSender,
    repository::CompetitionRepository,
    service::ServiceContext,
};
use chrono::{Duration, Utc};
use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;

/// Seed a development database with competitions and a checkout ready to pay.
#[derive(Parser, Debug)]
#[command(name = "seed")]
struct Args {
    /// Database to seed
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://archalley.db?mode=rwc")]
    database_url: String,

    /// Order id for the demo checkout; generated when omitted
    #[arg(long)]
    order_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let settings = Settings::new().unwrap_or_default();
    if let Err(e) = settings.validate() {
        println!("⚠️  {}. The printed checkout hash will not verify.", e);
    }

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    // Run migrations first
    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let context = ServiceContext::new(db_pool, &settings, Arc::new(LogEmailSender));

    println!("👤 Creating demo user...");
    let user = match context.user_repo.find_by_email("entrant@archalley.local").await? {
        Some(user) => user,
        None => {
            context
                .user_repo
                .create(CreateUserRequest {
                    email: "entrant@archalley.local".to_string(),
                    full_name: "Nimal Perera".to_string(),
                })
                .await?
        }
    };
    println!("  ✅ {} <{}>", user.full_name, user.email);

    println!("🏛️  Creating competitions...");
    let tiny_house = match context.competition_repo.find_by_slug("tiny-house-2026").await? {
        Some(competition) => competition,
        None => {
            context
                .competition_repo
                .create(CreateCompetitionRequest {
                    slug: "tiny-house-2026".to_string(),
                    title: "Tiny House Challenge 2026".to_string(),
                    description: "Design a livable home under 40 square metres.".to_string(),
                    guidelines_url: Some("https://archalley.com/competitions/tiny-house-2026/guidelines".to_string()),
                    registration_deadline: Some(Utc::now() + Duration::days(60)),
                })
                .await?
        }
    };

    let pavilion = match context.competition_repo.find_by_slug("urban-pavilion-2026").await? {
        Some(competition) => competition,
        None => {
            context
                .competition_repo
                .create(CreateCompetitionRequest {
                    slug: "urban-pavilion-2026".to_string(),
                    title: "Urban Pavilion 2026".to_string(),
                    description: "A temporary pavilion for a public square in Colombo.".to_string(),
                    guidelines_url: None,
                    registration_deadline: Some(Utc::now() + Duration::days(90)),
                })
                .await?
        }
    };
    println!("  ✅ {} and {}", tiny_house.title, pavilion.title);

    println!("🎟️  Creating registration types...");
    let individual = registration_type(&*context.competition_repo, tiny_house.id, "Individual", 250000, false, 1).await?;
    let team = registration_type(&*context.competition_repo, pavilion.id, "Team", 500000, true, 4).await?;
    println!("  ✅ {} / {}", individual.name, team.name);

    println!("🛒 Filling cart...");
    context
        .cart_service
        .add_item(
            user.id,
            NewCartItem {
                competition_id: tiny_house.id,
                registration_type_id: individual.id,
                participant_type: ParticipantType::Individual,
                country: "Sri Lanka".to_string(),
                team_name: None,
                team_members: Vec::new(),
            },
        )
        .await?;
    context
        .cart_service
        .add_item(
            user.id,
            NewCartItem {
                competition_id: pavilion.id,
                registration_type_id: team.id,
                participant_type: ParticipantType::Team,
                country: "Sri Lanka".to_string(),
                team_name: Some("Studio Laterite".to_string()),
                team_members: vec![
                    TeamMember { name: "Nimal Perera".to_string(), email: None },
                    TeamMember { name: "Ayesha Silva".to_string(), email: Some("ayesha@example.com".to_string()) },
                ],
            },
        )
        .await?;
    println!("  ✅ 2 entries added");

    println!("💳 Starting checkout...");
    let session = context
        .checkout_service
        .begin_checkout(user.id, args.order_id)
        .await?;

    println!("\n✨ Database seeding complete!");
    println!("\n📝 Checkout form for order {}:", session.payment.order_id);
    println!("{}", serde_json::to_string_pretty(&session.form)?);
    println!("\n📮 Form body:");
    println!("{}", serde_urlencoded::to_string(&session.form)?);

    Ok(())
}

async fn registration_type(
    repo: &dyn CompetitionRepository,
    competition_id: uuid::Uuid,
    name: &str,
    price_cents: i64,
    is_team: bool,
    max_members: i32,
) -> anyhow::Result<archalley::domain::RegistrationType> {
    let slug = name.to_lowercase();
    let existing = repo.list_registration_types(competition_id).await?;
    if let Some(found) = existing.into_iter().find(|t| t.slug == slug) {
        return Ok(found);
    }

    Ok(repo
        .create_registration_type(CreateRegistrationTypeRequest {
            competition_id,
            name: name.to_string(),
            slug,
            price_cents,
            currency: "LKR".to_string(),
            is_team,
            max_members,
        })
        .await?)
}
