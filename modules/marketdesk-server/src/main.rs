use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use marketdesk_common::Config;
use marketdesk_news::fetchers::{AlphaVantageFetcher, EventRegistryFetcher, NewsFetcher};
use marketdesk_news::ingest::spawn_provider_loop;
use marketdesk_news::llm::EventLlm;
use marketdesk_news::pipeline::EnrichmentPipeline;
use marketdesk_news::repo::PgEventRepo;
use marketdesk_news::{Orchestrator, ProgressRelay};
use marketdesk_store::{MarketEventStore, PostStore, UserStore};
use sendgrid::{SendGridOptions, SendGridService};

mod auth;
mod envelope;
mod jwt;
mod rest;
mod routes;
mod ws;

use jwt::JwtService;
use ws::ConnectionRegistry;

pub struct AppState {
    pub config: Config,
    pub users: UserStore,
    pub events: MarketEventStore,
    pub posts: PostStore,
    pub jwt: JwtService,
    pub mailer: SendGridService,
    pub llm: EventLlm,
    pub orchestrator: Arc<Orchestrator>,
    pub registry: ConnectionRegistry,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("marketdesk=info".parse()?),
        )
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    marketdesk_store::migrate(&pool).await?;

    let agent = OpenAi::new(&config.openai_api_key, &config.openai_model);
    let llm = EventLlm::new(agent);

    let registry_fetcher: Arc<dyn NewsFetcher> = Arc::new(EventRegistryFetcher::new(
        &config.event_registry_base_url,
        &config.event_registry_api_key,
    ));
    let alpha_fetcher: Arc<dyn NewsFetcher> = Arc::new(AlphaVantageFetcher::new(
        &config.alphavantage_base_url,
        &config.alphavantage_api_key,
    ));

    let relay = ProgressRelay::default();
    let orchestrator = Arc::new(
        Orchestrator::new(
            EnrichmentPipeline::new(Arc::new(llm.clone())),
            Arc::new(PgEventRepo::new(pool.clone())),
            relay.clone(),
        )
        .with_search_fetcher(registry_fetcher.clone()),
    );

    // Provider ingest loops run for the life of the process
    let _ = spawn_provider_loop(
        orchestrator.clone(),
        alpha_fetcher,
        Duration::from_secs(config.alphavantage_interval_secs),
    );
    let _ = spawn_provider_loop(
        orchestrator.clone(),
        registry_fetcher,
        Duration::from_secs(config.event_registry_interval_secs),
    );

    // Live delivery
    let registry = ConnectionRegistry::default();
    ws::spawn_fanout(registry.clone(), relay);

    let state = Arc::new(AppState {
        users: UserStore::new(pool.clone()),
        events: MarketEventStore::new(pool.clone()),
        posts: PostStore::new(pool),
        jwt: JwtService::new(
            &config.jwt_secret,
            config.access_token_expire_minutes,
            config.reset_token_expiry_hours,
        ),
        mailer: SendGridService::new(SendGridOptions {
            api_key: config.sendgrid_api_key.clone(),
            from_email: config.from_email.clone(),
            verify_template_id: config.sendgrid_verify_template_id.clone(),
            reset_template_id: config.sendgrid_reset_template_id.clone(),
        }),
        llm,
        orchestrator,
        registry,
        config,
    });

    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = routes::build(state);

    info!("MarketDesk API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
