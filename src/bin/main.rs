use business_plan_orchestrator::{
    agent::Orchestrator,
    api::start_server,
    extractor::GeminiExtractor,
    generation::GeminiClient,
    search::{NoopSearch, SearchProvider, TavilySearch},
    session::InMemorySessionStore,
    specialist::SpecialistGenerator,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 See .env.example for setup instructions");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 Business Plan Orchestrator - API Server");
    info!("📍 Port: {}", api_port);

    // Create capability adapters (shared by all sessions)
    let generator = Arc::new(GeminiClient::new(gemini_api_key));

    let search: Arc<dyn SearchProvider> = match TavilySearch::from_env() {
        Some(tavily) => {
            info!("Search capability: tavily");
            Arc::new(tavily)
        }
        None => {
            warn!("TAVILY_API_KEY not set - specialists will run without live search");
            Arc::new(NoopSearch)
        }
    };

    // Create orchestrator
    let extractor = Arc::new(GeminiExtractor::new(generator.clone()));
    let specialists = Arc::new(SpecialistGenerator::new(generator, search));
    let sessions = Arc::new(InMemorySessionStore::new());

    let orchestrator = Arc::new(Orchestrator::new(extractor, specialists, sessions));

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    // Start API server
    start_server(orchestrator, api_port).await?;

    Ok(())
}
