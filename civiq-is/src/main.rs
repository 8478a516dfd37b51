//! civiq-is - Issue Service
//!
//! Citizen-facing service for the CIVIQ civic issue platform: issue
//! submission and tracking, the AI-assisted classification pipeline,
//! community voting and the public transparency aggregates.
//!
//! Default port: 5731

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use civiq_common::events::EventBus;
use civiq_is::AppState;

#[derive(Debug, Parser)]
#[command(name = "civiq-is", version, about = "CIVIQ Issue Service")]
struct Args {
    /// Data directory (overrides CIVIQ_ROOT_FOLDER and the TOML config)
    #[arg(long)]
    root_folder: Option<String>,

    /// Listen port
    #[arg(long, default_value_t = 5731)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting civiq-is (Issue Service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve and create the data folder
    let root_folder =
        civiq_common::config::resolve_root_folder(args.root_folder.as_deref(), "CIVIQ_ROOT_FOLDER");
    civiq_common::config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    let db_path = root_folder.join("civiq.db");
    info!("Database: {}", db_path.display());

    // Initialize database connection pool (creates tables, seeds departments)
    let db_pool = civiq_is::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Resolve the optional Gemini API key: Database -> ENV -> TOML
    let toml_config =
        civiq_common::config::load_toml_config(&civiq_common::config::default_config_path())
            .unwrap_or_default();
    let gemini_api_key = civiq_is::config::resolve_gemini_api_key(&db_pool, &toml_config).await?;
    match &gemini_api_key {
        Some(_) => info!("AI classification enabled"),
        None => info!("AI classification disabled (deterministic mode)"),
    }

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(100);

    let state = AppState::new(db_pool, event_bus, gemini_api_key);
    let app = civiq_is::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!("Listening on http://0.0.0.0:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
