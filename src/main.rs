use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dorm_match::config::Settings;
use dorm_match::core::{CalibrationEngine, FeedbackRelay, MatchOrchestrator, RequestLedger};
use dorm_match::routes::{self, handle_json_payload_error, handle_path_error, handle_query_payload_error, AppState};
use dorm_match::services::{MemoryRepository, PostgresRepository, ProfileRepository, Scorer, ScorerClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str, format: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_logging(&settings.logging.level, &settings.logging.format);

    info!("Starting Dorm Match service...");

    let policy = settings
        .clamp_policy()
        .map_err(|e| startup_error("Invalid weight bounds", e))?;

    let repo: Arc<dyn ProfileRepository> = match &settings.database.url {
        Some(url) => {
            let postgres = PostgresRepository::from_settings(
                url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
                settings.database.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("PostgreSQL connection error", e))?;
            info!(
                "PostgreSQL repository initialized (max: {} connections)",
                settings.database.max_connections.unwrap_or(10)
            );
            Arc::new(postgres)
        }
        None => {
            warn!("No database configured, using the in-memory store");
            Arc::new(MemoryRepository::new())
        }
    };

    let scorer: Arc<dyn Scorer> = Arc::new(
        ScorerClient::new(
            settings.scorer.base_url.clone(),
            Duration::from_secs(settings.scorer.timeout_secs),
        )
        .map_err(|e| startup_error("Failed to build scorer client", e))?,
    );

    info!(
        "Scorer client initialized ({}, timeout {}s)",
        settings.scorer.base_url, settings.scorer.timeout_secs
    );

    let app_state = AppState {
        calibration: CalibrationEngine::new(repo.clone(), settings.calibration.importance, policy),
        feedback: FeedbackRelay::new(repo.clone(), scorer.clone(), policy, settings.scorer.feedback_eta),
        orchestrator: MatchOrchestrator::new(repo.clone(), scorer, policy),
        ledger: RequestLedger::new(repo.clone()),
        repo,
    };

    info!("Engines initialized with weight bounds [{}, {}]", policy.min(), policy.max());

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
