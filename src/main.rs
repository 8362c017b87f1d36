//! # Document Insights Server Driver
//!
//! ## Purpose
//! Main entry point for the document insights dashboard server. Loads
//! configuration, opens the store, and starts the web server for handling
//! aggregation and search term requests.
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Open the SQLite store and run migrations
//! 4. Start the web API server
//! 5. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use document_insights::{
    aggregate::Aggregator,
    api::ApiServer,
    config::Config,
    errors::{DashboardError, Result},
    store::Store,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("document-insights-server")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Document Intelligence Team")
        .about("Document mentions dashboard with date-bucketed search term aggregation")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .help("SQLite database path"),
        )
        .arg(
            Arg::new("seed-demo")
                .long("seed-demo")
                .help("Insert demo documents and terms for local development")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Open the store, run health checks, and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if let Some(db) = matches.get_one::<String>("db") {
        config.database.db_path = PathBuf::from(db);
    }

    let config = Arc::new(config);

    init_logging(&config)?;

    info!("Starting Document Insights v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", config_path);

    let app_state = initialize_components(config.clone())?;

    if matches.get_flag("check-health") {
        app_state.store.health_check()?;
        info!("All health checks passed!");
        return Ok(());
    }

    if matches.get_flag("seed-demo") {
        seed_demo_data(&app_state)?;
    }

    let server = ApiServer::new(app_state.clone());
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    info!(
        "Document Insights started successfully on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = server_handle => {
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Document Insights shut down successfully");

    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config
            .logging
            .level
            .parse()
            .map_err(|_| DashboardError::Config {
                message: format!("Invalid log level: {}", config.logging.level),
            })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .json()
                    .with_filter(filter),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_filter(filter),
            )
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
    Ok(())
}

/// Initialize all application components
fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("Initializing application components...");

    let store = Arc::new(Store::open(config.database.db_path.clone())?);
    store.health_check()?;

    let aggregator = Arc::new(Aggregator::new(store.clone(), config.query.clone()));

    info!("All components initialized successfully");
    Ok(AppState {
        config,
        store,
        aggregator,
    })
}

/// Insert a small demo dataset for local development
fn seed_demo_data(app_state: &AppState) -> Result<()> {
    use chrono::NaiveDate;

    info!("Seeding demo documents and terms...");

    let documents = [
        (
            "Q1 internal audit",
            "The internal audit covered supplier onboarding and complaint handling.",
            NaiveDate::from_ymd_opt(2024, 1, 5),
            "customers/acme/documents to search/quality",
            "sites/quality/q1-audit.pdf",
        ),
        (
            "Field action summary",
            "Recall scope confirmed; audit trail attached for the affected lots.",
            NaiveDate::from_ymd_opt(2024, 2, 19),
            "customers/acme/documents to search/field-actions",
            "sites/field/summary.pdf",
        ),
        (
            "Supplier complaint log",
            "Two complaints escalated; no recall required after review.",
            NaiveDate::from_ymd_opt(2024, 3, 10),
            "customers/zenith/documents to search/complaints",
            "sites/complaints/log-march.xlsx",
        ),
    ];

    for (title, text, doc_date, folder, link) in documents {
        let doc_date = doc_date.ok_or_else(|| DashboardError::Internal {
            message: "invalid demo document date".to_string(),
        })?;
        app_state
            .store
            .insert_document(title, text, doc_date, folder, link)?;
    }

    for (term, category) in [("audit", Some("quality")), ("recall", Some("field actions"))] {
        match app_state.store.create_term(term, category) {
            Ok(_) => {}
            // keep the seeder re-runnable against an existing database
            Err(DashboardError::Validation { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    info!("Demo data seeded");
    Ok(())
}
