use db_readiness::{config::Config, DatabaseService, ReadinessCoordinator, SqliteDatabaseService};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let service: Arc<dyn DatabaseService> = Arc::new(SqliteDatabaseService::new(
        config.database_path.clone(),
        config.store_definitions(),
        config.init_timeout,
    ));
    let coordinator = ReadinessCoordinator::new(service, config.readiness);

    let outcome = coordinator.initialize_once().await;
    tracing::info!("Startup finished: {:?}", outcome);

    match serde_json::to_string_pretty(&coordinator.snapshot()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render state: {}", e),
    }

    if !outcome.is_ready() {
        std::process::exit(1);
    }
}
