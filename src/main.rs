use bill_buddy::{
    config::{database, engine},
    core::{horizon, schedule},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load engine settings
    let app_config = engine::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        "Engine settings: horizon {} months, nearby window {} days",
        app_config.engine.horizon_months, app_config.engine.nearby_window_days
    );

    // 4. Connect and make sure the schema exists
    let database_url = database::get_database_url()?;
    if let Some(dir) = database::local_data_dir(&database_url) {
        std::fs::create_dir_all(dir)?;
    }
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Extend every active series to today's horizon
    let today = schedule::calendar_day(&chrono::Local::now());
    match horizon::refresh_horizons(&db, today, &app_config.engine).await? {
        Some(result) => info!(
            "Extended {} of {} series, {} new instances through {}",
            result.extended.len(),
            result.total_series_processed,
            result.total_created,
            result.horizon
        ),
        None => info!("Horizon already refreshed today ({})", today),
    }

    Ok(())
}
