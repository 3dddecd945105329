use fluxgate::{
    config::Config,
    logger::{self, LoggerConfig},
    server::{self, AppState},
    storage,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before reading any configuration
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = Config::from_env()?;
    logger::init_with_config(LoggerConfig::for_environment(config.environment))?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let init_only = std::env::args().nth(1).as_deref() == Some("init-db");
    if init_only && !config.use_psql {
        log::warn!("⚠️  init-db requested but USE_PSQL is not true, nothing to initialize");
        return Ok(());
    }

    log::info!("🔄 Connecting to image storage...");
    let store = match storage::connect(&config).await {
        Ok(store) => {
            log::info!("✅ Image storage ready");
            store
        }
        Err(e) => {
            log::error!("❌ Failed to initialize image storage: {}", e);
            return Err(e.into());
        }
    };

    if init_only {
        log::info!("✅ Database initialized successfully");
        store.close().await;
        return Ok(());
    }

    logger::log_startup_info(&config);
    logger::log_config_info(&config);

    server::run(AppState::new(config, store)).await?;
    Ok(())
}
