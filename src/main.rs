//! Meal Board watcher
//!
//! Mounts the meal list against the configured database and prints it every
//! time the collection changes.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meal_board::config::Config;
use meal_board::errors::AppError;
use meal_board::store::{CollectionPath, RestStore};
use meal_board::view::{render_list, ListScreen};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Meal Board");

    let Some(database_url) = config.database_url.clone() else {
        return Err(AppError::Config("MEALS_DATABASE_URL is not set".to_string()).into());
    };
    tracing::info!("Database: {}", database_url);
    tracing::info!("Collection: {}", config.collection);
    tracing::info!("Key strategy: {}", config.key_strategy.as_str());

    let path = CollectionPath::parse(&config.collection)?;
    let store = Arc::new(
        RestStore::new(database_url, config.reconnect_delay).with_idle_timeout(config.idle_timeout),
    );
    let mut screen = ListScreen::mount(store, &path, config.date_format.clone())?;

    loop {
        tokio::select! {
            changed = screen.changed() => {
                let meals = changed?;
                println!("{}\n", render_list(&meals));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
