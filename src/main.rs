use std::error::Error;

use ai_llm_service::telemetry;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env when present.
    dotenvy::dotenv().ok();

    let pipeline_level = std::env::var("PIPELINE_LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("info", pipeline_level))
        .with(telemetry::layer())
        .init();

    api::start().await?;

    Ok(())
}
