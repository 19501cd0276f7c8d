use anyhow::Context;
use plant_doctor::{config::Config, web, Backend};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(true).with_line_number(true))
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    if config.gateway.api_key.is_none() {
        tracing::error!(
            "AI_GATEWAY_API_KEY is not set; /analyze-plant will answer every request with 500"
        );
    }
    match &config.backend {
        Backend::Inference { url } => tracing::info!("Inference endpoint: {}", url),
        Backend::Proxy { url } => tracing::info!("Analysis proxy: {}", url),
    }

    let app = web::app(&config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("🚀 Server running on http://{}", config.bind_addr);
    tracing::info!("🌱 Open in your browser to diagnose a plant");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
