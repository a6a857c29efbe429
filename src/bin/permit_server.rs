use anyhow::Context;
use clap::Parser;
use ev_permit::clients::google::DEFAULT_GEOCODE_URL;
use ev_permit::clients::openai::models::OpenAIModel;
use ev_permit::clients::openai::DEFAULT_CHAT_URL;
use ev_permit::clients::{GeocoderConfig, GoogleGeocoder, OpenAIClient, OpenAIConfig};
use ev_permit::config::{KeyFromEnv, ServerConfig, DEFAULT_RELAY_CAPACITY};
use ev_permit::{build_router, AddressResolver, AppState, PermitQueryStreamer};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "EV charger permit lookup server", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    GOOGLE_MAPS_API_KEY  API key for the geocoding service
    OPENAI_API_KEY       API key for the chat completion service
    RUST_LOG             Log filter [default: info,ev_permit=debug]")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Chat model id
    #[arg(short, long, default_value = "gpt-4o")]
    model: String,

    /// Geocoding endpoint
    #[arg(long, default_value = DEFAULT_GEOCODE_URL)]
    geocode_url: String,

    /// Chat completion endpoint
    #[arg(long, default_value = DEFAULT_CHAT_URL)]
    chat_url: String,

    /// Upstream chunks buffered per relay before the pump waits
    #[arg(long, default_value_t = DEFAULT_RELAY_CAPACITY)]
    relay_capacity: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG in .env is seen
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ev_permit=debug".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        relay_capacity: args.relay_capacity,
    };

    let geocoder = GoogleGeocoder::new(
        GeocoderConfig::new(GoogleGeocoder::find_key_or_warn()).with_endpoint(args.geocode_url),
    );
    let chat = OpenAIClient::new(
        OpenAIConfig::new(OpenAIClient::find_key_or_warn())
            .with_model(OpenAIModel::from_id(&args.model))
            .with_endpoint(args.chat_url),
    );

    let state = AppState::new(
        AddressResolver::new(Arc::new(geocoder)),
        PermitQueryStreamer::new(Arc::new(chat)).with_relay_capacity(config.relay_capacity),
    );
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "Permit lookup server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
