use mock_server::{auth, TokenIssuer};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    init_tracing();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let secret = std::env::var("KNOCKER_SECRET").unwrap_or_else(|_| auth::DEFAULT_SECRET.to_string());
    let addr = format!("127.0.0.1:{port}");

    let listener = TcpListener::bind(&addr).await?;
    mock_server::run_with_issuer(listener, TokenIssuer::new(secret.as_bytes(), auth::DEFAULT_TTL)).await
}
