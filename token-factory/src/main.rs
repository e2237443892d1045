use std::env;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use token_factory::{router, AppConfig, AppState, Application, TokenFactory};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let application = Application::new("token-factory", AppConfig::from_env());
    let tokens = TokenFactory::new();
    tokens.init_app(&application);
    let app = router(AppState::new(application, tokens));

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8090);
    let ip: std::net::IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));

    info!(%addr, "starting token-factory");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
