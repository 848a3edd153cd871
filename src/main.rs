use rawhttp::config::Config;
use rawhttp::proxy::ProxyHandler;
use rawhttp::routes::Router;
use rawhttp::server::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    let proxy = ProxyHandler::from_config(&cfg.upstream)?;
    let server = Server::serve(&cfg.listen_addr, Router::new(proxy)).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    server.close().await?;
    tracing::info!("Server gracefully stopped");

    Ok(())
}
