use std::sync::Arc;

use aether_server::{Handler, RoomRegistry, ServerConfig, SystemClock};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    let listener = TcpListener::bind(config.bind).await?;
    log::info!(
        "aether-server listening on {} (match {}s, lockouts {})",
        config.bind,
        config.match_config.duration_secs,
        if config.match_config.lockouts.is_some() { "on" } else { "off" }
    );

    let registry = Arc::new(RoomRegistry::new(config, Arc::new(SystemClock)));
    aether_server::net::serve(listener, Handler::new(registry)).await?;
    Ok(())
}
