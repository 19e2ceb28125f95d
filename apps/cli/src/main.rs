mod config;
mod main_lib;

use config::Config;
use main_lib::{build_service, init_tracing, refresh};
use tokio::time::interval;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing();
    let service = build_service()?;

    tracing::info!(
        "Tracking {} symbols every {:?}",
        config.symbols.len(),
        config.refresh_interval
    );

    // First tick is immediate
    let mut ticker = interval(config.refresh_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => refresh(service.as_ref(), &config).await,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }
    Ok(())
}
