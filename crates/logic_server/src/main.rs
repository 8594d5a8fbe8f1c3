use std::net::SocketAddr;

use logic_server::{build_router, config::load_settings, logic::TodoLogic, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings()?;
    let logic = TodoLogic::new(settings.confirm_delay(), settings.costs())
        .with_receipt_retention(settings.receipt_retention);
    let app = build_router(AppState::new(settings.logic_id.clone(), logic));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(
        %addr,
        logic_id = %settings.logic_id,
        confirm_delay_ms = settings.confirm_delay_ms,
        "logic server listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
