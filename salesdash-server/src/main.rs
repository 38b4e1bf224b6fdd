use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salesdash_server::{data_dir, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = data_dir()?;
    let state = AppState::open(&data_dir)?;
    let bind = state.ctx.config.bind.clone();

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!(
        bind = %bind,
        data_dir = %data_dir.display(),
        sink = state.ctx.notification_service.sink_name(),
        "salesdash server listening"
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}
