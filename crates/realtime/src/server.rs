use crate::{hub::Hub, router::RealtimeRouter};
use anyhow::Context;
use axum::serve;
use std::{future::Future, sync::Arc};
use tracing::info;
use utils::AppConfig;

pub struct RealtimeServer;

impl RealtimeServer {
    pub async fn serve<F>(config: Arc<AppConfig>, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = format!("{}:{}", config.socket_host, config.socket_port);
        let tcp_listener = tokio::net::TcpListener::bind(address)
            .await
            .context("🔴 Failed to bind realtime listener")?;

        let local_addr = tcp_listener.local_addr().context("🔴 Failed to get local address")?;

        let router = RealtimeRouter::new(Arc::new(Hub::new()), config.emit_token.clone());

        info!("🟢 server:stakeflow-realtime has launched on {local_addr} 📡");

        serve(tcp_listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("🔴 Failed to start realtime server")?;

        Ok(())
    }
}
