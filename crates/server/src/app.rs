use crate::{
    router::AppRouter,
    services::{chain::DynDepositScanner, Services},
};
use anyhow::Context;
use axum::serve;
use std::{future::Future, net::SocketAddr, sync::Arc};
use tracing::{error, info};
use utils::AppConfig;

pub struct ApplicationServer;

impl ApplicationServer {
    /// 日志初始化在主程序中完成，这里只负责监听与路由
    pub async fn serve<F>(
        config: Arc<AppConfig>,
        services: Services,
        scanner: Option<DynDepositScanner>,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = format!("{}:{}", config.app_host, config.app_port);
        let tcp_listener = tokio::net::TcpListener::bind(address)
            .await
            .context("🔴 Failed to bind TCP listener")?;

        let local_addr = tcp_listener.local_addr().context("🔴 Failed to get local address")?;

        if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
            if config.admin_wallet.eq_ignore_ascii_case(&config.deposit_wallet) {
                error!("❌ ADMIN_WALLET must differ from DEPOSIT_WALLET, admin account not seeded");
            } else if let Err(e) = services.auth.ensure_admin(email, password, &config.admin_wallet).await {
                error!("❌ failed to seed admin account: {}", e);
            }
        }

        let router = AppRouter::new(services, scanner, config.client_url.as_deref());

        info!("🟢 server:stakeflow-api has launched on {local_addr} 🚀");

        serve(tcp_listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await
            .context("🔴 Failed to start server")?;

        Ok(())
    }
}
