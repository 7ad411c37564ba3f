use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use database::{checkpoint::repository::DynCheckpointRepository, Database};
use monitor::{BscClient, DepositPoller, PollerSettings};
use realtime::RealtimeServer;
use server::{
    app::ApplicationServer,
    services::{
        chain::{DepositScannerTrait, DynDepositScanner},
        Services,
    },
};
use std::sync::Arc;
use timer::Timer;
use tokio::{signal, sync::watch, task::JoinSet};
use tracing::{error, info};
use utils::{AppConfig, Logger};

#[derive(Parser)]
#[command(name = "stakeflow", version, about = "USDT staking & referral backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    config: AppConfig,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq)]
enum Command {
    /// API + 实时推送 + 定时轮询(默认)
    Serve,
    /// 执行一轮充值轮询后退出
    Poll,
    /// 只启动实时推送服务
    Realtime,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 根据 CARGO_ENV 加载对应的环境配置文件
    utils::EnvLoader::load_env_file().ok();

    let cli = Cli::parse();
    let config = Arc::new(cli.config);
    let _guard = Logger::new(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => Stakeflow::new(config).await?.run().await,
        Command::Poll => Stakeflow::new(config).await?.poll_once().await,
        Command::Realtime => RealtimeServer::serve(config, shutdown_signal()).await,
    }
}

pub struct Stakeflow {
    config: Arc<AppConfig>,
    services: Services,
    poller: Arc<DepositPoller>,
}

impl Stakeflow {
    pub async fn new(config: Arc<AppConfig>) -> Result<Self> {
        let mongodb = Database::new(config.clone())
            .await
            .context("🔴 Failed to connect mongodb")?;
        mongodb.init_indexes().await.context("🔴 Failed to create indexes")?;

        let client = Arc::new(BscClient::from_config(&config).map_err(|e| anyhow!("🔴 Invalid BSC settings: {:#}", e))?);

        let checkpoints: DynCheckpointRepository = Arc::new(mongodb.clone());
        let services = Services::new(mongodb, &config, client.clone())?;

        let poller = Arc::new(DepositPoller::new(
            client,
            services.deposit.clone(),
            checkpoints,
            PollerSettings::from_config(&config),
        ));

        Ok(Self {
            config,
            services,
            poller,
        })
    }

    /// API、实时推送、定时轮询在同一个 JoinSet 中运行，任一退出或收到信号时整体停止
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut set = JoinSet::new();

        let scanner: DynDepositScanner = self.poller.clone();

        set.spawn({
            let config = self.config.clone();
            let services = self.services.clone();
            let shutdown = wait_for_shutdown(shutdown_rx.clone());
            async move { ApplicationServer::serve(config, services, Some(scanner), shutdown).await }
        });

        set.spawn({
            let config = self.config.clone();
            let shutdown = wait_for_shutdown(shutdown_rx.clone());
            async move { RealtimeServer::serve(config, shutdown).await }
        });

        set.spawn({
            let timer = Arc::new(Timer::new(Some(self.config.poll_cron.clone()), self.poller.clone()));
            let shutdown = shutdown_rx.clone();
            async move {
                timer.run(shutdown).await;
                Ok::<(), anyhow::Error>(())
            }
        });

        tokio::select! {
            Some(result) = set.join_next() => {
                match result {
                    Ok(Ok(())) => info!("🔔 Task completed"),
                    Ok(Err(e)) => error!("🔴 Task failed: {:#}", e),
                    Err(e) => error!("🔴 Task panicked: {}", e),
                }
            },
            _ = shutdown_signal() => {
                info!("🔔 Shutdown signal received, stopping all tasks...");
            },
        }

        shutdown_tx.send(true).ok();
        while let Some(result) = set.join_next().await {
            if let Ok(Err(e)) = result {
                error!("🔴 Task failed during shutdown: {:#}", e);
            }
        }

        info!("👋 stakeflow stopped");
        Ok(())
    }

    pub async fn poll_once(self) -> Result<()> {
        match self.poller.scan_once().await? {
            Some(report) => info!(
                "✅ poll finished: blocks {}..={} seen={} created={} skipped={}",
                report.from_block, report.to_block, report.seen, report.created, report.skipped
            ),
            None => info!("✅ nothing to poll"),
        }

        Ok(())
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("🔴 Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("🔔 Ctrl+C received");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("🔔 Terminate signal received");
            }
            Err(e) => {
                error!("🔴 Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::warn!("❌ Signal received, starting graceful shutdown...");
}
