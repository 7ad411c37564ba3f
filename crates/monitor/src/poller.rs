use crate::client::{rpc_error, DynTransferSource};
use crate::util::{current_date_and_time, scan_range};
use async_trait::async_trait;
use database::checkpoint::repository::DynCheckpointRepository;
use server::services::{
    chain::{DepositScannerTrait, ScanReport},
    deposit_service::{DynDepositService, IngestOutcome},
};
use tracing::{error, info, warn};
use utils::{AppConfig, AppResult};

pub const POLLER_NAME: &str = "usdt-deposits";

/// 租约有效期，超过后其他实例可以接管
pub const LEASE_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub required_confirmations: u64,
    pub lookback_blocks: u64,
    pub max_block_range: u64,
}

impl PollerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            required_confirmations: config.required_confirmations,
            lookback_blocks: config.poll_lookback_blocks,
            max_block_range: config.poll_max_block_range,
        }
    }
}

/// 充值轮询器
///
/// 扫描转入收款钱包的 USDT Transfer，交给 DepositService 入账。
/// 检查点与租约保存在数据库中，多个进程同时运行时只有一个在扫描。
#[derive(Clone)]
pub struct DepositPoller {
    pub source: DynTransferSource,
    pub deposits: DynDepositService,
    pub checkpoints: DynCheckpointRepository,
    pub settings: PollerSettings,
    pub holder: String,
}

impl DepositPoller {
    pub fn new(
        source: DynTransferSource,
        deposits: DynDepositService,
        checkpoints: DynCheckpointRepository,
        settings: PollerSettings,
    ) -> Self {
        let holder = format!("{}-{}", std::process::id(), chrono::Utc::now().timestamp_millis());

        Self {
            source,
            deposits,
            checkpoints,
            settings,
            holder,
        }
    }

    async fn scan(&self) -> AppResult<Option<ScanReport>> {
        let latest = self.source.latest_block().await.map_err(rpc_error)?;
        let checkpoint = self.checkpoints.get_last_block(POLLER_NAME).await?;

        let Some((from_block, to_block)) = scan_range(
            checkpoint,
            latest,
            self.settings.required_confirmations,
            self.settings.lookback_blocks,
            self.settings.max_block_range,
        ) else {
            return Ok(None);
        };

        let mut transfers = self
            .source
            .incoming_transfers(from_block, to_block)
            .await
            .map_err(rpc_error)?;
        transfers.sort_by_key(|t| t.transfer.block_number);

        let mut report = ScanReport {
            from_block,
            to_block,
            seen: transfers.len(),
            ..Default::default()
        };

        for observed in &transfers {
            match self.deposits.ingest_transfer(&observed.tx_hash, &observed.transfer).await {
                Ok(outcome @ (IngestOutcome::Created | IngestOutcome::Resumed)) => {
                    info!(
                        "💰 {} deposit {} from {} ({} USDT, {:?})",
                        current_date_and_time(),
                        observed.tx_hash,
                        observed.transfer.from,
                        observed.transfer.amount,
                        outcome
                    );
                    report.created += 1;
                }
                Ok(outcome) => {
                    info!("⏭️ skipped transfer {}: {:?}", observed.tx_hash, outcome);
                    report.skipped += 1;
                }
                Err(e) => {
                    // 已处理的区块推进检查点，失败的区块下轮重扫
                    let block = observed.transfer.block_number;
                    if block > from_block {
                        self.checkpoints.save_last_block(POLLER_NAME, block - 1).await?;
                    }
                    error!("❌ failed to ingest transfer {}: {}", observed.tx_hash, e);
                    return Err(e);
                }
            }
        }

        self.checkpoints.save_last_block(POLLER_NAME, to_block).await?;

        Ok(Some(report))
    }
}

#[async_trait]
impl DepositScannerTrait for DepositPoller {
    async fn scan_once(&self) -> AppResult<Option<ScanReport>> {
        if !self
            .checkpoints
            .acquire_lease(POLLER_NAME, &self.holder, LEASE_TTL_SECS)
            .await?
        {
            warn!("🔒 poller lease is held by another run, skipping");
            return Ok(None);
        }

        let result = self.scan().await;

        if let Err(e) = self.checkpoints.release_lease(POLLER_NAME, &self.holder).await {
            error!("❌ failed to release poller lease: {}", e);
        }

        if let Ok(Some(report)) = &result {
            info!(
                "👀 scanned blocks {}..={}: seen={} created={} skipped={}",
                report.from_block, report.to_block, report.seen, report.created, report.skipped
            );
        }

        result
    }
}
