use crate::util::{
    address_to_topic, confirmations, decode_transfer_value, is_confirmed, magic_number, to_hex, topic_to_address,
    wei_to_amount, TRANSFER_EVENT,
};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{Address, Filter, Log, TransactionReceipt, H256},
};
use server::services::chain::{TransactionVerification, TransactionVerifierTrait, VerifiedTransfer};
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppConfig, AppError, AppResult};

/// 链上观察到的一笔 USDT 转入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedTransfer {
    pub tx_hash: String,
    pub transfer: VerifiedTransfer,
}

/// 轮询器需要的链上读接口
#[async_trait]
pub trait TransferSource {
    async fn latest_block(&self) -> eyre::Result<u64>;

    /// [from, to] 区间内转入收款钱包的 USDT Transfer
    async fn incoming_transfers(&self, from_block: u64, to_block: u64) -> eyre::Result<Vec<ObservedTransfer>>;
}

pub type DynTransferSource = Arc<dyn TransferSource + Send + Sync>;

/// BSC JSON-RPC 客户端
#[derive(Clone)]
pub struct BscClient {
    pub http_provider: Arc<Provider<Http>>,
    pub usdt: Address,
    pub deposit_wallet: Address,
    pub required_confirmations: u64,
}

impl BscClient {
    pub fn new(
        rpc_url: &str,
        usdt: &str,
        deposit_wallet: &str,
        required_confirmations: u64,
    ) -> eyre::Result<Self> {
        let http_provider = Provider::<Http>::try_from(rpc_url)?;
        let usdt: Address = usdt.parse()?;
        let deposit_wallet: Address = deposit_wallet.parse()?;

        info!("🔗 bsc rpc client ready, usdt={} wallet={}", to_hex(&usdt), to_hex(&deposit_wallet));

        Ok(Self {
            http_provider: Arc::new(http_provider),
            usdt,
            deposit_wallet,
            required_confirmations,
        })
    }

    pub fn from_config(config: &AppConfig) -> eyre::Result<Self> {
        Self::new(
            &config.bsc_rpc_url,
            &config.usdt_contract,
            &config.deposit_wallet,
            config.required_confirmations,
        )
    }

    fn transfer_filter(&self) -> Filter {
        Filter::new()
            .address(self.usdt)
            .topic0(magic_number(TRANSFER_EVENT))
            .topic2(address_to_topic(&self.deposit_wallet))
    }

    async fn verify(&self, tx_hash: &str) -> eyre::Result<TransactionVerification> {
        let hash: H256 = tx_hash.parse()?;

        let Some(receipt) = self.http_provider.get_transaction_receipt(hash).await? else {
            return Ok(TransactionVerification::Pending("Transaction not found on chain yet.".to_string()));
        };

        let latest = self.http_provider.get_block_number().await?.as_u64();

        Ok(classify_receipt(
            &receipt,
            latest,
            self.required_confirmations,
            self.usdt,
            self.deposit_wallet,
        ))
    }
}

/// 根据回执判断交易状态
///
/// 失败交易或没有转入收款钱包的 USDT Transfer 为 Invalid；确认数不足为 Pending。
pub fn classify_receipt(
    receipt: &TransactionReceipt,
    latest_block: u64,
    required_confirmations: u64,
    usdt: Address,
    deposit_wallet: Address,
) -> TransactionVerification {
    if receipt.status.map(|s| s.as_u64()) != Some(1) {
        return TransactionVerification::Invalid("Transaction failed on chain.".to_string());
    }

    let Some(block_number) = receipt.block_number.map(|b| b.as_u64()) else {
        return TransactionVerification::Pending("Transaction is not mined yet.".to_string());
    };

    if !is_confirmed(block_number, latest_block, required_confirmations) {
        return TransactionVerification::Pending(format!(
            "Waiting for confirmations ({}/{}).",
            confirmations(block_number, latest_block),
            required_confirmations
        ));
    }

    match receipt
        .logs
        .iter()
        .filter(|log| log.address == usdt)
        .find_map(|log| parse_transfer(log).filter(|t| t.to == to_hex(&deposit_wallet)))
    {
        Some(mut transfer) => {
            transfer.block_number = block_number;
            TransactionVerification::Verified(transfer)
        }
        None => TransactionVerification::Invalid("No USDT transfer to the deposit wallet in this transaction.".to_string()),
    }
}

/// 解析一条 ERC-20 Transfer 日志，格式不符时返回 None
pub fn parse_transfer(log: &Log) -> Option<VerifiedTransfer> {
    if log.topics.len() != 3 || log.topics[0] != magic_number(TRANSFER_EVENT) {
        return None;
    }

    let from = topic_to_address(&log.topics[1]);
    let to = topic_to_address(&log.topics[2]);

    let amount = match decode_transfer_value(&log.data).and_then(wei_to_amount) {
        Ok(amount) => amount,
        Err(e) => {
            warn!("⚠️ skipping malformed Transfer log: {:?}", e);
            return None;
        }
    };

    Some(VerifiedTransfer {
        from: to_hex(&from),
        to: to_hex(&to),
        amount,
        block_number: log.block_number.map(|b| b.as_u64()).unwrap_or_default(),
    })
}

pub(crate) fn rpc_error(e: eyre::Report) -> AppError {
    AppError::InternalServerErrorWithContext(format!("BSC RPC error: {:#}", e))
}

#[async_trait]
impl TransactionVerifierTrait for BscClient {
    async fn verify_transaction(&self, tx_hash: &str) -> AppResult<TransactionVerification> {
        self.verify(tx_hash).await.map_err(rpc_error)
    }
}

#[async_trait]
impl TransferSource for BscClient {
    async fn latest_block(&self) -> eyre::Result<u64> {
        Ok(self.http_provider.get_block_number().await?.as_u64())
    }

    async fn incoming_transfers(&self, from_block: u64, to_block: u64) -> eyre::Result<Vec<ObservedTransfer>> {
        let filter = self.transfer_filter().from_block(from_block).to_block(to_block);
        let logs = self.http_provider.get_logs(&filter).await?;

        let transfers = logs
            .iter()
            .filter(|log| log.removed != Some(true))
            .filter_map(|log| {
                let tx_hash = log.transaction_hash?;
                parse_transfer(log).map(|transfer| ObservedTransfer {
                    tx_hash: to_hex(&tx_hash),
                    transfer,
                })
            })
            .collect();

        Ok(transfers)
    }
}
