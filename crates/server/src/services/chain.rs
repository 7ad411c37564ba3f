//! 链上交互的抽象接口
//!
//! 具体实现位于 monitor crate (ethers `Provider<Http>`)，这里只定义 Service 依赖的形状。

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use utils::{Amount, AppResult};
use utoipa::ToSchema;

/// 一笔已确认的 USDT 转入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTransfer {
    /// 转出地址(小写)
    pub from: String,
    /// 转入地址(小写)
    pub to: String,
    pub amount: Amount,
    pub block_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionVerification {
    Verified(VerifiedTransfer),
    /// 尚未上链或确认数不足
    Pending(String),
    /// 交易失败或不是转入平台钱包的 USDT 转账
    Invalid(String),
}

pub type DynTransactionVerifier = Arc<dyn TransactionVerifierTrait + Send + Sync>;

#[async_trait]
pub trait TransactionVerifierTrait {
    async fn verify_transaction(&self, tx_hash: &str) -> AppResult<TransactionVerification>;
}

/// 一次轮询的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScanReport {
    pub from_block: u64,
    pub to_block: u64,
    /// 扫描到的转入日志数
    pub seen: usize,
    /// 新建并确认的充值数
    pub created: usize,
    pub skipped: usize,
}

pub type DynDepositScanner = Arc<dyn DepositScannerTrait + Send + Sync>;

#[async_trait]
pub trait DepositScannerTrait {
    /// 执行一轮扫描；其他实例持有租约或没有新区块时返回 None
    async fn scan_once(&self) -> AppResult<Option<ScanReport>>;
}
