//! 链上监控
//!
//! - `client`: BSC JSON-RPC 读取(交易回执校验、Transfer 日志)
//! - `poller`: 按区块区间扫描收款钱包的 USDT 转入并入账

pub mod client;
pub mod poller;
pub mod util;

pub use client::{BscClient, DynTransferSource, ObservedTransfer, TransferSource};
pub use poller::{DepositPoller, PollerSettings};

#[cfg(test)]
mod tests;
