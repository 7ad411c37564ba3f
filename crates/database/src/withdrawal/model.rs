use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use utils::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// 提现申请
///
/// 申请时已从 wallet 扣除 `amount`，驳回时原额退回。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub wallet_address: String,
    pub amount: Amount,
    pub fee: Amount,
    pub net_amount: Amount,
    pub status: WithdrawalStatus,
    /// 管理员打款后的链上交易
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub processed_at: Option<i64>,
}
