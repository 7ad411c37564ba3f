use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utils::Amount;

pub const DEFAULT_CHAIN: &str = "BSC";
pub const DEFAULT_TOKEN: &str = "USDT";

/// 充值来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositSource {
    /// 前端钱包发起后上报
    Client,
    /// 链上轮询发现
    Poller,
}

/// 充值记录
///
/// 生命周期: 未确认 -> 确认 -> 结算完成(入账、分佣)。`tx_hash` 上有唯一索引。
/// `confirmed && !settled` 表示结算中途失败，再次确认时从断点继续。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub wallet_address: String,
    pub amount: Amount,
    pub chain: String,
    pub token: String,
    pub tx_hash: String,
    pub confirmed: bool,
    pub source: DepositSource,
    pub created_at: i64,
    #[serde(default)]
    pub confirmed_at: Option<i64>,
    #[serde(default)]
    pub settled: bool,
    #[serde(default)]
    pub settled_at: Option<i64>,
}

impl Deposit {
    pub fn new(user_id: ObjectId, wallet_address: &str, amount: Amount, tx_hash: &str, source: DepositSource) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            wallet_address: wallet_address.to_lowercase(),
            amount,
            chain: DEFAULT_CHAIN.to_string(),
            token: DEFAULT_TOKEN.to_string(),
            tx_hash: tx_hash.to_lowercase(),
            confirmed: false,
            source,
            created_at: chrono::Utc::now().timestamp(),
            confirmed_at: None,
            settled: false,
            settled_at: None,
        }
    }
}
