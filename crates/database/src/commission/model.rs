use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utils::Amount;

/// 佣金流水
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// 获得佣金的上级
    pub beneficiary_id: ObjectId,
    /// 触发佣金的充值用户
    pub depositor_id: ObjectId,
    pub tx_hash: String,
    pub level: u32,
    pub rate_bps: u32,
    pub amount: Amount,
    pub created_at: i64,
}
