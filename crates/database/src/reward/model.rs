use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utils::Amount;

/// 奖励档位领取记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardClaim {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// 领取人
    pub user_id: ObjectId,
    /// 档位(1..=5)
    pub tier: u32,
    /// 奖励金额
    pub amount: Amount,
    pub created_at: i64,
}

/// 按档位汇总的领取数据(管理后台)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierClaimStats {
    pub tier: u32,
    pub claims: i64,
    pub amount: Amount,
}
