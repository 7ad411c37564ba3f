use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utils::Amount;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// 一笔质押(投资)记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    /// 本金
    pub amount: Amount,
    /// 入金时间戳(秒)
    pub date: i64,
    /// 已领取的收益
    #[serde(default)]
    pub paid_out: Amount,
}

/// 用户模型
///
/// `referred_by` 即推荐关系(单向指针)，佣金沿着它向上最多走 4 层。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// MongoDB文档ID
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    pub password_hash: String,
    /// 用户钱包地址(小写)
    pub wallet_address: String,
    /// 邀请码
    pub referral_code: String,
    /// 推荐人
    #[serde(default)]
    pub referred_by: Option<ObjectId>,
    /// 可提现余额(佣金、奖励、质押收益)
    #[serde(default)]
    pub wallet: Amount,
    /// 已确认充值总额
    #[serde(default)]
    pub usdt_balance: Amount,
    #[serde(default)]
    pub self_business: Amount,
    /// 直推业绩
    #[serde(default)]
    pub direct_business: Amount,
    #[serde(default)]
    pub total_team: i64,
    #[serde(default)]
    pub active_users: i64,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub investments: Vec<Investment>,
    /// 已发放佣金的 "{depositor_id}:{level}" 键
    #[serde(default)]
    pub commission_keys: Vec<String>,
    /// 已入账的充值 tx_hash
    #[serde(default)]
    pub deposit_keys: Vec<String>,
    /// 已计入直推业绩的下级充值 tx_hash
    #[serde(default)]
    pub direct_business_keys: Vec<String>,
    #[serde(default)]
    pub claimed_tiers: Vec<u32>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_blocked: bool,
    /// 乐观锁版本号
    #[serde(default)]
    pub version: i64,
    pub created_at: i64,
}

impl User {
    pub fn new(email: &str, password_hash: String, wallet_address: &str, referral_code: String, referred_by: Option<ObjectId>) -> Self {
        Self {
            id: ObjectId::new(),
            email: email.to_lowercase(),
            password_hash,
            wallet_address: wallet_address.to_lowercase(),
            referral_code,
            referred_by,
            wallet: Amount::ZERO,
            usdt_balance: Amount::ZERO,
            self_business: Amount::ZERO,
            direct_business: Amount::ZERO,
            total_team: 0,
            active_users: 0,
            level: 0,
            investments: Vec::new(),
            commission_keys: Vec::new(),
            deposit_keys: Vec::new(),
            direct_business_keys: Vec::new(),
            claimed_tiers: Vec::new(),
            role: UserRole::User,
            is_blocked: false,
            version: 0,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// 佣金去重键
pub fn commission_key(depositor: &ObjectId, level: u32) -> String {
    format!("{}:{}", depositor.to_hex(), level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_roundtrips_with_missing_optional_fields() {
        let raw = serde_json::json!({
            "_id": { "$oid": "65a1b2c3d4e5f60718293a4b" },
            "email": "a@b.c",
            "password_hash": "x",
            "wallet_address": "0xabc",
            "referral_code": "ABCDEFGH",
            "created_at": 1
        });

        let user: User = serde_json::from_value(raw).unwrap();
        assert_eq!(user.wallet, Amount::ZERO);
        assert_eq!(user.role, UserRole::User);
        assert!(user.commission_keys.is_empty());
        assert!(user.referred_by.is_none());
    }

    #[test]
    fn test_commission_key_format() {
        let id = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();
        assert_eq!(commission_key(&id, 2), "65a1b2c3d4e5f60718293a4b:2");
    }
}
