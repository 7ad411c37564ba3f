use crate::services::notifier::{DynNotifier, BALANCE_UPDATE};
use database::{
    reward::{model::RewardClaim, repository::DynRewardRepository},
    user::{model::User, repository::DynUserRepository},
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use tracing::info;
use utils::{Amount, AppError, AppResult};

/// 奖励档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardTier {
    pub tier: u32,
    /// 直推业绩门槛
    pub direct_business: Amount,
    /// 有效直推人数门槛
    pub active_directs: i64,
    pub reward: Amount,
}

pub const REWARD_TIERS: [RewardTier; 5] = [
    RewardTier { tier: 1, direct_business: Amount::from_usdt(500), active_directs: 2, reward: Amount::from_usdt(25) },
    RewardTier { tier: 2, direct_business: Amount::from_usdt(2_000), active_directs: 5, reward: Amount::from_usdt(100) },
    RewardTier { tier: 3, direct_business: Amount::from_usdt(10_000), active_directs: 10, reward: Amount::from_usdt(500) },
    RewardTier { tier: 4, direct_business: Amount::from_usdt(50_000), active_directs: 20, reward: Amount::from_usdt(2_500) },
    RewardTier { tier: 5, direct_business: Amount::from_usdt(200_000), active_directs: 40, reward: Amount::from_usdt(10_000) },
];

impl RewardTier {
    pub fn is_met_by(&self, direct_business: Amount, active_directs: i64) -> bool {
        direct_business >= self.direct_business && active_directs >= self.active_directs
    }
}

pub fn find_tier(tier: u32) -> Option<&'static RewardTier> {
    REWARD_TIERS.iter().find(|t| t.tier == tier)
}

/// 用户等级 = 满足条件的最高档位，0 表示未达到任何档位
pub fn qualified_level(direct_business: Amount, active_directs: i64) -> u32 {
    REWARD_TIERS
        .iter()
        .filter(|t| t.is_met_by(direct_business, active_directs))
        .map(|t| t.tier)
        .max()
        .unwrap_or(0)
}

pub fn next_tier(level: u32) -> Option<&'static RewardTier> {
    REWARD_TIERS.iter().find(|t| t.tier > level)
}

#[derive(Debug, Clone)]
pub struct TierStatus {
    pub tier: RewardTier,
    pub qualified: bool,
    pub claimed: bool,
}

pub struct RewardService {
    users: DynUserRepository,
    rewards: DynRewardRepository,
    notifier: DynNotifier,
}

impl RewardService {
    pub fn new(users: DynUserRepository, rewards: DynRewardRepository, notifier: DynNotifier) -> Self {
        Self { users, rewards, notifier }
    }

    pub fn tier_statuses(user: &User) -> Vec<TierStatus> {
        REWARD_TIERS
            .iter()
            .map(|tier| TierStatus {
                tier: *tier,
                qualified: tier.is_met_by(user.direct_business, user.active_users),
                claimed: user.claimed_tiers.contains(&tier.tier),
            })
            .collect()
    }

    pub async fn get_tiers(&self, user_id: &ObjectId) -> AppResult<Vec<TierStatus>> {
        let user = self.load_user(user_id).await?;

        Ok(Self::tier_statuses(&user))
    }

    pub async fn claim_reward(&self, user_id: &ObjectId, tier: u32) -> AppResult<RewardClaim> {
        let reward_tier = find_tier(tier).ok_or_else(|| AppError::BadRequest(format!("Unknown reward tier {}.", tier)))?;

        let user = self.load_user(user_id).await?;
        if user.is_blocked {
            return Err(AppError::Forbidden("Account is blocked.".to_string()));
        }
        if !reward_tier.is_met_by(user.direct_business, user.active_users) {
            return Err(AppError::BadRequest(format!(
                "Tier {} requires {} USDT direct business and {} active directs.",
                tier, reward_tier.direct_business, reward_tier.active_directs
            )));
        }

        // 条件更新保证同一档位只入账一次
        if !self.users.claim_tier(&user.id, tier, reward_tier.reward).await? {
            return Err(AppError::Conflict(format!("Tier {} reward has already been claimed.", tier)));
        }

        let claim = RewardClaim {
            id: ObjectId::new(),
            user_id: user.id,
            tier,
            amount: reward_tier.reward,
            created_at: chrono::Utc::now().timestamp(),
        };
        self.rewards.create_claim(claim.clone()).await?;

        info!("🎁 user {} claimed tier {} reward ({} USDT)", user.id, tier, reward_tier.reward);

        self.notifier
            .emit(
                BALANCE_UPDATE,
                Some(&user.wallet_address),
                json!({
                    "reason": "reward",
                    "tier": tier,
                    "amount": reward_tier.reward.to_decimal(),
                }),
            )
            .await;

        Ok(claim)
    }

    pub async fn list_claims(&self, user_id: &ObjectId) -> AppResult<Vec<RewardClaim>> {
        self.rewards.list_claims_by_user(user_id).await
    }

    async fn load_user(&self, user_id: &ObjectId) -> AppResult<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_level_requires_both_thresholds() {
        assert_eq!(qualified_level(Amount::ZERO, 0), 0);
        assert_eq!(qualified_level(Amount::from_usdt(500), 1), 0);
        assert_eq!(qualified_level(Amount::from_usdt(499), 2), 0);
        assert_eq!(qualified_level(Amount::from_usdt(500), 2), 1);
        assert_eq!(qualified_level(Amount::from_usdt(60_000), 12), 3);
        assert_eq!(qualified_level(Amount::from_usdt(1_000_000), 100), 5);
    }

    #[test]
    fn test_next_tier() {
        assert_eq!(next_tier(0).map(|t| t.tier), Some(1));
        assert_eq!(next_tier(3).map(|t| t.tier), Some(4));
        assert!(next_tier(5).is_none());
    }
}
