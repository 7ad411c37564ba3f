use crate::services::reward_service::TierStatus;
use database::reward::model::RewardClaim;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct TierDto {
    pub tier: u32,
    pub required_direct_business: Decimal,
    pub required_active_directs: i64,
    pub reward: Decimal,
    pub qualified: bool,
    pub claimed: bool,
}

impl From<TierStatus> for TierDto {
    fn from(status: TierStatus) -> Self {
        Self {
            tier: status.tier.tier,
            required_direct_business: status.tier.direct_business.to_decimal(),
            required_active_directs: status.tier.active_directs,
            reward: status.tier.reward.to_decimal(),
            qualified: status.qualified,
            claimed: status.claimed,
        }
    }
}

/// 领取档位奖励
#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct ClaimRewardDto {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub tier: u32,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct RewardClaimDto {
    pub id: String,
    pub tier: u32,
    pub amount: Decimal,
    pub created_at: i64,
}

impl From<RewardClaim> for RewardClaimDto {
    fn from(claim: RewardClaim) -> Self {
        Self {
            id: claim.id.to_hex(),
            tier: claim.tier,
            amount: claim.amount.to_decimal(),
            created_at: claim.created_at,
        }
    }
}
