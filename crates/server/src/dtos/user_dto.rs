use crate::{
    dtos::{reward_dto::TierDto, staking_dto::StakingTotalsDto},
    services::user_service::Dashboard,
};
use database::{
    commission::model::Commission,
    user::model::{User, UserRole},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 用户基本信息
#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct UserProfileDto {
    pub id: String,
    pub email: String,
    pub wallet_address: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub level: u32,
    #[schema(value_type = String, example = "user")]
    pub role: UserRole,
    pub is_blocked: bool,
    pub created_at: i64,
}

impl From<User> for UserProfileDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            email: user.email,
            wallet_address: user.wallet_address,
            referral_code: user.referral_code,
            referred_by: user.referred_by.map(|id| id.to_hex()),
            level: user.level,
            role: user.role,
            is_blocked: user.is_blocked,
            created_at: user.created_at,
        }
    }
}

/// 余额与团队数据
#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct BalancesDto {
    /// 可提现余额
    pub wallet: Decimal,
    /// 已确认充值总额
    pub usdt_balance: Decimal,
    pub self_business: Decimal,
    pub direct_business: Decimal,
    pub total_team: i64,
    pub active_users: i64,
}

impl From<&User> for BalancesDto {
    fn from(user: &User) -> Self {
        Self {
            wallet: user.wallet.to_decimal(),
            usdt_balance: user.usdt_balance.to_decimal(),
            self_business: user.self_business.to_decimal(),
            direct_business: user.direct_business.to_decimal(),
            total_team: user.total_team,
            active_users: user.active_users,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct DashboardDto {
    pub profile: UserProfileDto,
    pub balances: BalancesDto,
    pub staking: StakingTotalsDto,
    /// 下一个档位，已达最高档时为空
    pub next_tier: Option<TierDto>,
}

impl From<Dashboard> for DashboardDto {
    fn from(dashboard: Dashboard) -> Self {
        let balances = BalancesDto::from(&dashboard.user);
        let next_tier = dashboard.next_tier.map(|tier| TierDto {
            tier: tier.tier,
            required_direct_business: tier.direct_business.to_decimal(),
            required_active_directs: tier.active_directs,
            reward: tier.reward.to_decimal(),
            qualified: false,
            claimed: dashboard.user.claimed_tiers.contains(&tier.tier),
        });

        Self {
            profile: dashboard.user.into(),
            balances,
            staking: (&dashboard.staking).into(),
            next_tier,
        }
    }
}

/// 直推成员
#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct TeamMemberDto {
    pub id: String,
    pub wallet_address: String,
    pub level: u32,
    pub usdt_balance: Decimal,
    pub self_business: Decimal,
    pub active: bool,
    pub joined_at: i64,
}

impl From<User> for TeamMemberDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            wallet_address: user.wallet_address,
            level: user.level,
            usdt_balance: user.usdt_balance.to_decimal(),
            self_business: user.self_business.to_decimal(),
            active: user.usdt_balance.is_positive(),
            joined_at: user.created_at,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct CommissionDto {
    pub id: String,
    pub depositor_id: String,
    pub tx_hash: String,
    pub level: u32,
    pub rate_bps: u32,
    pub amount: Decimal,
    pub created_at: i64,
}

impl From<Commission> for CommissionDto {
    fn from(commission: Commission) -> Self {
        Self {
            id: commission.id.to_hex(),
            depositor_id: commission.depositor_id.to_hex(),
            tx_hash: commission.tx_hash,
            level: commission.level,
            rate_bps: commission.rate_bps,
            amount: commission.amount.to_decimal(),
            created_at: commission.created_at,
        }
    }
}
