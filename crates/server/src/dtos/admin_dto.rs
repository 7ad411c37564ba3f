use crate::{
    dtos::{
        deposit_dto::DepositDto,
        user_dto::{BalancesDto, UserProfileDto},
        withdrawal_dto::WithdrawalDto,
    },
    services::admin_service::PlatformStats,
};
use database::{user::model::User, withdrawal::model::WithdrawalStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// 分页参数
#[derive(Clone, Serialize, Deserialize, Debug, Default, IntoParams)]
pub struct PageQuery {
    /// 从 1 开始
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, IntoParams)]
pub struct DepositQuery {
    pub confirmed: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl DepositQuery {
    pub fn paging(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, IntoParams)]
pub struct WithdrawalQuery {
    /// pending / approved / rejected
    #[param(value_type = Option<String>)]
    pub status: Option<WithdrawalStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl WithdrawalQuery {
    pub fn paging(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct BlockUserDto {
    pub blocked: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct AdminUserDto {
    pub profile: UserProfileDto,
    pub balances: BalancesDto,
}

impl From<User> for AdminUserDto {
    fn from(user: User) -> Self {
        Self {
            balances: BalancesDto::from(&user),
            profile: user.into(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct UserPageDto {
    pub items: Vec<AdminUserDto>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct DepositPageDto {
    pub items: Vec<DepositDto>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct WithdrawalPageDto {
    pub items: Vec<WithdrawalDto>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct TierClaimStatsDto {
    pub tier: u32,
    pub claims: i64,
    pub amount: Decimal,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct AdminStatsDto {
    pub total_users: u64,
    pub confirmed_deposit_volume: Decimal,
    pub commission_volume: Decimal,
    pub pending_withdrawals: u64,
    pub reward_claims: Vec<TierClaimStatsDto>,
}

impl From<PlatformStats> for AdminStatsDto {
    fn from(stats: PlatformStats) -> Self {
        Self {
            total_users: stats.total_users,
            confirmed_deposit_volume: stats.confirmed_deposit_volume.to_decimal(),
            commission_volume: stats.commission_volume.to_decimal(),
            pending_withdrawals: stats.pending_withdrawals,
            reward_claims: stats
                .reward_claims
                .into_iter()
                .map(|s| TierClaimStatsDto {
                    tier: s.tier,
                    claims: s.claims,
                    amount: s.amount.to_decimal(),
                })
                .collect(),
        }
    }
}
