use database::{
    commission::repository::DynCommissionRepository,
    deposit::{model::Deposit, repository::DynDepositRepository},
    reward::{model::TierClaimStats, repository::DynRewardRepository},
    user::{model::User, repository::DynUserRepository},
    withdrawal::{model::WithdrawalStatus, repository::DynWithdrawalRepository},
};
use mongodb::bson::oid::ObjectId;
use tracing::info;
use utils::{Amount, AppError, AppResult};

/// 管理后台统计
#[derive(Debug, Clone)]
pub struct PlatformStats {
    pub total_users: u64,
    pub confirmed_deposit_volume: Amount,
    pub commission_volume: Amount,
    pub pending_withdrawals: u64,
    pub reward_claims: Vec<TierClaimStats>,
}

pub struct AdminService {
    users: DynUserRepository,
    deposits: DynDepositRepository,
    commissions: DynCommissionRepository,
    withdrawals: DynWithdrawalRepository,
    rewards: DynRewardRepository,
}

impl AdminService {
    pub fn new(
        users: DynUserRepository,
        deposits: DynDepositRepository,
        commissions: DynCommissionRepository,
        withdrawals: DynWithdrawalRepository,
        rewards: DynRewardRepository,
    ) -> Self {
        Self {
            users,
            deposits,
            commissions,
            withdrawals,
            rewards,
        }
    }

    pub async fn stats(&self) -> AppResult<PlatformStats> {
        let (_, total_users) = self.users.list_users(1, 1).await?;

        Ok(PlatformStats {
            total_users,
            confirmed_deposit_volume: self.deposits.total_confirmed_volume().await?,
            commission_volume: self.commissions.total_commission_volume().await?,
            pending_withdrawals: self.withdrawals.count_by_status(WithdrawalStatus::Pending).await?,
            reward_claims: self.rewards.claim_stats().await?,
        })
    }

    pub async fn list_users(&self, page: u64, limit: u64) -> AppResult<(Vec<User>, u64)> {
        self.users.list_users(page, limit).await
    }

    pub async fn get_user(&self, id: &ObjectId) -> AppResult<User> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found.", id)))
    }

    pub async fn set_blocked(&self, id: &ObjectId, blocked: bool) -> AppResult<User> {
        if !self.users.set_blocked(id, blocked).await? {
            return Err(AppError::NotFound(format!("User {} not found.", id)));
        }

        info!("🛡️ user {} blocked = {}", id, blocked);
        self.get_user(id).await
    }

    pub async fn list_deposits(&self, confirmed: Option<bool>, page: u64, limit: u64) -> AppResult<(Vec<Deposit>, u64)> {
        self.deposits.list_deposits(confirmed, page, limit).await
    }
}
